use super::context::PlannerContext;
use crate::models::signal::ControlSignal;

/// What pressing enter means for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    Reject,
}

impl Verdict {
    fn as_default(self) -> &'static str {
        match self {
            Verdict::Approve => "yes",
            Verdict::Reject => "no",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Yes,
    No,
    YesToAll,
    NoToAll,
}

fn classify(answer: &str) -> Option<Answer> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(Answer::Yes),
        "n" | "no" => Some(Answer::No),
        "yy" | "yes to all" => Some(Answer::YesToAll),
        "nn" | "no to all" => Some(Answer::NoToAll),
        _ => None,
    }
}

/// Per-item confirmation over one batch.
///
/// A confirmed "yes to all" returns every item, including ones already
/// turned down; a confirmed "no to all" returns nothing, including ones
/// already approved. Both stop prompting at once. An unconfirmed override
/// counts as a plain yes/no for the current item.
pub fn resolve<T, F>(
    ctx: &PlannerContext,
    items: &[T],
    render: F,
    default: Verdict,
) -> Result<Vec<T>, ControlSignal>
where
    T: Clone,
    F: Fn(&T) -> String,
{
    let mut approved = Vec::new();
    for item in items {
        ctx.say(&format!("\n{}", render(item)));
        loop {
            let answer = ctx.ask("Confirm changes?", Some(default.as_default()))?;
            match classify(&answer) {
                Some(Answer::Yes) => {
                    approved.push(item.clone());
                    break;
                }
                Some(Answer::No) => break,
                Some(Answer::YesToAll) => {
                    if confirm_override(
                        ctx,
                        "This will approve every item in this batch, even ones you have turned down. Write \"yes\" to affirm.",
                    )? {
                        return Ok(items.to_vec());
                    }
                    approved.push(item.clone());
                    break;
                }
                Some(Answer::NoToAll) => {
                    if confirm_override(
                        ctx,
                        "This will reject every item in this batch, even ones you have approved. Write \"yes\" to affirm.",
                    )? {
                        return Ok(Vec::new());
                    }
                    break;
                }
                None => ctx.say("Please answer yes, no, yes to all (yy) or no to all (nn)."),
            }
        }
    }
    Ok(approved)
}

fn confirm_override(ctx: &PlannerContext, warning: &str) -> Result<bool, ControlSignal> {
    let answer = ctx.ask(warning, None)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}
