use super::commands::Command;
use crate::models::event::ChangeRequest;
use crate::service::context::PlannerContext;

pub fn run(ctx: &PlannerContext) -> Vec<ChangeRequest> {
    let mut listing = String::from("\n");
    for command in Command::ALL {
        listing.push_str(&format!("{} - {}\n", command.name(), command.description()));
    }
    listing.push_str(
        "\nAt any prompt:\n\
         scry - shows the next 5 events.\n\
         next <n> - shows the next n events.\n\
         between YYYY-MM-DD HH:MM YYYY-MM-DD HH:MM - shows the events in that window.\n\
         regret - abandons the current command.\n\
         exit - exits the assistant.\n",
    );
    ctx.say(&listing);
    Vec::new()
}
