mod common;

use calendarBot::models::signal::ControlSignal;
use calendarBot::service::approval_prompt::{Verdict, resolve};
use common::{FakeModel, harness};

fn items() -> Vec<String> {
    vec!["a".to_string(), "b".to_string(), "c".to_string()]
}

fn render(item: &String) -> String {
    format!("Item {item}")
}

#[tokio::test]
async fn plain_answers_keep_the_approved_subset_in_order() {
    let h = harness(FakeModel::replying(&[]), &["y", "n", "YES"], Vec::new());
    let approved = resolve(&h.ctx, &items(), render, Verdict::Approve).unwrap();
    assert_eq!(approved, vec!["a", "c"]);
}

#[tokio::test]
async fn confirmed_yes_to_all_returns_every_item() {
    let h = harness(FakeModel::replying(&[]), &["n", "yy", "yes"], Vec::new());
    let approved = resolve(&h.ctx, &items(), render, Verdict::Approve).unwrap();
    assert_eq!(approved, items());
    assert_eq!(h.console.remaining(), 0);
    assert_eq!(h.console.asked().len(), 3);
}

#[tokio::test]
async fn confirmed_no_to_all_discards_earlier_approvals() {
    let h = harness(FakeModel::replying(&[]), &["y", "no to all", "yes"], Vec::new());
    let approved = resolve(&h.ctx, &items(), render, Verdict::Approve).unwrap();
    assert!(approved.is_empty());
}

#[tokio::test]
async fn declined_override_counts_for_the_current_item_only() {
    let h = harness(FakeModel::replying(&[]), &["yy", "no", "nn", "", "n"], Vec::new());
    let approved = resolve(&h.ctx, &items(), render, Verdict::Approve).unwrap();
    assert_eq!(approved, vec!["a"]);
}

#[tokio::test]
async fn second_confirmation_has_no_default() {
    let h = harness(FakeModel::replying(&[]), &["yy", "", "n", "n"], Vec::new());
    let approved = resolve(&h.ctx, &items(), render, Verdict::Approve).unwrap();
    assert_eq!(approved, vec!["a"]);
}

#[tokio::test]
async fn enter_takes_the_call_site_default() {
    let h = harness(FakeModel::replying(&[]), &["", "", ""], Vec::new());
    assert_eq!(resolve(&h.ctx, &items(), render, Verdict::Approve).unwrap(), items());

    let h = harness(FakeModel::replying(&[]), &["", "", ""], Vec::new());
    assert!(resolve(&h.ctx, &items(), render, Verdict::Reject).unwrap().is_empty());
}

#[tokio::test]
async fn unrecognised_answers_ask_again() {
    let h = harness(FakeModel::replying(&[]), &["maybe", "y"], Vec::new());
    let approved = resolve(&h.ctx, &items()[..1], render, Verdict::Reject).unwrap();
    assert_eq!(approved, vec!["a"]);
    assert!(h.console.saw("Please answer yes, no"));
}

#[tokio::test]
async fn control_words_abort_the_batch() {
    let h = harness(FakeModel::replying(&[]), &["y", "regret"], Vec::new());
    let result = resolve(&h.ctx, &items(), render, Verdict::Approve);
    assert_eq!(result, Err(ControlSignal::Regret));
}
