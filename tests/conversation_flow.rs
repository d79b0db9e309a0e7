mod common;

use calendarBot::models::transcript::Role;
use calendarBot::service::conversation::{SENTINEL, negotiate, negotiate_transcript};
use calendarBot::service::openai_service::ModelTier;
use common::{FakeModel, harness};

#[tokio::test]
async fn accepting_the_default_ends_after_one_round() {
    let h = harness(FakeModel::replying(&["first draft"]), &[""], Vec::new());
    let reply = negotiate(&h.ctx, "plan my day", ModelTier::Upgraded, 1.0).await.unwrap();
    assert_eq!(reply, "first draft");

    let calls = h.model.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].tier, ModelTier::Upgraded);
    assert_eq!(calls[0].temperature, 1.0);
    assert_eq!(calls[0].messages.len(), 1);
    assert_eq!(calls[0].messages[0].role, Role::User);
}

#[tokio::test]
async fn steering_is_appended_and_refinements_use_the_default_tier() {
    let h = harness(FakeModel::replying(&["draft", "final"]), &["make it shorter", ""], Vec::new());
    let (reply, transcript) = negotiate_transcript(&h.ctx, "plan my day", ModelTier::Upgraded, 0.7)
        .await
        .unwrap();
    assert_eq!(reply, "final");

    let calls = h.model.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].tier, ModelTier::Default);
    assert_eq!(calls[1].temperature, 0.7);
    let steering = &calls[1].messages;
    assert_eq!(steering.len(), 3);
    assert_eq!(steering[1].content, "draft");
    assert_eq!(steering[2].content, "make it shorter");

    assert_eq!(transcript.messages().last().unwrap().content, SENTINEL);
    assert_eq!(transcript.last_assistant(), Some("final"));
}

#[tokio::test]
async fn only_the_exact_sentinel_ends_the_negotiation() {
    let h = harness(FakeModel::replying(&["a", "b"]), &["this is okay.", SENTINEL], Vec::new());
    let reply = negotiate(&h.ctx, "x", ModelTier::Default, 0.2).await.unwrap();
    assert_eq!(reply, "b");
}

#[tokio::test]
async fn sentinel_with_trailing_spaces_keeps_negotiating() {
    let h = harness(FakeModel::replying(&["a", "b"]), &["This is okay.  ", ""], Vec::new());
    let (reply, transcript) = negotiate_transcript(&h.ctx, "x", ModelTier::Default, 0.2)
        .await
        .unwrap();
    assert_eq!(reply, "b");

    let calls = h.model.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].messages[2].content, "This is okay.  ");
    assert_eq!(transcript.messages().last().unwrap().content, SENTINEL);
}

#[tokio::test]
async fn failed_calls_are_resent() {
    let model = FakeModel::new(vec![
        Err("timeout".to_string()),
        Err("timeout".to_string()),
        Ok("late answer".to_string()),
    ]);
    let h = harness(model, &[""], Vec::new());
    let reply = negotiate(&h.ctx, "x", ModelTier::Default, 0.2).await.unwrap();
    assert_eq!(reply, "late answer");
    assert_eq!(h.model.calls().len(), 3);
    assert!(h.console.saw("Resending (1/2)"));
}

#[tokio::test]
async fn exhausted_retries_yield_an_empty_reply() {
    let model = FakeModel::new(vec![Err("down".to_string()); 3]);
    let h = harness(model, &[""], Vec::new());
    let (reply, transcript) = negotiate_transcript(&h.ctx, "x", ModelTier::Default, 0.2)
        .await
        .unwrap();
    assert_eq!(reply, "");
    assert_eq!(h.model.calls().len(), 3);
    assert!(h.console.saw("All requests failed!"));
    assert_eq!(transcript.messages()[1].role, Role::Assistant);
    assert_eq!(transcript.messages()[1].content, "");
}
