mod common;

use calendarBot::service::json_extractor::{REPAIR_TEMPERATURE, extract};
use calendarBot::service::openai_service::ModelTier;
use common::{FakeModel, harness};
use serde_json::json;

#[tokio::test]
async fn array_inside_prose_is_recovered_without_the_model() {
    let h = harness(FakeModel::replying(&[]), &[], Vec::new());
    let text = "Here are your events:\n```json\n[\n  {\"summary\": \"Lunch\", \"tags\": [\"food\"]},\n  \
                {\"summary\": \"Gym\"}\n]\n```\nLet me know if anything should change.";
    let records = extract(&h.ctx, text).await;
    assert_eq!(records, vec![json!({"summary": "Lunch", "tags": ["food"]}), json!({"summary": "Gym"})]);
    assert!(h.model.calls().is_empty());
}

#[tokio::test]
async fn broken_json_is_repaired_once() {
    let h = harness(
        FakeModel::replying(&["Fixed it: [{\"summary\": \"Lunch\"}] enjoy"]),
        &[],
        Vec::new(),
    );
    let records = extract(&h.ctx, "{\"summary\": \"Lunch\",}").await;
    assert_eq!(records, vec![json!({"summary": "Lunch"})]);

    let calls = h.model.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].tier, ModelTier::Default);
    assert_eq!(calls[0].temperature, REPAIR_TEMPERATURE);
    assert_eq!(calls[0].messages.len(), 1);
    assert!(calls[0].messages[0].content.contains("[{\"summary\": \"Lunch\",}]"));
}

#[tokio::test]
async fn no_object_and_failing_repair_gives_an_empty_batch() {
    let model = FakeModel::new(vec![Err("down".to_string()); 3]);
    let h = harness(model, &[], Vec::new());
    let records = extract(&h.ctx, "I could not find any events.").await;
    assert!(records.is_empty());
    assert_eq!(h.model.calls().len(), 3);
    assert!(h.console.saw("Failed to get a valid response from the model."));
}

#[tokio::test]
async fn repair_reply_that_still_does_not_parse_gives_an_empty_batch() {
    let h = harness(FakeModel::replying(&["[still {broken]"]), &[], Vec::new());
    let records = extract(&h.ctx, "{oops}").await;
    assert!(records.is_empty());
    assert_eq!(h.model.calls().len(), 1);
}
