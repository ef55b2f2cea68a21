use super::*;

#[test]
fn action_request_without_payload_omits_the_field_on_the_wire() {
    let req = ActionRequest::new("get_project_by_id");
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json, serde_json::json!({"action": "get_project_by_id"}));
}

#[test]
fn action_response_failure_carries_no_data() {
    let resp = ActionResponse::unknown_action("bogus");
    assert!(!resp.success);
    assert_eq!(resp.error.as_deref(), Some("Unknown action: bogus"));
    assert!(resp.data.is_none());
}

#[test]
fn invalid_message_format_matches_spec_wording() {
    let resp = ActionResponse::invalid_message_format();
    assert_eq!(resp.error.as_deref(), Some("Invalid message format"));
}

#[test]
fn broadcast_round_trips_through_json() {
    let b = Broadcast::with_data("row_completed", serde_json::json!({"rowIndex": 3}));
    let json = serde_json::to_string(&b).unwrap();
    let back: Broadcast = serde_json::from_str(&json).unwrap();
    assert_eq!(back, b);
}

#[test]
fn action_response_serializes_tab_id_in_camel_case() {
    let mut resp = ActionResponse::ok_empty();
    resp.tab_id = Some(7);
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["tabId"], serde_json::json!(7));
}
