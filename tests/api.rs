use serde_json::json;

use biomodels_cache::api::parse_model_list;

#[test]
fn model_list_accepts_a_bare_array() {
    let records = parse_model_list(json!([
        { "id": "BIOMD0000000001", "name": "One" },
        { "id": "BIOMD0000000002", "name": "Two" }
    ]))
    .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id.as_deref(), Some("BIOMD0000000001"));
    assert_eq!(records[1].name.as_deref(), Some("Two"));
}

#[test]
fn model_list_accepts_a_models_keyed_object() {
    let records = parse_model_list(json!({
        "models": [
            { "id": "BIOMD0000000413", "name": "Signalling" }
        ],
        "matches": 1
    }))
    .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id.as_deref(), Some("BIOMD0000000413"));
}

#[test]
fn unexpected_list_shapes_read_as_empty() {
    assert!(parse_model_list(json!({ "matches": 0 })).unwrap().is_empty());
    assert!(parse_model_list(json!("not a list")).unwrap().is_empty());
    assert!(parse_model_list(json!(42)).unwrap().is_empty());
    assert!(parse_model_list(json!(null)).unwrap().is_empty());
}
