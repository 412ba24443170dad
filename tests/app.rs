use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use serde_json::json;

use biomodels_cache::api::BiomodelsClient;
use biomodels_cache::app::App;
use biomodels_cache::cache::CacheStore;
use biomodels_cache::domain::{CanonicalRecord, ModelId, RawRecord};
use biomodels_cache::error::BiomodelsError;

#[derive(Default)]
struct MockClient {
    models: BTreeMap<String, serde_json::Value>,
    fetch_calls: Arc<Mutex<usize>>,
    transport_failure: bool,
}

impl MockClient {
    fn with_models(models: BTreeMap<String, serde_json::Value>) -> Self {
        Self {
            models,
            ..Default::default()
        }
    }
}

impl BiomodelsClient for MockClient {
    fn fetch_model(&self, id: &ModelId) -> Result<RawRecord, BiomodelsError> {
        *self.fetch_calls.lock().unwrap() += 1;
        if self.transport_failure {
            return Err(BiomodelsError::Http("connection reset".to_string()));
        }
        match self.models.get(id.as_str()) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|err| BiomodelsError::Http(err.to_string())),
            None => Err(BiomodelsError::ModelNotFound(id.as_str().to_string())),
        }
    }

    fn fetch_models(&self) -> Result<Vec<RawRecord>, BiomodelsError> {
        if self.transport_failure {
            return Err(BiomodelsError::Http("connection reset".to_string()));
        }
        self.models
            .values()
            .map(|value| {
                serde_json::from_value(value.clone())
                    .map_err(|err| BiomodelsError::Http(err.to_string()))
            })
            .collect()
    }

    fn download_model(&self, _id: &ModelId, _destination: &Path) -> bool {
        false
    }
}

fn store_in(temp: &tempfile::TempDir, name: &str) -> CacheStore {
    let dir = Utf8PathBuf::from_path_buf(temp.path().join(name)).unwrap();
    CacheStore::new(&dir).unwrap()
}

#[test]
fn get_model_fetches_once_then_serves_from_cache() {
    let temp = tempfile::tempdir().unwrap();
    let client = MockClient::with_models(BTreeMap::from([(
        "BIOMD0000000001".to_string(),
        json!({ "id": "BIOMD0000000001", "name": "Glycolysis" }),
    )]));
    let calls = Arc::clone(&client.fetch_calls);
    let mut app = App::new(store_in(&temp, "cache"), client);

    let first = app.get_model("1").unwrap().unwrap();
    assert_eq!(first.name.as_deref(), Some("Glycolysis"));
    assert_eq!(*calls.lock().unwrap(), 1);

    // Both id spellings hit the cached entry now.
    let second = app.get_model("BIOMD0000000001").unwrap().unwrap();
    assert_eq!(second, first);
    let third = app.get_model("1").unwrap().unwrap();
    assert_eq!(third, first);
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[test]
fn fetched_records_are_normalized_and_persisted() {
    let temp = tempfile::tempdir().unwrap();
    let dir = Utf8PathBuf::from_path_buf(temp.path().join("cache")).unwrap();
    let client = MockClient::with_models(BTreeMap::from([(
        "BIOMD0000000413".to_string(),
        json!({
            "name": "Signalling",
            "publication": {
                "title": "Published title",
                "journal": "Nature",
                "authors": [{ "name": "Alice" }]
            }
        }),
    )]));
    let mut app = App::new(CacheStore::new(&dir).unwrap(), client);

    // The upstream record has no id of its own; the requested id fills in.
    let record = app.get_model("BIOMD0000000413").unwrap().unwrap();
    assert_eq!(record.model_id, "BIOMD0000000413");
    assert_eq!(record.title.as_deref(), Some("Published title"));
    assert_eq!(record.authors, vec!["Alice".to_string()]);

    let reopened = CacheStore::new(&dir).unwrap();
    assert_eq!(reopened.get("BIOMD0000000413"), Some(&record));
}

#[test]
fn remote_not_found_is_an_absent_result() {
    let temp = tempfile::tempdir().unwrap();
    let mut app = App::new(store_in(&temp, "cache"), MockClient::default());

    assert!(app.get_model("BIOMD0000009999").unwrap().is_none());
    assert!(app.store().is_empty());
}

#[test]
fn transport_errors_propagate_instead_of_reading_as_not_found() {
    let temp = tempfile::tempdir().unwrap();
    let client = MockClient {
        transport_failure: true,
        ..Default::default()
    };
    let mut app = App::new(store_in(&temp, "cache"), client);

    let err = app.get_model("1").unwrap_err();
    assert_matches!(err, BiomodelsError::Http(_));
}

#[test]
fn populate_is_first_write_wins() {
    let temp = tempfile::tempdir().unwrap();
    let mut store = store_in(&temp, "cache");
    store
        .put_one(CanonicalRecord {
            id: "BIOMD0000000001".to_string(),
            model_id: "BIOMD0000000001".to_string(),
            name: Some("Original".to_string()),
            ..Default::default()
        })
        .unwrap();

    let client = MockClient::with_models(BTreeMap::from([
        (
            "BIOMD0000000001".to_string(),
            json!({ "id": "BIOMD0000000001", "name": "Replacement" }),
        ),
        (
            "BIOMD0000000002".to_string(),
            json!({ "id": "BIOMD0000000002", "name": "New" }),
        ),
    ]));
    let mut app = App::new(store, client);

    let outcome = app.populate(None).unwrap();
    assert_eq!(outcome.fetched, 2);
    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.total_cached, 2);
    assert_eq!(
        app.store().get("BIOMD0000000001").unwrap().name.as_deref(),
        Some("Original")
    );
}

#[test]
fn populate_skips_records_without_identifiers() {
    let temp = tempfile::tempdir().unwrap();
    let client = MockClient::with_models(BTreeMap::from([
        (
            "BIOMD0000000001".to_string(),
            json!({ "id": "BIOMD0000000001", "name": "Kept" }),
        ),
        ("broken".to_string(), json!({ "name": "No id at all" })),
    ]));
    let mut app = App::new(store_in(&temp, "cache"), client);

    let outcome = app.populate(None).unwrap();
    assert_eq!(outcome.fetched, 2);
    assert_eq!(outcome.inserted, 1);
    assert_eq!(app.store().len(), 1);
}

#[test]
fn export_models_writes_an_id_keyed_file() {
    let temp = tempfile::tempdir().unwrap();
    let client = MockClient::with_models(BTreeMap::from([
        (
            "BIOMD0000000001".to_string(),
            json!({ "id": "BIOMD0000000001", "name": "One" }),
        ),
        (
            "BIOMD0000000002".to_string(),
            json!({ "id": "BIOMD0000000002", "name": "Two" }),
        ),
    ]));
    let mut app = App::new(store_in(&temp, "cache"), client);

    let path = Utf8PathBuf::from_path_buf(temp.path().join("models.json")).unwrap();
    let ids = vec![
        "1".to_string(),
        "BIOMD0000000002".to_string(),
        "BIOMD0000009999".to_string(),
    ];
    let outcome = app.export_models(&ids, &path).unwrap();
    assert_eq!(outcome.exported, 2);
    assert_eq!(outcome.missing, vec!["BIOMD0000009999".to_string()]);

    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(path.as_std_path()).unwrap()).unwrap();
    assert_eq!(content["BIOMD0000000001"]["name"], json!("One"));
    assert_eq!(content["BIOMD0000000002"]["name"], json!("Two"));
}

#[test]
fn import_models_injects_the_outer_key_and_reports_bad_entries() {
    let temp = tempfile::tempdir().unwrap();
    let app = App::new(store_in(&temp, "cache"), MockClient::default());

    let path = Utf8PathBuf::from_path_buf(temp.path().join("models.json")).unwrap();
    fs::write(
        path.as_std_path(),
        json!({
            "BIOMD0000000001": { "name": "Keyless record" },
            "BIOMD0000000002": "not an object"
        })
        .to_string(),
    )
    .unwrap();

    let import = app.import_models(&path).unwrap();
    assert_eq!(import.records.len(), 1);
    assert_eq!(import.records[0].model_id, "BIOMD0000000001");
    assert_eq!(import.records[0].id, "BIOMD0000000001");
    assert_eq!(import.records[0].name.as_deref(), Some("Keyless record"));

    assert_eq!(import.issues.len(), 1);
    assert_eq!(import.issues[0].model_id, "BIOMD0000000002");
}

#[test]
fn import_models_of_a_missing_file_fails() {
    let temp = tempfile::tempdir().unwrap();
    let app = App::new(store_in(&temp, "cache"), MockClient::default());

    let missing = Utf8PathBuf::from_path_buf(temp.path().join("missing.json")).unwrap();
    let err = app.import_models(&missing).unwrap_err();
    assert_matches!(err, BiomodelsError::ImportFileNotFound(_));
}

#[test]
fn import_models_of_invalid_json_fails() {
    let temp = tempfile::tempdir().unwrap();
    let app = App::new(store_in(&temp, "cache"), MockClient::default());

    let invalid = Utf8PathBuf::from_path_buf(temp.path().join("invalid.json")).unwrap();
    fs::write(invalid.as_std_path(), "invalid json").unwrap();
    let err = app.import_models(&invalid).unwrap_err();
    assert_matches!(err, BiomodelsError::Format(_));
}
