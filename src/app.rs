use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use camino::Utf8Path;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::api::BiomodelsClient;
use crate::cache::CacheStore;
use crate::domain::{CanonicalRecord, ModelId, SearchFilters};
use crate::error::BiomodelsError;
use crate::normalize::normalize;

/// Outcome of a bulk cache population run.
#[derive(Debug, Clone, Serialize)]
pub struct PopulateOutcome {
    pub fetched: usize,
    pub inserted: usize,
    pub total_cached: usize,
}

/// Outcome of the id-list export variant.
#[derive(Debug, Clone, Serialize)]
pub struct ExportOutcome {
    pub exported: usize,
    pub missing: Vec<String>,
}

/// Records recovered from an id-keyed export file, with per-entry failures
/// reported instead of aborting the whole import.
#[derive(Debug, Clone, Serialize)]
pub struct ModelImport {
    pub records: Vec<CanonicalRecord>,
    pub issues: Vec<ImportIssue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportIssue {
    pub model_id: String,
    pub message: String,
}

/// Orchestrates the cache store and the remote client: the remote is only
/// consulted on a cache miss, and search never leaves the local mapping.
pub struct App<C: BiomodelsClient> {
    store: CacheStore,
    client: C,
}

impl<C: BiomodelsClient> App<C> {
    pub fn new(store: CacheStore, client: C) -> Self {
        Self { store, client }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Cache-or-remote lookup. A model missing both locally and remotely is
    /// `None`; transport failures propagate.
    pub fn get_model(&mut self, id: &str) -> Result<Option<CanonicalRecord>, BiomodelsError> {
        let model_id: ModelId = id.parse()?;
        if let Some(found) = self.store.get(model_id.as_str()) {
            return Ok(Some(found.clone()));
        }

        let raw = match self.client.fetch_model(&model_id) {
            Ok(raw) => raw,
            Err(BiomodelsError::ModelNotFound(_)) => return Ok(None),
            Err(err) => return Err(err),
        };
        let record = normalize(raw, Some(&model_id))?;
        self.store.put_one(record.clone())?;
        Ok(Some(record))
    }

    /// Fetches the full upstream model list into the cache. Existing entries
    /// are kept (bulk ingestion is first-write-wins); records without a
    /// resolvable identifier are skipped and logged, not stored.
    pub fn populate(
        &mut self,
        progress: Option<&mut dyn FnMut(usize, usize)>,
    ) -> Result<PopulateOutcome, BiomodelsError> {
        let raws = self.client.fetch_models()?;
        let fetched = raws.len();
        let mut records = Vec::with_capacity(fetched);
        for raw in raws {
            match normalize(raw, None) {
                Ok(record) => records.push(record),
                Err(err) => warn!(%err, "skipping record during populate"),
            }
        }
        let inserted = self.store.upsert_many(records, progress)?;
        Ok(PopulateOutcome {
            fetched,
            inserted,
            total_cached: self.store.len(),
        })
    }

    pub fn search(
        &self,
        query: &str,
        filters: Option<&SearchFilters>,
    ) -> Result<Vec<CanonicalRecord>, BiomodelsError> {
        self.store.search_models(query, filters)
    }

    pub fn export_cache(&self, filepath: &Utf8Path) -> Result<(), BiomodelsError> {
        self.store.export(filepath)
    }

    pub fn import_cache(&mut self, filepath: &Utf8Path) -> Result<(), BiomodelsError> {
        self.store.import(filepath)
    }

    /// Id-list export: resolves each id through the regular cache-or-remote
    /// path and writes an id-keyed JSON object of canonical records. Ids
    /// found nowhere are reported, not fatal.
    pub fn export_models(
        &mut self,
        ids: &[String],
        filepath: &Utf8Path,
    ) -> Result<ExportOutcome, BiomodelsError> {
        let mut exported = BTreeMap::new();
        let mut missing = Vec::new();
        for id in ids {
            match self.get_model(id)? {
                Some(record) => {
                    exported.insert(record.model_id.clone(), record);
                }
                None => {
                    warn!(model_id = %id, "model not found during export");
                    missing.push(id.clone());
                }
            }
        }
        let content = serde_json::to_vec_pretty(&exported)
            .map_err(|err| BiomodelsError::Filesystem(err.to_string()))?;
        fs::write(filepath.as_std_path(), &content)
            .map_err(|err| BiomodelsError::Filesystem(err.to_string()))?;
        Ok(ExportOutcome {
            exported: exported.len(),
            missing,
        })
    }

    /// Id-list import: reads an id-keyed JSON object and returns the records
    /// with `model_id` (and `id`) injected from the outer key. Entries that
    /// fail to convert are reported individually; the import never aborts on
    /// one bad entry.
    pub fn import_models(&self, filepath: &Utf8Path) -> Result<ModelImport, BiomodelsError> {
        if !filepath.as_std_path().exists() {
            return Err(BiomodelsError::ImportFileNotFound(
                filepath.as_std_path().to_path_buf(),
            ));
        }
        let content = fs::read_to_string(filepath.as_std_path())
            .map_err(|err| BiomodelsError::Filesystem(err.to_string()))?;
        let entries: Map<String, Value> = serde_json::from_str(&content)
            .map_err(|err| BiomodelsError::Format(err.to_string()))?;

        let mut records = Vec::new();
        let mut issues = Vec::new();
        for (key, value) in entries {
            match import_entry(&key, value) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(model_id = %key, %err, "skipping import entry");
                    issues.push(ImportIssue {
                        model_id: key,
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(ModelImport { records, issues })
    }

    /// Downloads the primary model artifact; mirrors the remote client's
    /// boolean contract.
    pub fn download_model(
        &self,
        id: &str,
        destination: &Path,
    ) -> Result<bool, BiomodelsError> {
        let model_id: ModelId = id.parse()?;
        Ok(self.client.download_model(&model_id, destination))
    }
}

fn import_entry(key: &str, value: Value) -> Result<CanonicalRecord, BiomodelsError> {
    let id: ModelId = key.parse()?;
    let Value::Object(mut entry) = value else {
        return Err(BiomodelsError::Format("entry is not an object".to_string()));
    };
    entry.insert("id".to_string(), Value::String(id.as_str().to_string()));
    entry.insert("model_id".to_string(), Value::String(id.as_str().to_string()));
    serde_json::from_value(Value::Object(entry))
        .map_err(|err| BiomodelsError::Format(err.to_string()))
}
