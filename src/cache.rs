use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::warn;

use crate::domain::{CanonicalRecord, ModelId, SearchFilters};
use crate::error::BiomodelsError;

pub const CACHE_FILE_NAME: &str = "biomodels_cache.json";

/// On-disk-backed key-value store of canonical model records.
///
/// The whole mapping lives in memory and is persisted to
/// `<dir>/biomodels_cache.json` after every mutation. A single store instance
/// owns the file; there is no locking, and concurrent writers lose updates
/// (last save wins).
#[derive(Debug, Clone)]
pub struct CacheStore {
    cache_dir: Utf8PathBuf,
    cache_file: Utf8PathBuf,
    models: BTreeMap<String, CanonicalRecord>,
}

impl CacheStore {
    /// Opens (or creates) the cache under `cache_dir`. The cache file exists
    /// after construction; a file with unparseable content is discarded and
    /// rewritten empty rather than failing.
    pub fn new(cache_dir: &Utf8Path) -> Result<Self, BiomodelsError> {
        if cache_dir.as_str().trim().is_empty() {
            return Err(BiomodelsError::MissingCacheDir);
        }
        fs::create_dir_all(cache_dir.as_std_path())
            .map_err(|err| BiomodelsError::Filesystem(err.to_string()))?;

        let mut store = Self {
            cache_dir: cache_dir.to_owned(),
            cache_file: cache_dir.join(CACHE_FILE_NAME),
            models: BTreeMap::new(),
        };
        store.load()?;
        Ok(store)
    }

    pub fn cache_file(&self) -> &Utf8Path {
        &self.cache_file
    }

    pub fn models(&self) -> &BTreeMap<String, CanonicalRecord> {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    fn load(&mut self) -> Result<(), BiomodelsError> {
        if !self.cache_file.as_std_path().exists() {
            return self.save();
        }
        let content = fs::read_to_string(self.cache_file.as_std_path())
            .map_err(|err| BiomodelsError::Filesystem(err.to_string()))?;
        match serde_json::from_str::<BTreeMap<String, CanonicalRecord>>(&content) {
            Ok(models) => {
                self.models = models;
                Ok(())
            }
            Err(err) => {
                warn!(cache_file = %self.cache_file, %err, "discarding unreadable cache file");
                self.models = BTreeMap::new();
                self.save()
            }
        }
    }

    fn save(&self) -> Result<(), BiomodelsError> {
        let content = serde_json::to_vec_pretty(&self.models)
            .map_err(|err| BiomodelsError::Filesystem(err.to_string()))?;
        let temp = tempfile::Builder::new()
            .prefix("biomodels-cache")
            .tempfile_in(self.cache_dir.as_std_path())
            .map_err(|err| BiomodelsError::Filesystem(err.to_string()))?;
        fs::write(temp.path(), &content)
            .map_err(|err| BiomodelsError::Filesystem(err.to_string()))?;
        if self.cache_file.as_std_path().exists() {
            fs::remove_file(self.cache_file.as_std_path())
                .map_err(|err| BiomodelsError::Filesystem(err.to_string()))?;
        }
        temp.persist(self.cache_file.as_std_path())
            .map_err(|err| BiomodelsError::Filesystem(err.to_string()))?;
        Ok(())
    }

    /// Looks up a record by numeric or full identifier. Absent records are a
    /// `None`, never an error.
    pub fn get(&self, id: &str) -> Option<&CanonicalRecord> {
        let id = id.parse::<ModelId>().ok()?;
        self.models.get(id.as_str())
    }

    /// Bulk ingestion: inserts records keyed by their own identifier,
    /// skipping ids already present (first-write-wins). Reports
    /// `(processed, total)` exactly once per input record and persists once
    /// at the end of the batch. Returns the number of newly inserted records.
    ///
    /// Note the deliberate asymmetry with [`CacheStore::put_one`], which
    /// overwrites.
    pub fn upsert_many(
        &mut self,
        records: Vec<CanonicalRecord>,
        mut progress: Option<&mut dyn FnMut(usize, usize)>,
    ) -> Result<usize, BiomodelsError> {
        let total = records.len();

        // Canonicalize the whole batch up front so a bad record rejects the
        // batch before the mapping is touched.
        let mut keyed = Vec::with_capacity(total);
        for mut record in records {
            let id = canonicalize(&mut record)?;
            keyed.push((id, record));
        }

        let mut inserted = 0usize;
        for (index, (id, record)) in keyed.into_iter().enumerate() {
            self.models.entry(id.as_str().to_string()).or_insert_with(|| {
                inserted += 1;
                record
            });
            if let Some(progress) = progress.as_deref_mut() {
                progress(index + 1, total);
            }
        }
        self.save()?;
        Ok(inserted)
    }

    /// Inserts or fully replaces the entry for the record's identifier
    /// (last-write-wins) and persists immediately.
    pub fn put_one(&mut self, mut record: CanonicalRecord) -> Result<(), BiomodelsError> {
        let id = canonicalize(&mut record)?;
        self.models.insert(id.as_str().to_string(), record);
        self.save()
    }

    /// Searches the in-memory mapping; see [`crate::search::search`].
    pub fn search_models(
        &self,
        query: &str,
        filters: Option<&SearchFilters>,
    ) -> Result<Vec<CanonicalRecord>, BiomodelsError> {
        crate::search::search(self.models.values(), query, filters)
    }

    /// Writes the entire mapping to `filepath` in the same JSON-object shape
    /// as the cache file itself.
    pub fn export(&self, filepath: &Utf8Path) -> Result<(), BiomodelsError> {
        let content = serde_json::to_vec_pretty(&self.models)
            .map_err(|err| BiomodelsError::Filesystem(err.to_string()))?;
        fs::write(filepath.as_std_path(), &content)
            .map_err(|err| BiomodelsError::Filesystem(err.to_string()))
    }

    /// Replaces the in-memory mapping with the content of `filepath` and
    /// persists it to the store's own cache file. A missing file and
    /// malformed content are both surfaced, unlike cache-file corruption.
    pub fn import(&mut self, filepath: &Utf8Path) -> Result<(), BiomodelsError> {
        if !filepath.as_std_path().exists() {
            return Err(BiomodelsError::ImportFileNotFound(
                filepath.as_std_path().to_path_buf(),
            ));
        }
        let content = fs::read_to_string(filepath.as_std_path())
            .map_err(|err| BiomodelsError::Filesystem(err.to_string()))?;
        self.models = serde_json::from_str(&content)
            .map_err(|err| BiomodelsError::Format(err.to_string()))?;
        self.save()
    }
}

/// Resolves a record's canonical key and rewrites both identifier fields to
/// it, so numeric ids never reach the mapping unpadded.
fn canonicalize(record: &mut CanonicalRecord) -> Result<ModelId, BiomodelsError> {
    let raw = if !record.model_id.trim().is_empty() {
        record.model_id.clone()
    } else {
        record.id.clone()
    };
    if raw.trim().is_empty() {
        return Err(BiomodelsError::Normalization(
            "record has no identifier to key on".to_string(),
        ));
    }
    let id: ModelId = raw.parse()?;
    record.id = id.as_str().to_string();
    record.model_id = id.as_str().to_string();
    Ok(id)
}
