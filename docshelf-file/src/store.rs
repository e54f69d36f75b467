use async_trait::async_trait;
use serde_json::Value;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, warn};

use docshelf_core::{
    backend::{CollectionStats, PersistenceBackend, PersistenceBuilder},
    document::Document,
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Contents written to a collection file that has never been flushed.
const EMPTY_PLACEHOLDER: &str = "{}";

/// Mirrors one collection to a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a backend for the file at `path`, used as given.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Starts configuring file persistence under `directory`.
    pub fn builder(directory: impl Into<PathBuf>) -> JsonFileStoreBuilder {
        JsonFileStoreBuilder::new(directory)
    }

    /// Location of the collection file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn create_empty(&self) -> DocumentStoreResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, EMPTY_PLACEHOLDER).await?;

        debug!(path = %self.path.display(), "created collection file");

        Ok(())
    }

    fn parse(&self, contents: &[u8]) -> DocumentStoreResult<Vec<Document>> {
        match serde_json::from_slice::<Value>(contents)? {
            Value::Array(values) => Ok(values
                .into_iter()
                .filter_map(|value| match Document::try_from(value) {
                    Ok(document) => Some(document),
                    Err(err) => {
                        warn!(path = %self.path.display(), error = %err, "skipping persisted entry");
                        None
                    }
                })
                .collect()),
            Value::Object(map) if map.is_empty() => Ok(Vec::new()),
            _ => Err(DocumentStoreError::Serialization(format!(
                "{} does not contain an array of documents",
                self.path.display()
            ))),
        }
    }
}

#[async_trait]
impl PersistenceBackend for JsonFileStore {
    async fn load(&self) -> DocumentStoreResult<Vec<Document>> {
        match tokio::fs::read(&self.path).await {
            Ok(contents) => self.parse(&contents),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                self.create_empty().await?;
                Ok(Vec::new())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn flush(&self, documents: &[Document]) -> DocumentStoreResult<()> {
        let contents = serde_json::to_vec(documents)?;
        tokio::fs::write(&self.path, contents).await?;

        Ok(())
    }

    async fn stats(&self) -> DocumentStoreResult<CollectionStats> {
        Ok(CollectionStats::OnDisk(tokio::fs::metadata(&self.path).await?))
    }
}

/// Builder for [`JsonFileStore`]. The file is `<directory>/<file_name>.json`,
/// where the file name defaults to the collection's name.
#[derive(Debug, Clone)]
pub struct JsonFileStoreBuilder {
    directory: PathBuf,
    file_name: Option<String>,
}

impl JsonFileStoreBuilder {
    /// Stores files under `directory`; relative paths are resolved on build.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            file_name: None,
        }
    }

    /// Overrides the file name, without the `.json` extension.
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    fn resolve(&self, collection: &str) -> DocumentStoreResult<PathBuf> {
        let file_name = self.file_name.as_deref().unwrap_or(collection);
        if file_name.is_empty() {
            return Err(DocumentStoreError::Configuration("File name is required".into()));
        }

        let directory = std::path::absolute(&self.directory).map_err(|e| {
            DocumentStoreError::Configuration(format!(
                "Invalid directory {}: {e}",
                self.directory.display()
            ))
        })?;

        Ok(directory.join(format!("{file_name}.json")))
    }
}

impl PersistenceBuilder for JsonFileStoreBuilder {
    fn build(self: Box<Self>, collection: &str) -> DocumentStoreResult<Arc<dyn PersistenceBackend>> {
        Ok(Arc::new(JsonFileStore::new(self.resolve(collection)?)))
    }
}
