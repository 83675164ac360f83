//! Session cache of admin-configured field definitions.
//!
//! The cache is the only source of PII flags. Until a load has completed every
//! field reads as "not sensitive"; callers never wait on the load.

mod key;

pub use key::normalize_field_key;

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::catalog::{FieldDefinition, IngestError};

/// Loader the cache pulls field definitions from.
pub trait FieldSource: Send + Sync {
    fn fetch_fields(
        &self,
    ) -> impl Future<Output = Result<Vec<FieldDefinition>, SourceError>> + Send;
}

/// Error raised by a [`FieldSource`].
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("field source unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fixed in-memory definitions, for embedding callers and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticFieldSource {
    fields: Vec<FieldDefinition>,
}

impl StaticFieldSource {
    pub fn new(fields: Vec<FieldDefinition>) -> Self {
        Self { fields }
    }
}

impl FieldSource for StaticFieldSource {
    fn fetch_fields(
        &self,
    ) -> impl Future<Output = Result<Vec<FieldDefinition>, SourceError>> + Send {
        std::future::ready(Ok(self.fields.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Unloaded,
    Loaded,
    Failed,
}

/// Immutable snapshot of one loaded field set.
#[derive(Debug, Default)]
pub struct FieldIndex {
    fields: Vec<FieldDefinition>,
    by_key: HashMap<String, usize>,
}

impl FieldIndex {
    fn build(mut fields: Vec<FieldDefinition>) -> Self {
        fields.sort_by_key(|field| field.ordering);

        let mut by_key = HashMap::with_capacity(fields.len() * 2);
        for (position, field) in fields.iter().enumerate() {
            by_key.entry(normalize_field_key(&field.name)).or_insert(position);
        }
        // Labels only fill keys no name claimed.
        for (position, field) in fields.iter().enumerate() {
            by_key
                .entry(normalize_field_key(&field.label))
                .or_insert(position);
        }
        by_key.remove("");

        Self { fields, by_key }
    }

    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.by_key
            .get(&normalize_field_key(name))
            .map(|position| &self.fields[*position])
    }

    /// Definitions in ascending `ordering`.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

struct CacheState {
    status: LoadStatus,
    index: Arc<FieldIndex>,
}

/// Lazily loaded, memoized store of field definitions.
pub struct FieldCache<S> {
    source: S,
    state: RwLock<CacheState>,
    in_flight: Mutex<()>,
    attempts: AtomicU64,
}

impl<S> FieldCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: RwLock::new(CacheState {
                status: LoadStatus::Unloaded,
                index: Arc::new(FieldIndex::default()),
            }),
            in_flight: Mutex::new(()),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn status(&self) -> LoadStatus {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    pub fn is_loaded(&self) -> bool {
        self.status() == LoadStatus::Loaded
    }

    /// Current snapshot. Empty until a load succeeds.
    pub fn snapshot(&self) -> Arc<FieldIndex> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .index
            .clone()
    }

    pub fn field(&self, name: &str) -> Option<FieldDefinition> {
        self.snapshot().get(name).cloned()
    }

    /// `true` only when the cache is loaded and the field is flagged encrypted.
    pub fn is_field_sensitive(&self, name: &str) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if state.status != LoadStatus::Loaded {
            return false;
        }
        state
            .index
            .get(name)
            .map(|field| field.is_encrypted)
            .unwrap_or(false)
    }

    fn replace(&self, next: CacheState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

impl<S: FieldSource> FieldCache<S> {
    /// Load definitions once. Concurrent callers share a single fetch and all
    /// observe its outcome; a failed load may be retried by calling again.
    pub async fn load_fields(&self) -> LoadStatus {
        if self.is_loaded() {
            return LoadStatus::Loaded;
        }

        let observed = self.attempts.load(Ordering::Acquire);
        let _guard = self.in_flight.lock().await;
        if self.attempts.load(Ordering::Acquire) != observed {
            debug!("field load joined an attempt that finished while waiting");
            return self.status();
        }

        let status = match self.source.fetch_fields().await {
            Ok(fields) => {
                let index = FieldIndex::build(fields);
                let count = index.len();
                self.replace(CacheState {
                    status: LoadStatus::Loaded,
                    index: Arc::new(index),
                });
                info!(count, "field definitions loaded");
                LoadStatus::Loaded
            }
            Err(error) => {
                warn!(%error, "field definitions failed to load; masking stays open");
                self.replace(CacheState {
                    status: LoadStatus::Failed,
                    index: Arc::new(FieldIndex::default()),
                });
                LoadStatus::Failed
            }
        };

        self.attempts.fetch_add(1, Ordering::Release);
        status
    }
}
