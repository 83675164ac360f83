use benefits_engine::benefits::BenefitEngine;
use benefits_engine::catalog::{
    parse_document_definitions, parse_field_definitions, parse_field_mappings, FieldDefinition,
    IngestError,
};
use benefits_engine::config::EngineConfig;
use benefits_engine::documents::parse_timestamp;
use benefits_engine::error::AppError;
use benefits_engine::fields::{FieldCache, FieldSource, SourceError};
use benefits_engine::mapping::MappingRegistry;
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) type Engine = BenefitEngine<FileFieldSource>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) fields: Arc<FieldCache<FileFieldSource>>,
}

/// Field definitions read from a JSON file on every fetch.
#[derive(Debug, Clone)]
pub(crate) struct FileFieldSource {
    path: PathBuf,
}

impl FileFieldSource {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FieldSource for FileFieldSource {
    fn fetch_fields(
        &self,
    ) -> impl Future<Output = Result<Vec<FieldDefinition>, SourceError>> + Send {
        let path = self.path.clone();
        async move {
            let raw = tokio::fs::read_to_string(&path).await?;
            let fields = parse_field_definitions(&raw)?;
            Ok::<_, SourceError>(fields)
        }
    }
}

/// Build an engine from the files under the configured directory. Field
/// definitions are not fetched here; callers trigger `load_fields`.
pub(crate) async fn load_engine(config: &EngineConfig) -> Result<Engine, AppError> {
    let documents =
        parse_document_definitions(&read_config_file(&config.documents_path()).await?)?;
    let mappings = parse_field_mappings(&read_config_file(&config.mappings_path()).await?)?;

    info!(
        dir = %config.config_dir.display(),
        documents = documents.len(),
        mappings = mappings.len(),
        "engine configuration read"
    );

    let fields = Arc::new(FieldCache::new(FileFieldSource::new(config.fields_path())));
    Ok(BenefitEngine::new(fields, MappingRegistry::new(mappings), documents))
}

async fn read_config_file(path: &Path) -> Result<String, AppError> {
    tokio::fs::read_to_string(path).await.map_err(|err| {
        warn!(path = %path.display(), error = %err, "configuration file unreadable");
        AppError::Io(err)
    })
}

/// Read and decode a caller-supplied JSON document.
pub(crate) async fn read_json_file<T: DeserializeOwned>(
    path: &Path,
    context: &'static str,
) -> Result<T, AppError> {
    let raw = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&raw)
        .map_err(|source| AppError::Ingest(IngestError::Json { context, source }))
}

pub(crate) fn parse_now(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(raw).ok_or_else(|| {
        format!("failed to parse '{raw}' as an RFC 3339 timestamp or YYYY-MM-DD date")
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use benefits_engine::fields::LoadStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fresh scratch directory under the system temp dir.
    pub(crate) fn scratch_dir(label: &str) -> PathBuf {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        let dir = std::env::temp_dir().join(format!(
            "benefits-engine-api-{label}-{}-{}",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir).expect("scratch dir created");
        dir
    }

    pub(crate) fn write_config(dir: &Path) {
        std::fs::write(
            dir.join(EngineConfig::FIELDS_FILE),
            r#"[{"fieldId": 1, "name": "phoneNumber", "label": "Phone", "type": "text",
                "isEncrypted": true, "ordering": 1}]"#,
        )
        .expect("fields written");
        std::fs::write(
            dir.join(EngineConfig::DOCUMENTS_FILE),
            r#"[{"name": "Income", "label": "Income Certificate",
                "documentSubType": "incomeCertificate", "docType": "incomeProof", "vcFields": "{}"}]"#,
        )
        .expect("documents written");
        std::fs::write(
            dir.join(EngineConfig::MAPPINGS_FILE),
            r#"[{"fieldId": 2, "fieldName": "annualIncome",
                "documentMappings": [{"document": "incomeCertificate", "documentField": "annualIncome"}]}]"#,
        )
        .expect("mappings written");
    }

    #[tokio::test]
    async fn load_engine_reads_config_dir() {
        let dir = scratch_dir("engine");
        write_config(&dir);
        let config = EngineConfig { config_dir: dir };

        let engine = load_engine(&config).await.expect("engine loads");

        assert_eq!(engine.document_definitions().len(), 1);
        assert!(engine.mappings().get("annual_income").is_some());
        assert_eq!(engine.fields().load_fields().await, LoadStatus::Loaded);
        assert!(engine.masking().should_mask("phone number"));
    }

    #[tokio::test]
    async fn missing_fields_file_fails_the_load_not_the_engine() {
        let dir = scratch_dir("no-fields");
        write_config(&dir);
        std::fs::remove_file(dir.join(EngineConfig::FIELDS_FILE)).expect("fields removed");
        let config = EngineConfig { config_dir: dir };

        let engine = load_engine(&config).await.expect("engine loads");

        assert_eq!(engine.fields().load_fields().await, LoadStatus::Failed);
        assert!(!engine.masking().should_mask("phoneNumber"));
    }

    #[tokio::test]
    async fn missing_mapping_file_is_an_error() {
        let dir = scratch_dir("no-mappings");
        write_config(&dir);
        std::fs::remove_file(dir.join(EngineConfig::MAPPINGS_FILE)).expect("mappings removed");

        let result = load_engine(&EngineConfig { config_dir: dir }).await;

        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn parse_now_reports_bad_input() {
        assert!(parse_now("2025-07-01").is_ok());
        let error = parse_now("yesterday").expect_err("not a timestamp");
        assert!(error.contains("yesterday"));
    }
}
