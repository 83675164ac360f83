use crate::infra::{load_engine, parse_now, read_json_file, Engine};
use benefits_engine::catalog::{CatalogItem, UserRecord};
use benefits_engine::config::AppConfig;
use benefits_engine::error::AppError;
use benefits_engine::fields::LoadStatus;
use benefits_engine::telemetry;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Catalog item JSON carrying `eligibility` and `required-docs` tags
    #[arg(long)]
    pub(crate) benefit: PathBuf,
    /// User record JSON with profile values and uploaded documents
    #[arg(long)]
    pub(crate) user: PathBuf,
    /// Evaluation instant (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = parse_now)]
    pub(crate) now: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub(crate) struct ProfileArgs {
    /// User record JSON with profile values and uploaded documents
    #[arg(long)]
    pub(crate) user: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct DocumentsArgs {
    /// User record JSON with uploaded documents
    #[arg(long)]
    pub(crate) user: PathBuf,
    /// Evaluation instant (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = parse_now)]
    pub(crate) now: Option<DateTime<Utc>>,
}

pub(crate) async fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let EvaluateArgs { benefit, user, now } = args;

    let engine = prepare_engine().await?;
    let item: CatalogItem = read_json_file(&benefit, "catalog item").await?;
    let user = read_user(&user).await?;

    let report = engine.evaluate_benefit(&item, &user, now.unwrap_or_else(Utc::now));
    print_json(&report)
}

pub(crate) async fn run_profile(args: ProfileArgs) -> Result<(), AppError> {
    let engine = prepare_engine().await?;
    let user = read_user(&args.user).await?;

    if engine.fields().load_fields().await != LoadStatus::Loaded {
        warn!("field definitions unavailable; profile values are shown unmasked");
    }

    print_json(&engine.profile_view(&user))
}

pub(crate) async fn run_documents(args: DocumentsArgs) -> Result<(), AppError> {
    let DocumentsArgs { user, now } = args;

    let engine = prepare_engine().await?;
    let user = read_user(&user).await?;

    print_json(&engine.document_view(&user, now.unwrap_or_else(Utc::now)))
}

async fn prepare_engine() -> Result<Engine, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    load_engine(&config.engine).await
}

async fn read_user(path: &Path) -> Result<UserRecord, AppError> {
    read_json_file(path, "user record").await
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).map_err(std::io::Error::from)?;
    writeln!(stdout)?;
    Ok(())
}
