//! scavenger-consolidate CLI: list addresses, sign proofs, consolidate donors.

use clap::{Args, Parser, Subcommand};
use scavenger_consolidate::{
    ApiResponse, ConsolidateError, ConsolidationRequest, Consolidator, JsonlReceipts, Keystore,
    ProofRequest, SubmissionClient, SubmitConfig,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const PASSWORD_ENV: &str = "SCAVENGER_PASSWORD";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();
    let cli = Cli::parse();
    let ok = match cli.command {
        Command::Addresses(args) => run_addresses(args)?,
        Command::Proofs(args) => run_proofs(args)?,
        Command::Consolidate(args) => run_consolidate(args)?,
    };
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "scavenger-consolidate")]
#[command(author = "gorusys <goru.connector@outlook.com>")]
#[command(about = "Consolidate Scavenger solution credit from derived addresses onto one recipient")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List derived addresses with their user solution counts.
    Addresses(CommonArgs),
    /// Sign a challenge with every address that has solutions.
    Proofs(ProofsArgs),
    /// Assign donor credit to a recipient address.
    Consolidate(ConsolidateArgs),
}

#[derive(Args)]
struct CommonArgs {
    #[arg(long, default_value = "./storage/receipts.jsonl")]
    ledger: PathBuf,
    #[arg(long, default_value = "./secure/keystore.json")]
    keystore: PathBuf,
    /// Wallet password; prefer the SCAVENGER_PASSWORD environment variable.
    #[arg(long)]
    password: Option<String>,
}

#[derive(Args)]
struct ProofsArgs {
    #[command(flatten)]
    common: CommonArgs,
    /// Comma-separated address indexes; defaults to all.
    #[arg(long, value_delimiter = ',')]
    indexes: Vec<u32>,
    #[arg(long)]
    challenge: Option<String>,
    #[arg(long)]
    target: Option<String>,
    #[arg(long)]
    include_public_key: bool,
}

#[derive(Args)]
struct ConsolidateArgs {
    #[command(flatten)]
    common: CommonArgs,
    #[arg(long)]
    recipient: String,
    /// Comma-separated address indexes; defaults to all.
    #[arg(long, value_delimiter = ',')]
    indexes: Vec<u32>,
    /// Sign only and print equivalent curl commands.
    #[arg(long)]
    dry_run: bool,
    #[arg(long, default_value = scavenger_consolidate::submit::DEFAULT_BASE_URL)]
    base_url: String,
    #[arg(long, default_value_t = 3)]
    max_retries: u32,
    #[arg(long, default_value_t = 1.0)]
    initial_backoff_secs: f64,
    #[arg(long, default_value_t = 4)]
    concurrency: usize,
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

fn password(common: &CommonArgs) -> String {
    std::env::var(PASSWORD_ENV)
        .ok()
        .or_else(|| common.password.clone())
        .unwrap_or_default()
}

fn indexes(raw: Vec<u32>) -> Option<Vec<u32>> {
    if raw.is_empty() {
        None
    } else {
        Some(raw)
    }
}

/// Config problems surface as a 400 envelope like any other request error.
fn consolidator(
    common: &CommonArgs,
    config: &SubmitConfig,
) -> Result<Consolidator, ConsolidateError> {
    let client = SubmissionClient::from_config(config)?;
    Ok(Consolidator::new(
        Arc::new(Keystore::new(&common.keystore)),
        Arc::new(JsonlReceipts::new(&common.ledger)),
        client,
        config,
    ))
}

/// Print the envelope as JSON; returns whether the request succeeded.
fn emit<T: Serialize>(
    result: Result<T, ConsolidateError>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let (status, envelope) = ApiResponse::from_result(result);
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    info!(status, "done");
    Ok(envelope.success)
}

fn run_addresses(args: CommonArgs) -> Result<bool, Box<dyn std::error::Error>> {
    let consolidator = match consolidator(&args, &SubmitConfig::default()) {
        Ok(c) => c,
        Err(e) => return emit::<()>(Err(e)),
    };
    emit(consolidator.list_addresses(&password(&args)))
}

fn run_proofs(args: ProofsArgs) -> Result<bool, Box<dyn std::error::Error>> {
    let consolidator = match consolidator(&args.common, &SubmitConfig::default()) {
        Ok(c) => c,
        Err(e) => return emit::<()>(Err(e)),
    };
    let req = ProofRequest {
        password: password(&args.common),
        address_indexes: indexes(args.indexes),
        challenge: args.challenge,
        target_address: args.target,
        include_public_key: args.include_public_key,
    };
    let rt = tokio::runtime::Runtime::new()?;
    emit(rt.block_on(consolidator.resolve_proofs(req)))
}

fn run_consolidate(args: ConsolidateArgs) -> Result<bool, Box<dyn std::error::Error>> {
    // from_secs_f64 panics on non-finite input; SubmitConfig::validate rejects < 1s
    let backoff_secs = if args.initial_backoff_secs.is_finite() {
        args.initial_backoff_secs.clamp(0.0, 86_400.0)
    } else {
        0.0
    };
    let config = SubmitConfig {
        base_url: args.base_url,
        max_retries: args.max_retries,
        initial_backoff: Duration::from_secs_f64(backoff_secs),
        request_timeout: Duration::from_secs(args.timeout_secs),
        concurrency: args.concurrency,
    };
    let consolidator = match consolidator(&args.common, &config) {
        Ok(c) => c,
        Err(e) => return emit::<()>(Err(e)),
    };
    let req = ConsolidationRequest {
        password: password(&args.common),
        recipient_address: args.recipient,
        address_indexes: indexes(args.indexes),
        dry_run: args.dry_run,
        max_retries: Some(args.max_retries),
        initial_backoff_seconds: Some(args.initial_backoff_secs),
    };
    let rt = tokio::runtime::Runtime::new()?;
    emit(rt.block_on(consolidator.consolidate(req)))
}
