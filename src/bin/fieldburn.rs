use std::{
    io::Read as _,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use fieldburn::{
    Burner, FsDocumentStore, JsonlAuditLog, SignService, StoreConfig, burn_compatibility_issues,
    fingerprint, inspect_pdf_path, parse_sign_request,
};
use serde_json::json;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "fieldburn", version)]
struct Cli {
    /// Log at debug level.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Burn a sign request into a stored document and save the signed copy.
    Sign(SignArgs),
    /// Burn fields into a PDF file without a document store.
    Burn(BurnArgs),
    /// Print the content fingerprint of a file.
    Hash(HashArgs),
    /// Print page sizes and burn compatibility of a PDF.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct SignArgs {
    /// Sign request JSON (`-` reads stdin).
    #[arg(long)]
    request: PathBuf,

    /// Directory holding base and signed documents.
    #[arg(long, env = "FIELDBURN_STORAGE_DIR", default_value = "storage")]
    storage_dir: PathBuf,

    /// Prefix of the returned document URL.
    #[arg(long, env = "FIELDBURN_URL_PREFIX", default_value = "/files")]
    url_prefix: String,

    /// Append an audit record per signed document to this JSONL file.
    #[arg(long, env = "FIELDBURN_AUDIT_LOG")]
    audit_log: Option<PathBuf>,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Parser, Debug)]
struct BurnArgs {
    /// Base PDF.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Request JSON with `fields` and optional `pageSizes` (`-` reads stdin).
    #[arg(long)]
    request: PathBuf,

    /// Output PDF path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Parser, Debug)]
struct EngineArgs {
    /// Write a JSONL trace of every field to this file.
    #[arg(long)]
    debug_log: Option<PathBuf>,

    /// Leave overlay content streams uncompressed.
    #[arg(long)]
    no_compress: bool,
}

#[derive(Parser, Debug)]
struct HashArgs {
    path: PathBuf,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();
    match cli.cmd {
        Command::Sign(args) => cmd_sign(args),
        Command::Burn(args) => cmd_burn(args),
        Command::Hash(args) => cmd_hash(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("read request from stdin")?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("read '{}'", path.display()))
}

fn make_burner(args: &EngineArgs) -> anyhow::Result<Burner> {
    let mut builder = Burner::builder().compress_streams(!args.no_compress);
    if let Some(path) = &args.debug_log {
        builder = builder.debug_log(path);
    }
    Ok(builder.build()?)
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_sign(args: SignArgs) -> anyhow::Result<()> {
    let body = read_input(&args.request)?;
    let store = FsDocumentStore::new(StoreConfig {
        root: args.storage_dir,
        url_prefix: args.url_prefix,
        ..StoreConfig::default()
    })?;
    let mut service = SignService::new(make_burner(&args.engine)?, store);
    if let Some(path) = &args.audit_log {
        let log = JsonlAuditLog::open(path)
            .with_context(|| format!("open audit log '{}'", path.display()))?;
        service = service.with_audit(log);
    }
    let outcome = service.sign_json(&body)?;
    print_json(&outcome.response)?;
    for diagnostic in &outcome.diagnostics {
        eprintln!(
            "field {}: {}: {}",
            diagnostic.field_index,
            diagnostic.kind.as_str(),
            diagnostic.message
        );
    }
    Ok(())
}

fn cmd_burn(args: BurnArgs) -> anyhow::Result<()> {
    let base = read_input(&args.in_path)?;
    let request = parse_sign_request(&read_input(&args.request)?)?.to_burn_request()?;
    let result = make_burner(&args.engine)?.burn(&base, &request)?;
    std::fs::write(&args.out, &result.bytes)
        .with_context(|| format!("write '{}'", args.out.display()))?;
    print_json(&json!({
        "out": args.out.display().to_string(),
        "originalHash": result.original_hash,
        "resultHash": result.result_hash,
        "summary": result.summary,
        "diagnostics": result.diagnostics,
    }))
}

fn cmd_hash(args: HashArgs) -> anyhow::Result<()> {
    let bytes = read_input(&args.path)?;
    println!("{}  {}", fingerprint(&bytes), args.path.display());
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let report = inspect_pdf_path(&args.path)?;
    let issues: Vec<&str> = burn_compatibility_issues(&report)
        .iter()
        .map(|code| code.as_str())
        .collect();
    print_json(&json!({
        "report": report,
        "burnable": issues.is_empty(),
        "issues": issues,
    }))
}
