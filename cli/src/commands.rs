//! `plan` and `apply` subcommands.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use seed_loader::{
    Batch, ClientConfig, ManagementApiClient, UploadError, UploadOptions, Uploader,
    meaningful_statements, plan_batches,
};

use crate::args::{ApplyArgs, Cli, PlanArgs};

/// Characters of a statement shown by `plan --statements`.
const SUMMARY_CHARS: usize = 80;

fn read_script(path: &Path) -> Result<String> {
    let sql = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    tracing::info!(path = %path.display(), chars = sql.chars().count(), "script loaded");
    Ok(sql)
}

/// First non-comment line of a statement, shortened for display.
fn summary_line(statement: &str) -> String {
    let line = statement
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("--"))
        .unwrap_or_default();
    if line.chars().count() > SUMMARY_CHARS {
        let mut short: String = line.chars().take(SUMMARY_CHARS).collect();
        short.push_str("...");
        short
    } else {
        line.to_owned()
    }
}

fn write_plan(
    out: &mut impl Write,
    file: &Path,
    batches: &[Batch<'_>],
    max_batch_size: usize,
    show_statements: bool,
) -> io::Result<()> {
    let statements: usize = batches.iter().map(Batch::len).sum();
    writeln!(
        out,
        "{}: {} statements in {} batches (max {} bytes per batch)",
        file.display(),
        statements,
        batches.len(),
        max_batch_size
    )?;
    for (i, batch) in batches.iter().enumerate() {
        let marker = if batch.size() > max_batch_size { " (oversized statement)" } else { "" };
        writeln!(
            out,
            "  batch {}: {} statements, {} bytes{}",
            i + 1,
            batch.len(),
            batch.size(),
            marker
        )?;
        if show_statements {
            for statement in batch.statements() {
                writeln!(out, "    {}", summary_line(statement))?;
            }
        }
    }
    Ok(())
}

pub fn plan(cli: &Cli, args: &PlanArgs) -> Result<()> {
    let sql = read_script(&cli.file)?;
    let batches = plan_batches(meaningful_statements(&sql), cli.max_batch_size);
    write_plan(
        &mut io::stdout().lock(),
        &cli.file,
        &batches,
        cli.max_batch_size,
        args.statements,
    )
    .context("failed to print the plan")
}

/// Cleanup statements from `--cleanup` flags followed by `--cleanup-file`.
fn cleanup_statements(args: &ApplyArgs) -> Result<Vec<String>> {
    let mut statements = args.cleanup.clone();
    if let Some(path) = &args.cleanup_file {
        let sql = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read cleanup file {}", path.display()))?;
        statements.extend(meaningful_statements(&sql).into_iter().map(str::to_owned));
    }
    Ok(statements)
}

pub async fn apply(cli: &Cli, args: &ApplyArgs) -> Result<()> {
    let Some(endpoint) = args.endpoint_url() else {
        bail!("no query endpoint configured: pass --endpoint or --project-ref");
    };
    if args.token.trim().is_empty() {
        bail!("the access token is empty");
    }

    let cleanup = cleanup_statements(args)?;
    let sql = read_script(&cli.file)?;

    let config = ClientConfig::new(endpoint, args.token.trim()).with_timeout(args.timeout());
    tracing::debug!(?config, "client configured");
    let client = ManagementApiClient::new(config).context("failed to create HTTP client")?;
    let options = UploadOptions::default().with_max_batch_size(cli.max_batch_size);
    let uploader = Uploader::new(client, options);

    match uploader.apply_script(&sql, &cleanup).await {
        Ok(report) => {
            if report.undecodable > 0 {
                tracing::warn!(
                    responses = report.undecodable,
                    "some responses carried no decodable result data"
                );
            }
            println!(
                "Seed applied successfully! ({} statements in {} batches, {} bytes)",
                report.statements, report.batches, report.bytes
            );
            Ok(())
        }
        Err(err) => {
            if let UploadError::Rejected { preview, .. } = &err {
                eprintln!(
                    "Failed query content (first {} chars):\n{}",
                    options.preview_chars, preview
                );
            }
            Err(err).context("seed upload stopped")
        }
    }
}
