//! Sequential submission of batches to a query endpoint.
//!
//! The [`Uploader`] sends one request at a time and waits for its response
//! before sending the next. The first transport failure or rejected query
//! stops the run: nothing after it is sent, nothing before it is undone.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::future::Future;

use crate::batch::{Batch, plan_batches, terminator_for, truncate_chars};
use crate::errors::{Phase, UploadError};
use crate::response::QueryResponse;
use crate::splitter::meaningful_statements;

/// Default upper bound for the serialized size of a batch, in bytes.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 50_000;

/// Default number of characters of a rejected query kept for diagnostics.
pub const DEFAULT_PREVIEW_CHARS: usize = 500;

/// A remote service able to run SQL text.
pub trait QueryEndpoint {
    /// Transport failure type.
    type Error: core::error::Error + 'static;

    /// Run `query` and classify the response.
    ///
    /// Only failures to obtain a response are returned as `Err`; a response
    /// reporting a query error is `Ok(QueryResponse::Failed(_))`.
    fn execute(&self, query: &str) -> impl Future<Output = Result<QueryResponse, Self::Error>>;
}

impl<T: QueryEndpoint + ?Sized> QueryEndpoint for &T {
    type Error = T::Error;

    fn execute(&self, query: &str) -> impl Future<Output = Result<QueryResponse, Self::Error>> {
        (**self).execute(query)
    }
}

/// Tuning knobs of an upload run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    /// Upper bound for the serialized size of a batch, in bytes.
    pub max_batch_size: usize,
    /// Number of characters of a rejected query kept in the error.
    pub preview_chars: usize,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

impl UploadOptions {
    /// Set the maximum batch size.
    #[must_use]
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    /// Set the length of the diagnostic preview.
    #[must_use]
    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }
}

/// Summary of a completed upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Statements sent across all batches.
    pub statements: usize,
    /// Batches sent.
    pub batches: usize,
    /// Bytes of query text sent across all batches.
    pub bytes: usize,
    /// Requests that succeeded but whose response body was not JSON.
    pub undecodable: usize,
}

/// A cleanup statement trimmed and stripped of trailing semicolons.
fn normalize_cleanup(statement: &str) -> &str {
    statement.trim().trim_end_matches(';').trim_end()
}

/// Number of cleanup statements that [`cleanup_query`] joins.
fn count_cleanup<S: AsRef<str>>(statements: &[S]) -> usize {
    statements
        .iter()
        .filter(|statement| !normalize_cleanup(statement.as_ref()).is_empty())
        .count()
}

/// Join cleanup statements into a single query, or `None` if there is
/// nothing to run.
///
/// Each statement is trimmed and stripped of trailing semicolons before
/// being terminated again, so both `DELETE FROM t` and `DELETE FROM t;` are
/// accepted. A statement ending in a `--` comment is terminated on the next
/// line.
#[must_use]
pub fn cleanup_query<S: AsRef<str>>(statements: &[S]) -> Option<String> {
    let mut query = String::new();
    for statement in statements {
        let statement = normalize_cleanup(statement.as_ref());
        if statement.is_empty() {
            continue;
        }
        if !query.is_empty() {
            query.push('\n');
        }
        query.push_str(statement);
        query.push_str(terminator_for(statement));
    }
    (!query.is_empty()).then_some(query)
}

/// Drives batches through a [`QueryEndpoint`], strictly one at a time.
#[derive(Debug, Clone)]
pub struct Uploader<E> {
    endpoint: E,
    options: UploadOptions,
}

impl<E: QueryEndpoint> Uploader<E> {
    /// Create an uploader over `endpoint`.
    #[must_use]
    pub fn new(endpoint: E, options: UploadOptions) -> Self {
        Self { endpoint, options }
    }

    /// The endpoint requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// The options of this uploader.
    #[must_use]
    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Split `sql` and group its meaningful statements into batches.
    #[must_use]
    pub fn plan<'a>(&self, sql: &'a str) -> Vec<Batch<'a>> {
        plan_batches(meaningful_statements(sql), self.options.max_batch_size)
    }

    /// Run a single query, returning its response unless it failed.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Transport`] if no response was obtained and
    /// [`UploadError::Rejected`] if the endpoint reported a query error.
    pub async fn run_query(
        &self,
        phase: Phase,
        query: &str,
    ) -> Result<QueryResponse, UploadError<E::Error>> {
        let response = self
            .endpoint
            .execute(query)
            .await
            .map_err(|source| UploadError::Transport { phase, source })?;

        match response {
            QueryResponse::Failed(message) => {
                tracing::error!(%phase, %message, "query rejected");
                Err(UploadError::Rejected {
                    phase,
                    message,
                    preview: truncate_chars(query, self.options.preview_chars).to_string(),
                })
            }
            QueryResponse::Undecodable { reason } => {
                tracing::warn!(%phase, %reason, "response body is not JSON, assuming no result data");
                Ok(QueryResponse::Undecodable { reason })
            }
            rows @ QueryResponse::Rows(_) => Ok(rows),
        }
    }

    /// Run the cleanup statements as one query.
    ///
    /// Does nothing when `statements` holds no SQL.
    ///
    /// # Errors
    ///
    /// See [`Uploader::run_query`].
    pub async fn cleanup<S: AsRef<str>>(
        &self,
        statements: &[S],
    ) -> Result<Option<QueryResponse>, UploadError<E::Error>> {
        let Some(query) = cleanup_query(statements) else {
            return Ok(None);
        };
        tracing::info!(statements = count_cleanup(statements), "running cleanup");
        tracing::debug!(%query, "cleanup query");
        self.run_query(Phase::Cleanup, &query).await.map(Some)
    }

    /// Send every batch, in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the error of the first batch that failed; no later batch has
    /// been sent when this happens.
    pub async fn upload(&self, batches: &[Batch<'_>]) -> Result<UploadReport, UploadError<E::Error>> {
        let total = batches.len();
        let mut report = UploadReport::default();

        for (i, batch) in batches.iter().enumerate() {
            let phase = Phase::Batch {
                index: i + 1,
                total,
            };
            tracing::info!(
                %phase,
                statements = batch.len(),
                bytes = batch.size(),
                "executing batch"
            );

            let response = self.run_query(phase, &batch.to_query()).await?;
            if matches!(response, QueryResponse::Undecodable { .. }) {
                report.undecodable += 1;
            }
            report.statements += batch.len();
            report.batches += 1;
            report.bytes += batch.size();
        }

        Ok(report)
    }

    /// Run the cleanup statements, then split, batch and upload `sql`.
    ///
    /// # Errors
    ///
    /// Returns the first failure of either phase. A failing cleanup means no
    /// batch is sent.
    pub async fn apply_script<S: AsRef<str>>(
        &self,
        sql: &str,
        cleanup: &[S],
    ) -> Result<UploadReport, UploadError<E::Error>> {
        let cleanup_response = self.cleanup(cleanup).await?;

        let batches = self.plan(sql);
        tracing::info!(
            statements = batches.iter().map(Batch::len).sum::<usize>(),
            batches = batches.len(),
            "script planned"
        );

        let mut report = self.upload(&batches).await?;
        if matches!(cleanup_response, Some(QueryResponse::Undecodable { .. })) {
            report.undecodable += 1;
        }
        Ok(report)
    }
}
