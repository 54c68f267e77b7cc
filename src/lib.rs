#![doc = include_str!("../README.md")]
#![no_std]
#![deny(clippy::mod_module_files)]

extern crate alloc;

pub mod batch;
#[cfg(feature = "client")]
pub mod client;
pub mod errors;
pub mod response;
pub mod splitter;
pub mod upload;

// Re-export main types
pub use batch::{Batch, plan_batches};
pub use response::QueryResponse;
pub use splitter::{
    Splitter, ends_with_line_comment, is_meaningful, meaningful_statements, split_statements,
};
pub use upload::{
    DEFAULT_MAX_BATCH_SIZE, DEFAULT_PREVIEW_CHARS, QueryEndpoint, UploadOptions, UploadReport,
    Uploader, cleanup_query,
};

#[cfg(feature = "client")]
pub use client::{ClientConfig, ClientError, ManagementApiClient, management_api_url};

// Re-export errors
pub use errors::{Phase, UploadError};
