//! # labelsmith – spreadsheet records → paginated label documents
//!
//! This crate turns a label template authored in a word processor plus a
//! sheet of specimen records into a print-ready, paginated document. The
//! pipeline stages are:
//!
//! 1. **Process** – select, sort, filter, and format the records ([`process`],
//!    [`format`])
//! 2. **Expand** – apply duplicate counts, collated or uncollated ([`process`])
//! 3. **Preprocess** – defragment placeholders, detect the per-page slot
//!    count from `{:next}` markers, rewrite `{name}` to indexed slot
//!    references ([`preprocess`])
//! 4. **Wrap** – enclose the body in a `{#pages}` repetition loop with page
//!    breaks ([`wrap`])
//! 5. **Paginate** – chunk the records into fixed-size, padded pages
//!    ([`paginate`])
//! 6. **Render** – hand page data to the external zip + mark-up engine
//!    ([`engine`], [`pipeline`])

pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod geo;
pub mod paginate;
pub mod pipeline;
pub mod preprocess;
pub mod process;
pub mod record;
pub mod templates;
pub mod validate;
pub mod wrap;

// Re-exports for convenience
pub use config::{Config, Limits};
pub use engine::{EngineError, RenderEngine};
pub use error::GenerateError;
pub use paginate::Page;
pub use pipeline::{generate, prepare, GenerateOutput, GenerateStats};
pub use record::{CellValue, Record, Row};
