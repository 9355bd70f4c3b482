//! Doc Scraper: a document-tree transformation engine for semi-structured
//! word-processor exports (Google Docs HTML, already parsed upstream into
//! the tree this crate works on). See `SPEC_FULL.md` for the full picture;
//! module-level docs below cover the moving parts.

pub mod error;
pub mod matcher;
pub mod template;
pub mod traversal;
pub mod tree;
pub mod variables;

pub mod passes;
pub mod query;

pub mod config;
pub mod output;
pub mod pipeline;

pub use error::{DocScraperError, Result};
pub use tree::Document;
