//! C6: the extraction stage and its embedded query surface (§4.6, §6.3).

mod engine;
mod eval;
mod extract;
mod lexer;
mod parser;
mod projection;

pub use engine::{HandWrittenQueryEngine, QueryEngine};
pub use extract::ExtractSpec;
pub use projection::{project_document, project_element};
