//! C5: the transformation passes (§4.5). Each pass takes exclusive access
//! to the document and rewrites it once, preorder, seeing only the
//! snapshot produced by the previous pass (§3.3, §5).

use crate::error::{DocScraperError, MatcherError, PassError, StructuralError};
use crate::query::QueryEngine;
use crate::tree::Document;

mod config;
mod drop_elements;
mod merge_by_tag;
mod nest_bullets;
mod nest_sections;
mod regex_replace;
mod split_text;
mod strip_elements;
mod tag_matching;
mod tag_update;

pub use config::{Transformation, TransformationConfig};
pub use drop_elements::{DropElements, DropElementsConfig};
pub use merge_by_tag::{MergeByTag, MergeByTagConfig};
pub use nest_bullets::{NestBullets, NestBulletsConfig};
pub use nest_sections::{NestSections, NestSectionsConfig};
pub use regex_replace::{RegexReplace, RegexReplaceConfig};
pub use split_text::{SplitText, SplitTextConfig};
pub use strip_elements::{StripElements, StripElementsConfig};
pub use tag_matching::{TagMatching, TagMatchingConfig};
pub use tag_update::TagUpdateConfig;

/// A single rewrite operator over the whole document (§4.5). `engine` is
/// threaded through every pass (not just `tag_matching`) so the trait
/// stays uniform; most passes ignore it.
pub trait Pass: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, doc: &mut Document, engine: &dyn QueryEngine) -> Result<(), DocScraperError>;
}

fn matcher_err(pass: &'static str, source: MatcherError) -> DocScraperError {
    DocScraperError::Pass(PassError::Matcher { pass, source })
}

fn structural_err(pass: &'static str, source: StructuralError) -> DocScraperError {
    DocScraperError::Pass(PassError::Structural { pass, source })
}

fn other_err(pass: &'static str, message: impl Into<String>) -> DocScraperError {
    DocScraperError::Pass(PassError::Other {
        pass,
        message: message.into(),
    })
}

fn no_matches_err(pattern: impl Into<String>) -> DocScraperError {
    DocScraperError::Pass(PassError::NoMatches { pattern: pattern.into() })
}
