//! Intelligence extraction: directive construction, the extraction call,
//! and defensive parsing of the model's JSON.

pub mod directive;
pub mod extractor;
pub mod parser;

pub use directive::extraction_directive;
pub use extractor::{ExtractionError, ExtractorSettings, IntelligenceExtractor, MIN_TRANSCRIPT_TURNS};
pub use parser::parse_report;
