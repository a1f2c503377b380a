//! Job orchestration for docforge.
//!
//! Two pipelines share the durable-job model backed by storage:
//! - [`ContentUpdatePipeline`] drives scrape → rewrite → review → apply
//!   refreshes of individual content items.
//! - [`RelationshipAnalyzer`] drives AI discovery of typed edges between
//!   content items and catalog resources.
//!
//! Both are generic over their AI/network seams ([`docforge_scrape::SourceScraper`],
//! [`docforge_genai::Generator`]) so tests run against in-memory doubles.

pub mod batcher;
pub mod confidence;
pub mod content;
pub mod diff;
pub mod discovery;

pub use batcher::{Candidate, build_batches};
pub use confidence::{filter_by_confidence, sort_by_confidence};
pub use content::ContentUpdatePipeline;
pub use diff::line_diff;
pub use discovery::{ApplySummary, RelationshipAnalyzer};
