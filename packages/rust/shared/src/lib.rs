//! Shared types, error model, and configuration for docforge.
//!
//! This crate is the foundation depended on by all other docforge crates.
//! It provides:
//! - [`DocforgeError`] — the unified error type
//! - Domain types ([`ContentItem`], [`ContentUpdateJob`], [`Relationship`], ...)
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BatchingConfig, ConfidenceConfig, DefaultsConfig, GenerationConfig, ScrapeConfig,
    SweepConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    validate_api_key,
};
pub use error::{DocforgeError, Result};
pub use types::{
    AnalysisJobType, AnalysisStatus, ContentHistoryEntry, ContentItem, ContentUpdateJob,
    ContentUpdateStatus, DiscoveredRelationship, EntityKind, JobId, ProposedUpdate, RelationKind,
    Relationship, RelationshipAnalysisJob, Resource, ScrapeFailure, ScrapedSnapshot, SourceRef,
    TriggerKind, content_hash_of,
};
