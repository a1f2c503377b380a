//! Core domain types for the docforge content pipeline.
//!
//! Two job kinds share a durable lifecycle model: [`ContentUpdateJob`]
//! drives a scrape → rewrite → review → apply refresh of one
//! [`ContentItem`]; [`RelationshipAnalysisJob`] drives AI discovery of
//! typed, confidence-scored edges between items and [`Resource`]s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DocforgeError;

/// Compute the SHA-256 hex digest of a content body.
///
/// Invariant: `ContentItem::content_hash` is always `content_hash_of(&item.content)`.
pub fn content_hash_of(content: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// JobId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for job identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a new time-sortable job identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Content items & resources
// ---------------------------------------------------------------------------

/// A cited source attached to a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Display title for the citation.
    pub title: String,
    /// Source URL, scraped during content refresh.
    pub url: String,
}

/// An addressable documentation unit with a body, metadata, and citations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    /// Unique identifier (UUID v7 as string).
    pub id: String,
    /// URL-safe slug, unique per site.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Short description / abstract.
    pub description: String,
    /// Full markdown body.
    pub content: String,
    /// Cited sources, scraped on refresh.
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    /// Monotonic version, bumped on every apply.
    pub version: u32,
    /// SHA-256 hex of `content`.
    pub content_hash: String,
    /// Optional category for sweep filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Only published items participate in discovery and sweeps.
    pub published: bool,
    /// When an AI refresh was last applied, if ever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An external resource in the catalog (library, article, tool, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Unique identifier (UUID v7 as string).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short description used for candidate token estimation.
    pub description: String,
    /// Canonical URL.
    pub url: String,
    /// Free-form kind label ("library", "article", ...).
    pub resource_type: String,
    /// Tags used for shared-tag hints in discovery.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Only active resources participate in discovery.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Content update jobs
// ---------------------------------------------------------------------------

/// What initiated a content update job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Manual,
    Scheduled,
    Webhook,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
            Self::Webhook => "webhook",
        }
    }
}

impl std::str::FromStr for TriggerKind {
    type Err = DocforgeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "scheduled" => Ok(Self::Scheduled),
            "webhook" => Ok(Self::Webhook),
            other => Err(DocforgeError::validation(format!(
                "unknown trigger kind: {other}"
            ))),
        }
    }
}

/// Content update job lifecycle.
///
/// ```text
/// pending → scraping → analyzing → ready_for_review → approved → applied
///                                        ↘ rejected
///            (any stage error) → failed
///            (any non-terminal) → cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentUpdateStatus {
    Pending,
    Scraping,
    Analyzing,
    ReadyForReview,
    Approved,
    Applied,
    Rejected,
    Failed,
    Cancelled,
}

impl ContentUpdateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scraping => "scraping",
            Self::Analyzing => "analyzing",
            Self::ReadyForReview => "ready_for_review",
            Self::Approved => "approved",
            Self::Applied => "applied",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal states accept no further transitions (except the
    /// `applied_at` timestamp written together with `Applied`).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Applied | Self::Rejected | Self::Failed | Self::Cancelled
        )
    }
}

impl std::str::FromStr for ContentUpdateStatus {
    type Err = DocforgeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "scraping" => Ok(Self::Scraping),
            "analyzing" => Ok(Self::Analyzing),
            "ready_for_review" => Ok(Self::ReadyForReview),
            "approved" => Ok(Self::Approved),
            "applied" => Ok(Self::Applied),
            "rejected" => Ok(Self::Rejected),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DocforgeError::validation(format!(
                "unknown content update status: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for ContentUpdateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successfully scraped source snapshot, carried on the job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedSnapshot {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Extracted main-content text.
    pub markdown: String,
    pub fetched_at: DateTime<Utc>,
}

/// A per-URL scrape failure, recorded but non-fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeFailure {
    pub url: String,
    pub error: String,
}

/// Replacement fields proposed by the generation service.
///
/// Set exactly once during the analyze stage; immutable afterwards except
/// for being copied into the [`ContentItem`] on apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedUpdate {
    pub title: String,
    pub description: String,
    pub content: String,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
}

/// One attempt to refresh a content item. Created once per trigger;
/// never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentUpdateJob {
    pub id: JobId,
    /// Target content item.
    pub item_id: String,
    pub status: ContentUpdateStatus,
    pub trigger: TriggerKind,
    /// Who or what initiated the job (username, "scheduler", ...).
    pub triggered_by: String,
    /// Snapshot of the item's content at job creation, for diffing.
    pub current_content: String,
    /// Successfully scraped source snapshots.
    #[serde(default)]
    pub scraped: Vec<ScrapedSnapshot>,
    /// Per-URL scrape failures (non-fatal).
    #[serde(default)]
    pub scrape_failures: Vec<ScrapeFailure>,
    /// Proposed replacement fields from the analyze stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed: Option<ProposedUpdate>,
    /// AI-reported change summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// AI self-reported confidence in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// AI-reported caveats.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// AI-reported key changes, one bullet per entry.
    #[serde(default)]
    pub key_changes: Vec<String>,
    /// Human-readable diff between current and proposed content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    /// Reviewer identity, set on approve/reject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    /// Number of `process` attempts so far.
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
}

impl ContentUpdateJob {
    /// Create a fresh job in `pending` for the given item.
    pub fn new(item: &ContentItem, trigger: TriggerKind, triggered_by: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            item_id: item.id.clone(),
            status: ContentUpdateStatus::Pending,
            trigger,
            triggered_by: triggered_by.into(),
            current_content: item.content.clone(),
            scraped: Vec::new(),
            scrape_failures: Vec::new(),
            proposed: None,
            summary: None,
            confidence: None,
            warnings: Vec::new(),
            key_changes: Vec::new(),
            diff: None,
            reviewer: None,
            review_notes: None,
            error_message: None,
            error_details: None,
            retry_count: 0,
            created_at: Utc::now(),
            started_at: None,
            scraped_at: None,
            analyzed_at: None,
            reviewed_at: None,
            applied_at: None,
        }
    }
}

/// An immutable snapshot of a content item at a given version, written
/// exactly once when an update job is approved and applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentHistoryEntry {
    pub id: String,
    pub item_id: String,
    /// Item version this snapshot captures (pre-apply).
    pub version: u32,
    pub title: String,
    pub description: String,
    pub content: String,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    pub content_hash: String,
    /// The update job whose apply produced this entry.
    pub job_id: JobId,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Relationship analysis jobs
// ---------------------------------------------------------------------------

/// Which discovery strategy a relationship analysis job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisJobType {
    /// One content item against all active resources.
    DocToResources,
    /// One resource against all published content items.
    ResourceToDocs,
    /// One resource against all other active resources.
    ResourceToResources,
    /// Sweep: every published item via `DocToResources`.
    BatchDocs,
    /// Sweep: every active resource via `ResourceToResources`.
    BatchResources,
}

impl AnalysisJobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocToResources => "doc_to_resources",
            Self::ResourceToDocs => "resource_to_docs",
            Self::ResourceToResources => "resource_to_resources",
            Self::BatchDocs => "batch_docs",
            Self::BatchResources => "batch_resources",
        }
    }

    /// Batch sweeps iterate a whole entity class and take no target id.
    pub fn is_batch(&self) -> bool {
        matches!(self, Self::BatchDocs | Self::BatchResources)
    }
}

impl std::str::FromStr for AnalysisJobType {
    type Err = DocforgeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "doc_to_resources" => Ok(Self::DocToResources),
            "resource_to_docs" => Ok(Self::ResourceToDocs),
            "resource_to_resources" => Ok(Self::ResourceToResources),
            "batch_docs" => Ok(Self::BatchDocs),
            "batch_resources" => Ok(Self::BatchResources),
            other => Err(DocforgeError::validation(format!(
                "unknown analysis job type: {other}"
            ))),
        }
    }
}

/// Relationship analysis job lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Analyzing,
    Completed,
    Failed,
    Cancelled,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Analyzing => "analyzing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::str::FromStr for AnalysisStatus {
    type Err = DocforgeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "analyzing" => Ok(Self::Analyzing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DocforgeError::validation(format!(
                "unknown analysis status: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two entity classes an edge can connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Doc,
    Resource,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Doc => "doc",
            Self::Resource => "resource",
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = DocforgeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "doc" => Ok(Self::Doc),
            "resource" => Ok(Self::Resource),
            other => Err(DocforgeError::validation(format!(
                "unknown entity kind: {other}"
            ))),
        }
    }
}

/// Closed relationship vocabulary.
///
/// The valid subset depends on the (source, target) entity kinds:
/// doc↔resource edges use the first five variants, resource↔resource edges
/// the last five. [`RelationKind::valid_for`] enforces the split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    // doc ↔ resource
    References,
    Implements,
    Tutorial,
    Tool,
    DeepDive,
    // resource ↔ resource
    Similar,
    Alternative,
    Complement,
    Prerequisite,
    Successor,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::References => "references",
            Self::Implements => "implements",
            Self::Tutorial => "tutorial",
            Self::Tool => "tool",
            Self::DeepDive => "deep_dive",
            Self::Similar => "similar",
            Self::Alternative => "alternative",
            Self::Complement => "complement",
            Self::Prerequisite => "prerequisite",
            Self::Successor => "successor",
        }
    }

    /// Whether this kind is drawn from the vocabulary valid for the given
    /// (source, target) entity pair.
    pub fn valid_for(&self, source: EntityKind, target: EntityKind) -> bool {
        let doc_resource = matches!(
            self,
            Self::References | Self::Implements | Self::Tutorial | Self::Tool | Self::DeepDive
        );
        match (source, target) {
            (EntityKind::Resource, EntityKind::Resource) => !doc_resource,
            // Either direction between a doc and a resource.
            (EntityKind::Doc, EntityKind::Resource) | (EntityKind::Resource, EntityKind::Doc) => {
                doc_resource
            }
            (EntityKind::Doc, EntityKind::Doc) => false,
        }
    }
}

impl std::str::FromStr for RelationKind {
    type Err = DocforgeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "references" => Ok(Self::References),
            "implements" => Ok(Self::Implements),
            "tutorial" => Ok(Self::Tutorial),
            "tool" => Ok(Self::Tool),
            "deep_dive" => Ok(Self::DeepDive),
            "similar" => Ok(Self::Similar),
            "alternative" => Ok(Self::Alternative),
            "complement" => Ok(Self::Complement),
            "prerequisite" => Ok(Self::Prerequisite),
            "successor" => Ok(Self::Successor),
            other => Err(DocforgeError::validation(format!(
                "unknown relation kind: {other}"
            ))),
        }
    }
}

/// A candidate edge produced by one analysis call.
///
/// Never persisted directly — either discarded at filter time or converted
/// into a [`Relationship`] by the apply layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredRelationship {
    pub source_kind: EntityKind,
    pub source_id: String,
    pub target_kind: EntityKind,
    pub target_id: String,
    pub relationship_type: RelationKind,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Free-text model reasoning.
    pub reasoning: String,
    #[serde(default)]
    pub shared_tags: Vec<String>,
}

/// A discovery run: one job, one strategy, results carried on the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipAnalysisJob {
    pub id: JobId,
    pub job_type: AnalysisJobType,
    /// Source entity for single-entity strategies; `None` for sweeps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    pub status: AnalysisStatus,
    /// Filtered, sorted discovery output.
    #[serde(default)]
    pub relationships: Vec<DiscoveredRelationship>,
    /// Validation violations collected during analysis (non-fatal).
    #[serde(default)]
    pub warnings: Vec<String>,
    pub created_count: u32,
    pub updated_count: u32,
    pub skipped_count: u32,
    pub tokens_used: u64,
    pub cost_estimate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RelationshipAnalysisJob {
    /// Create a fresh job in `pending`.
    pub fn new(job_type: AnalysisJobType, target_id: Option<String>) -> Self {
        Self {
            id: JobId::new(),
            job_type,
            target_id,
            status: AnalysisStatus::Pending,
            relationships: Vec::new(),
            warnings: Vec::new(),
            created_count: 0,
            updated_count: 0,
            skipped_count: 0,
            tokens_used: 0,
            cost_estimate: 0.0,
            error_message: None,
            error_details: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }
}

/// A persisted, versioned, upsertable edge keyed by the (source, target)
/// pair.
///
/// Invariant: `confidence` reflects the most recent analysis unless
/// `is_manual` is set, in which case automated apply never overwrites it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub source_kind: EntityKind,
    pub source_id: String,
    pub target_kind: EntityKind,
    pub target_id: String,
    pub relationship_type: RelationKind,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub shared_tags: Vec<String>,
    /// Set by an operator; shields the edge from automated updates.
    pub is_manual: bool,
    /// Bumped on every automated update.
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_roundtrip() {
        let id = JobId::new();
        let s = id.to_string();
        let parsed: JobId = s.parse().expect("parse JobId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn content_hash_is_stable() {
        let h1 = content_hash_of("# Hello");
        let h2 = content_hash_of("# Hello");
        assert_eq!(h1, h2);
        assert_ne!(h1, content_hash_of("# hello"));
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            ContentUpdateStatus::Pending,
            ContentUpdateStatus::Scraping,
            ContentUpdateStatus::Analyzing,
            ContentUpdateStatus::ReadyForReview,
            ContentUpdateStatus::Approved,
            ContentUpdateStatus::Applied,
            ContentUpdateStatus::Rejected,
            ContentUpdateStatus::Failed,
            ContentUpdateStatus::Cancelled,
        ] {
            let parsed: ContentUpdateStatus = status.as_str().parse().expect("roundtrip");
            assert_eq!(parsed, status);
        }
        assert!("ready-for-review".parse::<ContentUpdateStatus>().is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(ContentUpdateStatus::Applied.is_terminal());
        assert!(ContentUpdateStatus::Rejected.is_terminal());
        assert!(ContentUpdateStatus::Failed.is_terminal());
        assert!(ContentUpdateStatus::Cancelled.is_terminal());
        assert!(!ContentUpdateStatus::Pending.is_terminal());
        assert!(!ContentUpdateStatus::ReadyForReview.is_terminal());
        assert!(!ContentUpdateStatus::Approved.is_terminal());

        assert!(AnalysisStatus::Completed.is_terminal());
        assert!(!AnalysisStatus::Analyzing.is_terminal());
    }

    #[test]
    fn job_type_string_roundtrip() {
        for jt in [
            AnalysisJobType::DocToResources,
            AnalysisJobType::ResourceToDocs,
            AnalysisJobType::ResourceToResources,
            AnalysisJobType::BatchDocs,
            AnalysisJobType::BatchResources,
        ] {
            let parsed: AnalysisJobType = jt.as_str().parse().expect("roundtrip");
            assert_eq!(parsed, jt);
        }
        assert!(AnalysisJobType::BatchDocs.is_batch());
        assert!(!AnalysisJobType::DocToResources.is_batch());
    }

    #[test]
    fn relation_kind_vocabulary_split() {
        use EntityKind::{Doc, Resource};

        assert!(RelationKind::References.valid_for(Doc, Resource));
        assert!(RelationKind::Tutorial.valid_for(Resource, Doc));
        assert!(!RelationKind::Similar.valid_for(Doc, Resource));

        assert!(RelationKind::Similar.valid_for(Resource, Resource));
        assert!(RelationKind::Prerequisite.valid_for(Resource, Resource));
        assert!(!RelationKind::References.valid_for(Resource, Resource));

        // No doc↔doc vocabulary exists.
        assert!(!RelationKind::References.valid_for(Doc, Doc));
        assert!(!RelationKind::Similar.valid_for(Doc, Doc));
    }

    #[test]
    fn new_content_job_is_pending() {
        let item = ContentItem {
            id: "item-1".into(),
            slug: "intro".into(),
            title: "Intro".into(),
            description: "d".into(),
            content: "# Intro".into(),
            sources: vec![],
            version: 1,
            content_hash: content_hash_of("# Intro"),
            category: None,
            published: true,
            last_refreshed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let job = ContentUpdateJob::new(&item, TriggerKind::Manual, "alice");
        assert_eq!(job.status, ContentUpdateStatus::Pending);
        assert_eq!(job.item_id, "item-1");
        assert_eq!(job.current_content, "# Intro");
        assert_eq!(job.retry_count, 0);
        assert!(job.proposed.is_none());
    }

    #[test]
    fn discovered_relationship_serialization() {
        let rel = DiscoveredRelationship {
            source_kind: EntityKind::Doc,
            source_id: "doc-1".into(),
            target_kind: EntityKind::Resource,
            target_id: "res-9".into(),
            relationship_type: RelationKind::DeepDive,
            confidence: 0.83,
            reasoning: "covers the same protocol in depth".into(),
            shared_tags: vec!["networking".into()],
        };
        let json = serde_json::to_string(&rel).expect("serialize");
        assert!(json.contains(r#""relationship_type":"deep_dive""#));
        let parsed: DiscoveredRelationship = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.relationship_type, RelationKind::DeepDive);
        assert_eq!(parsed.confidence, 0.83);
    }
}
