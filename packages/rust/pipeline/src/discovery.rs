//! Relationship discovery pipeline.
//!
//! One [`RelationshipAnalysisJob`] per run. Single-entity strategies analyze
//! one doc or resource against a candidate class; batch strategies iterate a
//! whole class, one entity at a time, warning and continuing on per-entity
//! failures. Candidates go to the model in size-capped batches, and raw
//! model output passes warning-level validation before the confidence
//! filter: a bad entry costs itself, never the job.
//!
//! Discovery and apply are separate steps. `process` leaves filtered,
//! sorted candidates on the completed job; `apply` upserts them into the
//! relationship tables and records the created/updated/skipped counts.

use chrono::Utc;
use tracing::{info, instrument, warn};

use docforge_genai::Generator;
use docforge_genai::relations::{EntitySummary, RawRelation, build_relations_request, parse_relations_response};
use docforge_shared::{
    AnalysisJobType, AnalysisStatus, AppConfig, ContentItem, DiscoveredRelationship,
    DocforgeError, EntityKind, JobId, RelationKind, RelationshipAnalysisJob, Resource, Result,
};
use docforge_storage::{Storage, UpsertOutcome};

use crate::batcher::{Candidate, build_batches};
use crate::confidence::{filter_by_confidence, sort_by_confidence};

const DOC_RESOURCE_VOCABULARY: &[&str] =
    &["references", "implements", "tutorial", "tool", "deep_dive"];
const RESOURCE_RESOURCE_VOCABULARY: &[&str] =
    &["similar", "alternative", "complement", "prerequisite", "successor"];

/// Result of applying a completed job's relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplySummary {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
}

/// One entity's discovery pass, before job-level aggregation.
struct AnalysisOutput {
    relationships: Vec<DiscoveredRelationship>,
    warnings: Vec<String>,
    tokens_used: u64,
}

/// Orchestrates relationship analysis jobs against storage and a generator.
pub struct RelationshipAnalyzer<'a, G> {
    storage: &'a Storage,
    generator: G,
    config: AppConfig,
}

impl<'a, G: Generator> RelationshipAnalyzer<'a, G> {
    pub fn new(storage: &'a Storage, generator: G, config: AppConfig) -> Self {
        Self {
            storage,
            generator,
            config,
        }
    }

    /// Create a new analysis job in `pending`.
    ///
    /// Single-entity strategies require an existing target entity; batch
    /// sweeps take none.
    #[instrument(skip_all, fields(job_type = job_type.as_str()))]
    pub async fn create_job(
        &self,
        job_type: AnalysisJobType,
        target_id: Option<String>,
    ) -> Result<RelationshipAnalysisJob> {
        match (&target_id, job_type.is_batch()) {
            (Some(_), true) => {
                return Err(DocforgeError::validation(format!(
                    "{} is a batch sweep and takes no target id",
                    job_type.as_str()
                )));
            }
            (None, false) => {
                return Err(DocforgeError::validation(format!(
                    "{} requires a target id",
                    job_type.as_str()
                )));
            }
            _ => {}
        }

        if let Some(id) = &target_id {
            match job_type {
                AnalysisJobType::DocToResources => {
                    self.storage
                        .get_content_item(id)
                        .await?
                        .ok_or_else(|| DocforgeError::not_found("content item", id.clone()))?;
                }
                AnalysisJobType::ResourceToDocs | AnalysisJobType::ResourceToResources => {
                    self.storage
                        .get_resource(id)
                        .await?
                        .ok_or_else(|| DocforgeError::not_found("resource", id.clone()))?;
                }
                AnalysisJobType::BatchDocs | AnalysisJobType::BatchResources => {}
            }
        }

        let job = RelationshipAnalysisJob::new(job_type, target_id);
        self.storage.insert_analysis_job(&job).await?;
        info!(job_id = %job.id, "relationship analysis job created");
        Ok(job)
    }

    /// Run a `pending` job's analysis, leaving it `completed` with filtered,
    /// confidence-sorted relationships (or `failed` with the error recorded).
    #[instrument(skip_all, fields(job_id = %job_id))]
    pub async fn process_job(&self, job_id: &JobId) -> Result<RelationshipAnalysisJob> {
        let mut job = self.get_job(job_id).await?;
        if job.status != AnalysisStatus::Pending {
            return Err(DocforgeError::invalid_state("pending", job.status.as_str()));
        }

        job.status = AnalysisStatus::Analyzing;
        job.started_at = Some(Utc::now());
        self.storage.update_analysis_job(&job).await?;

        match self.run_analysis(&job).await {
            Ok(output) => {
                let mut relationships = filter_by_confidence(
                    output.relationships,
                    self.config.confidence.relationship_create_threshold,
                );
                sort_by_confidence(&mut relationships);

                job.relationships = relationships;
                job.warnings = output.warnings;
                job.tokens_used = output.tokens_used;
                job.cost_estimate = output.tokens_used as f64
                    * self.config.generation.cost_per_1k_tokens
                    / 1000.0;
                job.status = AnalysisStatus::Completed;
                job.completed_at = Some(Utc::now());
                self.storage.update_analysis_job(&job).await?;

                info!(
                    relationships = job.relationships.len(),
                    warnings = job.warnings.len(),
                    tokens = job.tokens_used,
                    "analysis completed"
                );
                Ok(job)
            }
            Err(e) => {
                job.error_message = Some(e.to_string());
                job.error_details = Some(format!("retryable: {}", e.is_retryable()));
                job.status = AnalysisStatus::Failed;
                job.completed_at = Some(Utc::now());
                if let Err(persist_err) = self.storage.update_analysis_job(&job).await {
                    warn!(error = %persist_err, "failed to persist failed job state");
                }
                Err(e)
            }
        }
    }

    /// Upsert a completed job's relationships into the persistence tables,
    /// optionally re-filtered by a stricter threshold or a type allow-list.
    ///
    /// Idempotent: re-applying the same job counts updates instead of
    /// creates. A failed upsert costs that edge a warning, never the batch.
    #[instrument(skip_all, fields(job_id = %job_id))]
    pub async fn apply_job(
        &self,
        job_id: &JobId,
        min_confidence: Option<f64>,
        allowed_types: Option<&[RelationKind]>,
    ) -> Result<ApplySummary> {
        let mut job = self.get_job(job_id).await?;
        if job.status != AnalysisStatus::Completed {
            return Err(DocforgeError::invalid_state(
                "completed",
                job.status.as_str(),
            ));
        }

        let threshold = min_confidence.unwrap_or(f64::MIN);
        let selected: Vec<&DiscoveredRelationship> = job
            .relationships
            .iter()
            .filter(|r| r.confidence >= threshold)
            .filter(|r| allowed_types.is_none_or(|ts| ts.contains(&r.relationship_type)))
            .collect();

        let mut summary = ApplySummary {
            created: 0,
            updated: 0,
            skipped: 0,
        };
        let mut upsert_warnings = Vec::new();
        for rel in selected {
            match self.storage.upsert_relationship(rel).await {
                Ok(UpsertOutcome::Created) => summary.created += 1,
                Ok(UpsertOutcome::Updated) => summary.updated += 1,
                Ok(UpsertOutcome::SkippedManual) => summary.skipped += 1,
                Err(e) => {
                    warn!(
                        source = %rel.source_id,
                        target = %rel.target_id,
                        error = %e,
                        "relationship upsert failed"
                    );
                    summary.skipped += 1;
                    upsert_warnings.push(format!(
                        "upsert {} -> {} failed: {e}",
                        rel.source_id, rel.target_id
                    ));
                }
            }
        }
        job.warnings.extend(upsert_warnings);

        job.created_count = summary.created;
        job.updated_count = summary.updated;
        job.skipped_count = summary.skipped;
        self.storage.update_analysis_job(&job).await?;

        info!(
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            "relationships applied"
        );
        Ok(summary)
    }

    /// Cancel a job from any non-terminal status.
    #[instrument(skip_all, fields(job_id = %job_id))]
    pub async fn cancel_job(&self, job_id: &JobId) -> Result<RelationshipAnalysisJob> {
        let mut job = self.get_job(job_id).await?;
        if job.status.is_terminal() {
            return Err(DocforgeError::invalid_state(
                "any non-terminal status",
                job.status.as_str(),
            ));
        }

        job.status = AnalysisStatus::Cancelled;
        job.completed_at = Some(Utc::now());
        self.storage.update_analysis_job(&job).await?;
        info!("analysis job cancelled");
        Ok(job)
    }

    // -----------------------------------------------------------------------
    // Strategy dispatch
    // -----------------------------------------------------------------------

    async fn run_analysis(&self, job: &RelationshipAnalysisJob) -> Result<AnalysisOutput> {
        match job.job_type {
            AnalysisJobType::DocToResources => {
                let id = require_target(job)?;
                let item = self.get_item(id).await?;
                self.analyze_doc(&item).await
            }
            AnalysisJobType::ResourceToDocs => {
                let id = require_target(job)?;
                let resource = self.get_resource(id).await?;
                let docs = self.storage.list_published_items().await?;
                self.analyze_resource_against_docs(&resource, &docs).await
            }
            AnalysisJobType::ResourceToResources => {
                let id = require_target(job)?;
                let resource = self.get_resource(id).await?;
                let all = self.storage.list_active_resources().await?;
                self.analyze_resource_against_resources(&resource, &all)
                    .await
            }
            AnalysisJobType::BatchDocs => {
                let docs = self.storage.list_published_items().await?;
                let mut combined = AnalysisOutput {
                    relationships: Vec::new(),
                    warnings: Vec::new(),
                    tokens_used: 0,
                };
                for item in &docs {
                    match self.analyze_doc(item).await {
                        Ok(output) => merge(&mut combined, output),
                        Err(e) => {
                            warn!(item = %item.slug, error = %e, "doc analysis failed, continuing sweep");
                            combined
                                .warnings
                                .push(format!("analysis failed for doc {}: {e}", item.id));
                        }
                    }
                }
                Ok(combined)
            }
            AnalysisJobType::BatchResources => {
                let resources = self.storage.list_active_resources().await?;
                let mut combined = AnalysisOutput {
                    relationships: Vec::new(),
                    warnings: Vec::new(),
                    tokens_used: 0,
                };
                for resource in &resources {
                    match self
                        .analyze_resource_against_resources(resource, &resources)
                        .await
                    {
                        Ok(output) => merge(&mut combined, output),
                        Err(e) => {
                            warn!(resource = %resource.name, error = %e, "resource analysis failed, continuing sweep");
                            combined
                                .warnings
                                .push(format!("analysis failed for resource {}: {e}", resource.id));
                        }
                    }
                }
                Ok(combined)
            }
        }
    }

    async fn analyze_doc(&self, item: &ContentItem) -> Result<AnalysisOutput> {
        let resources = self.storage.list_active_resources().await?;
        let candidates: Vec<Candidate> = resources.iter().map(resource_candidate).collect();
        self.analyze_entity(
            doc_summary(item),
            &item.content,
            EntityKind::Doc,
            EntityKind::Resource,
            candidates,
        )
        .await
    }

    async fn analyze_resource_against_docs(
        &self,
        resource: &Resource,
        docs: &[ContentItem],
    ) -> Result<AnalysisOutput> {
        let candidates: Vec<Candidate> = docs.iter().map(doc_candidate).collect();
        self.analyze_entity(
            resource_summary(resource),
            &resource.description,
            EntityKind::Resource,
            EntityKind::Doc,
            candidates,
        )
        .await
    }

    async fn analyze_resource_against_resources(
        &self,
        resource: &Resource,
        all: &[Resource],
    ) -> Result<AnalysisOutput> {
        let candidates: Vec<Candidate> = all
            .iter()
            .filter(|r| r.id != resource.id)
            .map(resource_candidate)
            .collect();
        self.analyze_entity(
            resource_summary(resource),
            &resource.description,
            EntityKind::Resource,
            EntityKind::Resource,
            candidates,
        )
        .await
    }

    /// Run one source entity against its candidates in capped batches.
    async fn analyze_entity(
        &self,
        source: EntitySummary,
        source_content: &str,
        source_kind: EntityKind,
        target_kind: EntityKind,
        candidates: Vec<Candidate>,
    ) -> Result<AnalysisOutput> {
        let mut output = AnalysisOutput {
            relationships: Vec::new(),
            warnings: Vec::new(),
            tokens_used: 0,
        };
        if candidates.is_empty() {
            return Ok(output);
        }

        let vocabulary = match (source_kind, target_kind) {
            (EntityKind::Resource, EntityKind::Resource) => RESOURCE_RESOURCE_VOCABULARY,
            _ => DOC_RESOURCE_VOCABULARY,
        };

        for batch in build_batches(&candidates, &self.config.batching) {
            let summaries: Vec<EntitySummary> = batch
                .iter()
                .map(|c| EntitySummary {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    description: c.description.clone(),
                    tags: c.tags.clone(),
                })
                .collect();

            let request = build_relations_request(
                &source,
                source_content,
                &summaries,
                vocabulary,
                self.config.generation.max_tokens,
            );
            let generation = self.generator.generate(&request).await?;
            output.tokens_used += generation.total_tokens();

            let (raw, parse_warnings) = parse_relations_response(&generation.text)?;
            output.warnings.extend(parse_warnings);

            for entry in raw {
                match validate_relation(&entry, &source.id, source_kind, target_kind, &batch) {
                    Ok(rel) => output.relationships.push(rel),
                    Err(reason) => output.warnings.push(reason),
                }
            }
        }

        Ok(output)
    }

    async fn get_job(&self, job_id: &JobId) -> Result<RelationshipAnalysisJob> {
        self.storage
            .get_analysis_job(job_id)
            .await?
            .ok_or_else(|| DocforgeError::not_found("analysis job", job_id.to_string()))
    }

    async fn get_item(&self, id: &str) -> Result<ContentItem> {
        self.storage
            .get_content_item(id)
            .await?
            .ok_or_else(|| DocforgeError::not_found("content item", id))
    }

    async fn get_resource(&self, id: &str) -> Result<Resource> {
        self.storage
            .get_resource(id)
            .await?
            .ok_or_else(|| DocforgeError::not_found("resource", id))
    }
}

// ---------------------------------------------------------------------------
// Validation & conversion helpers
// ---------------------------------------------------------------------------

fn require_target(job: &RelationshipAnalysisJob) -> Result<&str> {
    job.target_id
        .as_deref()
        .ok_or_else(|| DocforgeError::validation("analysis job has no target id"))
}

/// Validate one raw model entry against the vocabulary, confidence range,
/// and candidate set. Violations come back as warning text.
fn validate_relation(
    raw: &RawRelation,
    source_id: &str,
    source_kind: EntityKind,
    target_kind: EntityKind,
    batch: &[Candidate],
) -> std::result::Result<DiscoveredRelationship, String> {
    if !batch.iter().any(|c| c.id == raw.target_id) {
        return Err(format!(
            "discarded relationship to unknown candidate {}",
            raw.target_id
        ));
    }
    if !(0.0..=1.0).contains(&raw.confidence) {
        return Err(format!(
            "discarded relationship to {}: confidence {} outside [0, 1]",
            raw.target_id, raw.confidence
        ));
    }
    if raw.reasoning.trim().is_empty() {
        return Err(format!(
            "discarded relationship to {}: missing reasoning",
            raw.target_id
        ));
    }
    let kind: RelationKind = raw
        .relationship_type
        .parse()
        .map_err(|_| format!(
            "discarded relationship to {}: unknown type {:?}",
            raw.target_id, raw.relationship_type
        ))?;
    if !kind.valid_for(source_kind, target_kind) {
        return Err(format!(
            "discarded relationship to {}: type {} not valid for {} -> {}",
            raw.target_id,
            kind.as_str(),
            source_kind.as_str(),
            target_kind.as_str()
        ));
    }

    Ok(DiscoveredRelationship {
        source_kind,
        source_id: source_id.to_string(),
        target_kind,
        target_id: raw.target_id.clone(),
        relationship_type: kind,
        confidence: raw.confidence,
        reasoning: raw.reasoning.clone(),
        shared_tags: raw.shared_tags.clone(),
    })
}

fn merge(into: &mut AnalysisOutput, from: AnalysisOutput) {
    into.relationships.extend(from.relationships);
    into.warnings.extend(from.warnings);
    into.tokens_used += from.tokens_used;
}

fn doc_summary(item: &ContentItem) -> EntitySummary {
    EntitySummary {
        id: item.id.clone(),
        name: item.title.clone(),
        description: item.description.clone(),
        tags: item.category.clone().into_iter().collect(),
    }
}

fn resource_summary(resource: &Resource) -> EntitySummary {
    EntitySummary {
        id: resource.id.clone(),
        name: resource.name.clone(),
        description: resource.description.clone(),
        tags: resource.tags.clone(),
    }
}

fn doc_candidate(item: &ContentItem) -> Candidate {
    Candidate {
        id: item.id.clone(),
        name: item.title.clone(),
        description: item.description.clone(),
        tags: item.category.clone().into_iter().collect(),
    }
}

fn resource_candidate(resource: &Resource) -> Candidate {
    Candidate {
        id: resource.id.clone(),
        name: resource.name.clone(),
        description: resource.description.clone(),
        tags: resource.tags.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
