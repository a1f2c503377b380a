//! Content update pipeline: scrape → rewrite → review → apply.
//!
//! One [`ContentUpdateJob`] per refresh attempt. The pipeline moves the job
//! through its statuses, persisting after every stage so a crash leaves an
//! inspectable row rather than lost work. Review is a human gate: `process`
//! stops at `ready_for_review` and a separate approve/reject call finishes
//! the lifecycle.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use docforge_genai::Generator;
use docforge_genai::rewrite::{build_rewrite_request, parse_rewrite_response};
use docforge_scrape::SourceScraper;
use docforge_shared::{
    AppConfig, ContentItem, ContentUpdateJob, ContentUpdateStatus, DocforgeError, JobId, Result,
    ScrapeFailure, ScrapedSnapshot, TriggerKind,
};
use docforge_storage::Storage;

use crate::diff::line_diff;

/// Orchestrates content update jobs against storage, a scraper, and a
/// generator.
pub struct ContentUpdatePipeline<'a, S, G> {
    storage: &'a Storage,
    scraper: S,
    generator: G,
    config: AppConfig,
}

impl<'a, S: SourceScraper, G: Generator> ContentUpdatePipeline<'a, S, G> {
    pub fn new(storage: &'a Storage, scraper: S, generator: G, config: AppConfig) -> Self {
        Self {
            storage,
            scraper,
            generator,
            config,
        }
    }

    /// Create a new update job for a content item, in `pending`.
    #[instrument(skip_all, fields(item_id = %item_id))]
    pub async fn create_job(
        &self,
        item_id: &str,
        trigger: TriggerKind,
        triggered_by: &str,
    ) -> Result<ContentUpdateJob> {
        let item = self
            .storage
            .get_content_item(item_id)
            .await?
            .ok_or_else(|| DocforgeError::not_found("content item", item_id))?;

        let job = ContentUpdateJob::new(&item, trigger, triggered_by);
        self.storage.insert_content_job(&job).await?;
        info!(job_id = %job.id, slug = %item.slug, "content update job created");
        Ok(job)
    }

    /// Run the scrape and rewrite stages of a `pending` job, leaving it in
    /// `ready_for_review` (or `failed` with the error recorded on the row).
    ///
    /// A `failed` job may be processed again: retry is always an explicit
    /// caller decision, tallied in `retry_count`.
    #[instrument(skip_all, fields(job_id = %job_id))]
    pub async fn process_job(&self, job_id: &JobId) -> Result<ContentUpdateJob> {
        let mut job = self.get_job(job_id).await?;
        match job.status {
            ContentUpdateStatus::Pending => {}
            ContentUpdateStatus::Failed => {
                // Fresh attempt: clear the previous run's outputs.
                job.error_message = None;
                job.error_details = None;
                job.scraped.clear();
                job.scrape_failures.clear();
                job.warnings.clear();
            }
            _ => {
                return Err(DocforgeError::invalid_state(
                    "pending or failed",
                    job.status.as_str(),
                ));
            }
        }

        let item = self
            .storage
            .get_content_item(&job.item_id)
            .await?
            .ok_or_else(|| DocforgeError::not_found("content item", job.item_id.clone()))?;

        job.status = ContentUpdateStatus::Scraping;
        job.started_at = Some(Utc::now());
        job.retry_count += 1;
        self.storage.update_content_job(&job).await?;

        match self.run_stages(&mut job, &item).await {
            Ok(()) => {
                self.storage.update_content_job(&job).await?;
                info!(
                    snapshots = job.scraped.len(),
                    failures = job.scrape_failures.len(),
                    confidence = job.confidence,
                    "job ready for review"
                );
                Ok(job)
            }
            Err(e) => {
                job.error_message = Some(e.to_string());
                job.error_details = Some(format!(
                    "failed during {}; retryable: {}",
                    job.status,
                    e.is_retryable()
                ));
                job.status = ContentUpdateStatus::Failed;
                if let Err(persist_err) = self.storage.update_content_job(&job).await {
                    warn!(error = %persist_err, "failed to persist failed job state");
                }
                Err(e)
            }
        }
    }

    async fn run_stages(&self, job: &mut ContentUpdateJob, item: &ContentItem) -> Result<()> {
        // --- Scrape stage ---
        if item.sources.is_empty() {
            return Err(DocforgeError::validation(
                "content item has no sources to scrape",
            ));
        }

        let concurrency = (self.config.scrape.concurrency as usize).max(1);
        let mut results: Vec<(usize, Result<ScrapedSnapshot>)> =
            stream::iter(item.sources.iter().enumerate())
                .map(|(i, source)| {
                    let scraper = &self.scraper;
                    async move { (i, scraper.scrape(&source.url).await) }
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;
        // Restore source order after unordered completion.
        results.sort_by_key(|(i, _)| *i);

        for (i, result) in results {
            match result {
                Ok(snapshot) => job.scraped.push(snapshot),
                Err(e) => {
                    let url = item.sources[i].url.clone();
                    warn!(%url, error = %e, "source scrape failed");
                    job.scrape_failures.push(ScrapeFailure {
                        url,
                        error: e.to_string(),
                    });
                }
            }
        }

        if job.scraped.is_empty() {
            return Err(DocforgeError::Scrape(format!(
                "all {} sources failed",
                item.sources.len()
            )));
        }

        job.scraped_at = Some(Utc::now());
        job.status = ContentUpdateStatus::Analyzing;
        self.storage.update_content_job(job).await?;

        // --- Rewrite stage ---
        let request =
            build_rewrite_request(item, &job.scraped, self.config.generation.max_tokens);
        let generation = self.generator.generate(&request).await?;
        let outcome = parse_rewrite_response(&generation.text)?;

        job.diff = Some(line_diff(&job.current_content, &outcome.proposed.content));
        job.summary = Some(outcome.summary);
        job.confidence = Some(outcome.confidence);
        job.key_changes = outcome.key_changes;
        job.warnings = outcome.warnings;
        if outcome.confidence < self.config.confidence.rewrite_apply_threshold {
            job.warnings.push(format!(
                "confidence {:.2} below apply threshold {:.2}",
                outcome.confidence, self.config.confidence.rewrite_apply_threshold
            ));
        }
        job.proposed = Some(outcome.proposed);
        job.analyzed_at = Some(Utc::now());
        job.status = ContentUpdateStatus::ReadyForReview;
        Ok(())
    }

    /// Approve a reviewed job and apply its proposed update transactionally.
    ///
    /// If the apply step fails, the job rolls back to `ready_for_review`
    /// with the error recorded, so the approval can be retried.
    #[instrument(skip_all, fields(job_id = %job_id, reviewer = %reviewer))]
    pub async fn approve_job(
        &self,
        job_id: &JobId,
        reviewer: &str,
        notes: Option<String>,
    ) -> Result<ContentUpdateJob> {
        let mut job = self.get_job(job_id).await?;
        if job.status != ContentUpdateStatus::ReadyForReview {
            return Err(DocforgeError::invalid_state(
                "ready_for_review",
                job.status.as_str(),
            ));
        }

        job.status = ContentUpdateStatus::Approved;
        job.reviewer = Some(reviewer.to_string());
        job.review_notes = notes;
        job.reviewed_at = Some(Utc::now());
        // A retried approval starts clean; any prior apply error is stale.
        job.error_message = None;
        self.storage.update_content_job(&job).await?;

        match self.storage.apply_content_update(&job).await {
            Ok(new_version) => {
                info!(new_version, "content update applied");
                self.get_job(job_id).await
            }
            Err(e) => {
                warn!(error = %e, "apply failed, rolling job back to review");
                job.status = ContentUpdateStatus::ReadyForReview;
                job.error_message = Some(e.to_string());
                self.storage.update_content_job(&job).await?;
                Err(e)
            }
        }
    }

    /// Reject a reviewed job. Terminal.
    #[instrument(skip_all, fields(job_id = %job_id, reviewer = %reviewer))]
    pub async fn reject_job(
        &self,
        job_id: &JobId,
        reviewer: &str,
        notes: Option<String>,
    ) -> Result<ContentUpdateJob> {
        let mut job = self.get_job(job_id).await?;
        if job.status != ContentUpdateStatus::ReadyForReview {
            return Err(DocforgeError::invalid_state(
                "ready_for_review",
                job.status.as_str(),
            ));
        }

        job.status = ContentUpdateStatus::Rejected;
        job.reviewer = Some(reviewer.to_string());
        job.review_notes = notes;
        job.reviewed_at = Some(Utc::now());
        self.storage.update_content_job(&job).await?;
        info!("content update job rejected");
        Ok(job)
    }

    /// Cancel a job from any non-terminal status. Terminal.
    #[instrument(skip_all, fields(job_id = %job_id))]
    pub async fn cancel_job(&self, job_id: &JobId) -> Result<ContentUpdateJob> {
        let mut job = self.get_job(job_id).await?;
        if job.status.is_terminal() {
            return Err(DocforgeError::invalid_state(
                "any non-terminal status",
                job.status.as_str(),
            ));
        }

        job.status = ContentUpdateStatus::Cancelled;
        self.storage.update_content_job(&job).await?;
        info!("content update job cancelled");
        Ok(job)
    }

    /// Create `pending` jobs for stale published items, for the scheduled
    /// sweep. Returns the created jobs, oldest-refresh first.
    #[instrument(skip_all)]
    pub async fn create_sweep_jobs(&self, categories: &[String]) -> Result<Vec<ContentUpdateJob>> {
        let stale = self
            .storage
            .list_stale_items(
                self.config.sweep.stale_after_days,
                categories,
                self.config.sweep.limit,
            )
            .await?;

        let mut jobs = Vec::with_capacity(stale.len());
        for item in &stale {
            let job = ContentUpdateJob::new(item, TriggerKind::Scheduled, "scheduler");
            self.storage.insert_content_job(&job).await?;
            jobs.push(job);
        }

        info!(count = jobs.len(), "sweep jobs created");
        Ok(jobs)
    }

    async fn get_job(&self, job_id: &JobId) -> Result<ContentUpdateJob> {
        self.storage
            .get_content_job(job_id)
            .await?
            .ok_or_else(|| DocforgeError::not_found("content update job", job_id.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
