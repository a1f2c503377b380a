//! libSQL storage layer for the docforge pipeline.
//!
//! The [`Storage`] struct wraps a libSQL database holding content items,
//! the resource catalog, both job tables, persisted relationships, and the
//! append-only content history.
//!
//! **Access rules:**
//! - Pipeline/CLI: read-write (sole writer) via [`Storage::open`]
//! - Reporting/read surfaces: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use docforge_shared::{
    ContentHistoryEntry, ContentItem, ContentUpdateJob, DiscoveredRelationship, DocforgeError,
    EntityKind, JobId, Relationship, RelationshipAnalysisJob, Resource, Result,
};
use libsql::{Connection, Database, TransactionBehavior, params};
use uuid::Uuid;

/// Outcome of an idempotent relationship upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No row existed for the (source, target) pair; one was inserted.
    Created,
    /// An automated row existed and was updated in place.
    Updated,
    /// A manually-overridden row existed; left untouched.
    SkippedManual,
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DocforgeError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    DocforgeError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(DocforgeError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Content item operations
    // -----------------------------------------------------------------------

    /// Insert a new content item.
    pub async fn insert_content_item(&self, item: &ContentItem) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO content_items
                   (id, slug, title, description, content, sources_json, version,
                    content_hash, category, published, last_refreshed_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    item.id.as_str(),
                    item.slug.as_str(),
                    item.title.as_str(),
                    item.description.as_str(),
                    item.content.as_str(),
                    to_json(&item.sources)?,
                    i64::from(item.version),
                    item.content_hash.as_str(),
                    item.category.as_deref(),
                    item.published as i64,
                    item.last_refreshed_at.map(|dt| dt.to_rfc3339()),
                    item.created_at.to_rfc3339(),
                    item.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Get a content item by ID.
    pub async fn get_content_item(&self, id: &str) -> Result<Option<ContentItem>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {CONTENT_ITEM_COLS} FROM content_items WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_content_item(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DocforgeError::Storage(e.to_string())),
        }
    }

    /// List all published content items, ordered by slug.
    pub async fn list_published_items(&self) -> Result<Vec<ContentItem>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {CONTENT_ITEM_COLS} FROM content_items
                     WHERE published = 1 ORDER BY slug"
                ),
                params![],
            )
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_content_item(&row)?);
        }
        Ok(results)
    }

    /// List published items whose `last_refreshed_at` is NULL or older than
    /// `stale_after_days`, optionally restricted to categories, capped at
    /// `limit`. Used by the scheduled-sweep entry point.
    pub async fn list_stale_items(
        &self,
        stale_after_days: u32,
        categories: &[String],
        limit: u32,
    ) -> Result<Vec<ContentItem>> {
        let cutoff = (Utc::now() - chrono::Duration::days(i64::from(stale_after_days))).to_rfc3339();

        let mut sql = format!(
            "SELECT {CONTENT_ITEM_COLS} FROM content_items
             WHERE published = 1
               AND (last_refreshed_at IS NULL OR last_refreshed_at < ?1)"
        );
        if !categories.is_empty() {
            let placeholders: Vec<String> = (0..categories.len())
                .map(|i| format!("?{}", i + 3))
                .collect();
            sql.push_str(&format!(" AND category IN ({})", placeholders.join(", ")));
        }
        sql.push_str(" ORDER BY last_refreshed_at ASC NULLS FIRST LIMIT ?2");

        let mut values: Vec<libsql::Value> = vec![
            libsql::Value::from(cutoff),
            libsql::Value::from(i64::from(limit)),
        ];
        for cat in categories {
            values.push(libsql::Value::from(cat.as_str()));
        }

        let mut rows = self
            .conn
            .query(&sql, values)
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_content_item(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Resource operations
    // -----------------------------------------------------------------------

    /// Insert a new resource.
    pub async fn insert_resource(&self, resource: &Resource) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO resources
                   (id, name, description, url, resource_type, tags_json, active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    resource.id.as_str(),
                    resource.name.as_str(),
                    resource.description.as_str(),
                    resource.url.as_str(),
                    resource.resource_type.as_str(),
                    to_json(&resource.tags)?,
                    resource.active as i64,
                    resource.created_at.to_rfc3339(),
                    resource.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Get a resource by ID.
    pub async fn get_resource(&self, id: &str) -> Result<Option<Resource>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {RESOURCE_COLS} FROM resources WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_resource(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DocforgeError::Storage(e.to_string())),
        }
    }

    /// List all active resources, ordered by name.
    pub async fn list_active_resources(&self) -> Result<Vec<Resource>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {RESOURCE_COLS} FROM resources WHERE active = 1 ORDER BY name"),
                params![],
            )
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_resource(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Content update job operations
    // -----------------------------------------------------------------------

    /// Insert a new content update job.
    pub async fn insert_content_job(&self, job: &ContentUpdateJob) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO content_update_jobs
                   (id, item_id, status, trigger_kind, triggered_by, current_content,
                    scraped_json, scrape_failures_json, proposed_json, summary, confidence,
                    warnings_json, key_changes_json, diff, reviewer, review_notes,
                    error_message, error_details, retry_count, created_at, started_at,
                    scraped_at, analyzed_at, reviewed_at, applied_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)",
                content_job_params(job)?,
            )
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Overwrite all mutable fields of a content update job.
    pub async fn update_content_job(&self, job: &ContentUpdateJob) -> Result<()> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute(
                "UPDATE content_update_jobs SET
                   item_id = ?2, status = ?3, trigger_kind = ?4, triggered_by = ?5,
                   current_content = ?6, scraped_json = ?7, scrape_failures_json = ?8,
                   proposed_json = ?9, summary = ?10, confidence = ?11, warnings_json = ?12,
                   key_changes_json = ?13, diff = ?14, reviewer = ?15, review_notes = ?16,
                   error_message = ?17, error_details = ?18, retry_count = ?19,
                   created_at = ?20, started_at = ?21, scraped_at = ?22, analyzed_at = ?23,
                   reviewed_at = ?24, applied_at = ?25
                 WHERE id = ?1",
                content_job_params(job)?,
            )
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(DocforgeError::not_found("content update job", job.id.to_string()));
        }
        Ok(())
    }

    /// Get a content update job by ID.
    pub async fn get_content_job(&self, id: &JobId) -> Result<Option<ContentUpdateJob>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {CONTENT_JOB_COLS} FROM content_update_jobs WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_content_job(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DocforgeError::Storage(e.to_string())),
        }
    }

    /// List content update jobs, newest first.
    pub async fn list_content_jobs(&self, limit: u32) -> Result<Vec<ContentUpdateJob>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {CONTENT_JOB_COLS} FROM content_update_jobs
                     ORDER BY created_at DESC LIMIT ?1"
                ),
                params![i64::from(limit)],
            )
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_content_job(&row)?);
        }
        Ok(results)
    }

    /// Perform the transactional apply for an approved content update job.
    ///
    /// Within one immediate (write-locking) transaction: snapshot the item's
    /// pre-apply state into `content_history`, overwrite the item with the
    /// job's proposed fields (recomputing the hash, bumping the version),
    /// and mark the job `applied`. Two approved jobs targeting the same item
    /// cannot interleave here. Returns the new item version.
    pub async fn apply_content_update(&self, job: &ContentUpdateJob) -> Result<u32> {
        self.check_writable()?;
        let proposed = job
            .proposed
            .as_ref()
            .ok_or_else(|| DocforgeError::Apply("job has no proposed update".into()))?;

        let txn = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await
            .map_err(|e| DocforgeError::Apply(e.to_string()))?;

        // Re-read the item inside the transaction.
        let mut rows = txn
            .query(
                &format!("SELECT {CONTENT_ITEM_COLS} FROM content_items WHERE id = ?1"),
                params![job.item_id.as_str()],
            )
            .await
            .map_err(|e| DocforgeError::Apply(e.to_string()))?;
        let item = match rows.next().await {
            Ok(Some(row)) => row_to_content_item(&row)?,
            Ok(None) => {
                return Err(DocforgeError::not_found("content item", job.item_id.clone()));
            }
            Err(e) => return Err(DocforgeError::Apply(e.to_string())),
        };
        drop(rows);

        let now = Utc::now();

        // Snapshot the pre-apply state for audit/rollback.
        txn.execute(
            "INSERT INTO content_history
               (id, item_id, version, title, description, content, sources_json,
                content_hash, job_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                Uuid::now_v7().to_string(),
                item.id.as_str(),
                i64::from(item.version),
                item.title.as_str(),
                item.description.as_str(),
                item.content.as_str(),
                to_json(&item.sources)?,
                item.content_hash.as_str(),
                job.id.to_string(),
                now.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| DocforgeError::Apply(e.to_string()))?;

        let new_version = item.version + 1;
        let new_hash = docforge_shared::content_hash_of(&proposed.content);

        txn.execute(
            "UPDATE content_items SET
               title = ?2, description = ?3, content = ?4, sources_json = ?5,
               version = ?6, content_hash = ?7, last_refreshed_at = ?8, updated_at = ?8
             WHERE id = ?1",
            params![
                item.id.as_str(),
                proposed.title.as_str(),
                proposed.description.as_str(),
                proposed.content.as_str(),
                to_json(&proposed.sources)?,
                i64::from(new_version),
                new_hash.as_str(),
                now.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| DocforgeError::Apply(e.to_string()))?;

        txn.execute(
            "UPDATE content_update_jobs SET status = 'applied', applied_at = ?2 WHERE id = ?1",
            params![job.id.to_string(), now.to_rfc3339()],
        )
        .await
        .map_err(|e| DocforgeError::Apply(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| DocforgeError::Apply(e.to_string()))?;

        Ok(new_version)
    }

    /// List history entries for an item, oldest first.
    pub async fn list_history(&self, item_id: &str) -> Result<Vec<ContentHistoryEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, item_id, version, title, description, content, sources_json,
                        content_hash, job_id, created_at
                 FROM content_history WHERE item_id = ?1 ORDER BY version",
                params![item_id],
            )
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(ContentHistoryEntry {
                id: get_str(&row, 0)?,
                item_id: get_str(&row, 1)?,
                version: get_u32(&row, 2)?,
                title: get_str(&row, 3)?,
                description: get_str(&row, 4)?,
                content: get_str(&row, 5)?,
                sources: from_json(&get_str(&row, 6)?)?,
                content_hash: get_str(&row, 7)?,
                job_id: parse_job_id(&get_str(&row, 8)?)?,
                created_at: parse_dt(&get_str(&row, 9)?)?,
            });
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Relationship analysis job operations
    // -----------------------------------------------------------------------

    /// Insert a new relationship analysis job.
    pub async fn insert_analysis_job(&self, job: &RelationshipAnalysisJob) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO relationship_analysis_jobs
                   (id, job_type, target_id, status, relationships_json, warnings_json,
                    created_count, updated_count, skipped_count, tokens_used, cost_estimate,
                    error_message, error_details, created_at, started_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                analysis_job_params(job)?,
            )
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Overwrite all mutable fields of a relationship analysis job.
    pub async fn update_analysis_job(&self, job: &RelationshipAnalysisJob) -> Result<()> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute(
                "UPDATE relationship_analysis_jobs SET
                   job_type = ?2, target_id = ?3, status = ?4, relationships_json = ?5,
                   warnings_json = ?6, created_count = ?7, updated_count = ?8,
                   skipped_count = ?9, tokens_used = ?10, cost_estimate = ?11,
                   error_message = ?12, error_details = ?13, created_at = ?14,
                   started_at = ?15, completed_at = ?16
                 WHERE id = ?1",
                analysis_job_params(job)?,
            )
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(DocforgeError::not_found("analysis job", job.id.to_string()));
        }
        Ok(())
    }

    /// Get a relationship analysis job by ID.
    pub async fn get_analysis_job(&self, id: &JobId) -> Result<Option<RelationshipAnalysisJob>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {ANALYSIS_JOB_COLS} FROM relationship_analysis_jobs WHERE id = ?1"
                ),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_analysis_job(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DocforgeError::Storage(e.to_string())),
        }
    }

    /// List relationship analysis jobs, newest first.
    pub async fn list_analysis_jobs(&self, limit: u32) -> Result<Vec<RelationshipAnalysisJob>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {ANALYSIS_JOB_COLS} FROM relationship_analysis_jobs
                     ORDER BY created_at DESC LIMIT ?1"
                ),
                params![i64::from(limit)],
            )
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_analysis_job(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Relationship upserts
    // -----------------------------------------------------------------------

    /// Idempotently upsert a discovered relationship into the table for its
    /// (source, target) entity pair.
    ///
    /// Insert if absent; update type/confidence/reasoning and bump the
    /// version if present; never touch a manually-overridden row.
    pub async fn upsert_relationship(
        &self,
        rel: &DiscoveredRelationship,
    ) -> Result<UpsertOutcome> {
        self.check_writable()?;

        let (table, key_a, key_b, a, b) = match (rel.source_kind, rel.target_kind) {
            (EntityKind::Doc, EntityKind::Resource) => (
                "doc_resource_relationships",
                "doc_id",
                "resource_id",
                rel.source_id.as_str(),
                rel.target_id.as_str(),
            ),
            // A resource→doc edge lands in the same table keyed doc-first.
            (EntityKind::Resource, EntityKind::Doc) => (
                "doc_resource_relationships",
                "doc_id",
                "resource_id",
                rel.target_id.as_str(),
                rel.source_id.as_str(),
            ),
            (EntityKind::Resource, EntityKind::Resource) => (
                "resource_relationships",
                "source_id",
                "target_id",
                rel.source_id.as_str(),
                rel.target_id.as_str(),
            ),
            (EntityKind::Doc, EntityKind::Doc) => {
                return Err(DocforgeError::validation(
                    "no relationship table exists for doc-to-doc edges",
                ));
            }
        };

        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT id, is_manual, version FROM {table}
                     WHERE {key_a} = ?1 AND {key_b} = ?2"
                ),
                params![a, b],
            )
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;

        let existing = match rows.next().await {
            Ok(Some(row)) => Some((get_str(&row, 0)?, get_i64(&row, 1)? != 0, get_u32(&row, 2)?)),
            Ok(None) => None,
            Err(e) => return Err(DocforgeError::Storage(e.to_string())),
        };
        drop(rows);

        let now = Utc::now().to_rfc3339();

        match existing {
            None => {
                self.conn
                    .execute(
                        &format!(
                            "INSERT INTO {table}
                               (id, {key_a}, {key_b}, relationship_type, confidence, reasoning,
                                shared_tags_json, is_manual, version, created_at, updated_at)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 1, ?8, ?8)"
                        ),
                        params![
                            Uuid::now_v7().to_string(),
                            a,
                            b,
                            rel.relationship_type.as_str(),
                            rel.confidence,
                            rel.reasoning.as_str(),
                            to_json(&rel.shared_tags)?,
                            now.as_str(),
                        ],
                    )
                    .await
                    .map_err(|e| DocforgeError::Storage(e.to_string()))?;
                Ok(UpsertOutcome::Created)
            }
            Some((_, true, _)) => Ok(UpsertOutcome::SkippedManual),
            Some((id, false, version)) => {
                self.conn
                    .execute(
                        &format!(
                            "UPDATE {table} SET
                               relationship_type = ?2, confidence = ?3, reasoning = ?4,
                               shared_tags_json = ?5, version = ?6, updated_at = ?7
                             WHERE id = ?1"
                        ),
                        params![
                            id.as_str(),
                            rel.relationship_type.as_str(),
                            rel.confidence,
                            rel.reasoning.as_str(),
                            to_json(&rel.shared_tags)?,
                            i64::from(version + 1),
                            now.as_str(),
                        ],
                    )
                    .await
                    .map_err(|e| DocforgeError::Storage(e.to_string()))?;
                Ok(UpsertOutcome::Updated)
            }
        }
    }

    /// Get a persisted doc↔resource relationship by its key pair.
    pub async fn get_doc_resource_relationship(
        &self,
        doc_id: &str,
        resource_id: &str,
    ) -> Result<Option<Relationship>> {
        self.get_relationship_row(
            "doc_resource_relationships",
            "doc_id",
            "resource_id",
            doc_id,
            resource_id,
            EntityKind::Doc,
            EntityKind::Resource,
        )
        .await
    }

    /// Get a persisted resource↔resource relationship by its key pair.
    pub async fn get_resource_relationship(
        &self,
        source_id: &str,
        target_id: &str,
    ) -> Result<Option<Relationship>> {
        self.get_relationship_row(
            "resource_relationships",
            "source_id",
            "target_id",
            source_id,
            target_id,
            EntityKind::Resource,
            EntityKind::Resource,
        )
        .await
    }

    /// Flag a relationship as manually overridden, shielding it from
    /// automated apply.
    pub async fn mark_relationship_manual(
        &self,
        source_kind: EntityKind,
        source_id: &str,
        target_id: &str,
    ) -> Result<()> {
        self.check_writable()?;
        let (table, key_a, key_b) = match source_kind {
            EntityKind::Doc => ("doc_resource_relationships", "doc_id", "resource_id"),
            EntityKind::Resource => ("resource_relationships", "source_id", "target_id"),
        };
        let affected = self
            .conn
            .execute(
                &format!(
                    "UPDATE {table} SET is_manual = 1, updated_at = ?3
                     WHERE {key_a} = ?1 AND {key_b} = ?2"
                ),
                params![source_id, target_id, Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;
        if affected == 0 {
            return Err(DocforgeError::not_found(
                "relationship",
                format!("{source_id} -> {target_id}"),
            ));
        }
        Ok(())
    }

    async fn get_relationship_row(
        &self,
        table: &str,
        key_a: &str,
        key_b: &str,
        a: &str,
        b: &str,
        source_kind: EntityKind,
        target_kind: EntityKind,
    ) -> Result<Option<Relationship>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT id, {key_a}, {key_b}, relationship_type, confidence, reasoning,
                            shared_tags_json, is_manual, version, created_at, updated_at
                     FROM {table} WHERE {key_a} = ?1 AND {key_b} = ?2"
                ),
                params![a, b],
            )
            .await
            .map_err(|e| DocforgeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(Relationship {
                id: get_str(&row, 0)?,
                source_kind,
                source_id: get_str(&row, 1)?,
                target_kind,
                target_id: get_str(&row, 2)?,
                relationship_type: get_str(&row, 3)?.parse()?,
                confidence: get_f64(&row, 4)?,
                reasoning: get_str(&row, 5)?,
                shared_tags: from_json(&get_str(&row, 6)?)?,
                is_manual: get_i64(&row, 7)? != 0,
                version: get_u32(&row, 8)?,
                created_at: parse_dt(&get_str(&row, 9)?)?,
                updated_at: parse_dt(&get_str(&row, 10)?)?,
            })),
            Ok(None) => Ok(None),
            Err(e) => Err(DocforgeError::Storage(e.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Row/param mapping helpers
// ---------------------------------------------------------------------------

const CONTENT_ITEM_COLS: &str = "id, slug, title, description, content, sources_json, version, \
     content_hash, category, published, last_refreshed_at, created_at, updated_at";

const RESOURCE_COLS: &str =
    "id, name, description, url, resource_type, tags_json, active, created_at, updated_at";

const CONTENT_JOB_COLS: &str = "id, item_id, status, trigger_kind, triggered_by, current_content, \
     scraped_json, scrape_failures_json, proposed_json, summary, confidence, warnings_json, \
     key_changes_json, diff, reviewer, review_notes, error_message, error_details, retry_count, \
     created_at, started_at, scraped_at, analyzed_at, reviewed_at, applied_at";

const ANALYSIS_JOB_COLS: &str = "id, job_type, target_id, status, relationships_json, \
     warnings_json, created_count, updated_count, skipped_count, tokens_used, cost_estimate, \
     error_message, error_details, created_at, started_at, completed_at";

fn get_str(row: &libsql::Row, idx: i32) -> Result<String> {
    row.get::<String>(idx)
        .map_err(|e| DocforgeError::Storage(e.to_string()))
}

fn get_opt_str(row: &libsql::Row, idx: i32) -> Option<String> {
    row.get::<String>(idx).ok()
}

fn get_i64(row: &libsql::Row, idx: i32) -> Result<i64> {
    row.get::<i64>(idx)
        .map_err(|e| DocforgeError::Storage(e.to_string()))
}

fn get_u32(row: &libsql::Row, idx: i32) -> Result<u32> {
    Ok(get_i64(row, idx)? as u32)
}

fn get_f64(row: &libsql::Row, idx: i32) -> Result<f64> {
    row.get::<f64>(idx)
        .map_err(|e| DocforgeError::Storage(e.to_string()))
}

fn parse_dt(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DocforgeError::Storage(format!("invalid date: {e}")))
}

fn parse_opt_dt(row: &libsql::Row, idx: i32) -> Result<Option<DateTime<Utc>>> {
    match get_opt_str(row, idx) {
        Some(s) => Ok(Some(parse_dt(&s)?)),
        None => Ok(None),
    }
}

fn parse_job_id(s: &str) -> Result<JobId> {
    s.parse::<JobId>()
        .map_err(|e| DocforgeError::Storage(format!("invalid job id: {e}")))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| DocforgeError::Storage(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| DocforgeError::Storage(e.to_string()))
}

/// Convert a database row to a [`ContentItem`].
fn row_to_content_item(row: &libsql::Row) -> Result<ContentItem> {
    Ok(ContentItem {
        id: get_str(row, 0)?,
        slug: get_str(row, 1)?,
        title: get_str(row, 2)?,
        description: get_str(row, 3)?,
        content: get_str(row, 4)?,
        sources: from_json(&get_str(row, 5)?)?,
        version: get_u32(row, 6)?,
        content_hash: get_str(row, 7)?,
        category: get_opt_str(row, 8),
        published: get_i64(row, 9)? != 0,
        last_refreshed_at: parse_opt_dt(row, 10)?,
        created_at: parse_dt(&get_str(row, 11)?)?,
        updated_at: parse_dt(&get_str(row, 12)?)?,
    })
}

/// Convert a database row to a [`Resource`].
fn row_to_resource(row: &libsql::Row) -> Result<Resource> {
    Ok(Resource {
        id: get_str(row, 0)?,
        name: get_str(row, 1)?,
        description: get_str(row, 2)?,
        url: get_str(row, 3)?,
        resource_type: get_str(row, 4)?,
        tags: from_json(&get_str(row, 5)?)?,
        active: get_i64(row, 6)? != 0,
        created_at: parse_dt(&get_str(row, 7)?)?,
        updated_at: parse_dt(&get_str(row, 8)?)?,
    })
}

/// Convert a database row to a [`ContentUpdateJob`].
fn row_to_content_job(row: &libsql::Row) -> Result<ContentUpdateJob> {
    Ok(ContentUpdateJob {
        id: parse_job_id(&get_str(row, 0)?)?,
        item_id: get_str(row, 1)?,
        status: get_str(row, 2)?.parse()?,
        trigger: get_str(row, 3)?.parse()?,
        triggered_by: get_str(row, 4)?,
        current_content: get_str(row, 5)?,
        scraped: from_json(&get_str(row, 6)?)?,
        scrape_failures: from_json(&get_str(row, 7)?)?,
        proposed: match get_opt_str(row, 8) {
            Some(json) => Some(from_json(&json)?),
            None => None,
        },
        summary: get_opt_str(row, 9),
        confidence: row.get::<f64>(10).ok(),
        warnings: from_json(&get_str(row, 11)?)?,
        key_changes: from_json(&get_str(row, 12)?)?,
        diff: get_opt_str(row, 13),
        reviewer: get_opt_str(row, 14),
        review_notes: get_opt_str(row, 15),
        error_message: get_opt_str(row, 16),
        error_details: get_opt_str(row, 17),
        retry_count: get_u32(row, 18)?,
        created_at: parse_dt(&get_str(row, 19)?)?,
        started_at: parse_opt_dt(row, 20)?,
        scraped_at: parse_opt_dt(row, 21)?,
        analyzed_at: parse_opt_dt(row, 22)?,
        reviewed_at: parse_opt_dt(row, 23)?,
        applied_at: parse_opt_dt(row, 24)?,
    })
}

/// Convert a database row to a [`RelationshipAnalysisJob`].
fn row_to_analysis_job(row: &libsql::Row) -> Result<RelationshipAnalysisJob> {
    Ok(RelationshipAnalysisJob {
        id: parse_job_id(&get_str(row, 0)?)?,
        job_type: get_str(row, 1)?.parse()?,
        target_id: get_opt_str(row, 2),
        status: get_str(row, 3)?.parse()?,
        relationships: from_json(&get_str(row, 4)?)?,
        warnings: from_json(&get_str(row, 5)?)?,
        created_count: get_u32(row, 6)?,
        updated_count: get_u32(row, 7)?,
        skipped_count: get_u32(row, 8)?,
        tokens_used: get_i64(row, 9)? as u64,
        cost_estimate: get_f64(row, 10)?,
        error_message: get_opt_str(row, 11),
        error_details: get_opt_str(row, 12),
        created_at: parse_dt(&get_str(row, 13)?)?,
        started_at: parse_opt_dt(row, 14)?,
        completed_at: parse_opt_dt(row, 15)?,
    })
}

/// Positional params shared by content-job insert and update.
fn content_job_params(job: &ContentUpdateJob) -> Result<Vec<libsql::Value>> {
    Ok(vec![
        libsql::Value::from(job.id.to_string()),
        libsql::Value::from(job.item_id.as_str()),
        libsql::Value::from(job.status.as_str()),
        libsql::Value::from(job.trigger.as_str()),
        libsql::Value::from(job.triggered_by.as_str()),
        libsql::Value::from(job.current_content.as_str()),
        libsql::Value::from(to_json(&job.scraped)?),
        libsql::Value::from(to_json(&job.scrape_failures)?),
        opt_value(job.proposed.as_ref().map(to_json).transpose()?),
        opt_value(job.summary.clone()),
        match job.confidence {
            Some(c) => libsql::Value::from(c),
            None => libsql::Value::Null,
        },
        libsql::Value::from(to_json(&job.warnings)?),
        libsql::Value::from(to_json(&job.key_changes)?),
        opt_value(job.diff.clone()),
        opt_value(job.reviewer.clone()),
        opt_value(job.review_notes.clone()),
        opt_value(job.error_message.clone()),
        opt_value(job.error_details.clone()),
        libsql::Value::from(i64::from(job.retry_count)),
        libsql::Value::from(job.created_at.to_rfc3339()),
        opt_value(job.started_at.map(|dt| dt.to_rfc3339())),
        opt_value(job.scraped_at.map(|dt| dt.to_rfc3339())),
        opt_value(job.analyzed_at.map(|dt| dt.to_rfc3339())),
        opt_value(job.reviewed_at.map(|dt| dt.to_rfc3339())),
        opt_value(job.applied_at.map(|dt| dt.to_rfc3339())),
    ])
}

/// Positional params shared by analysis-job insert and update.
fn analysis_job_params(job: &RelationshipAnalysisJob) -> Result<Vec<libsql::Value>> {
    Ok(vec![
        libsql::Value::from(job.id.to_string()),
        libsql::Value::from(job.job_type.as_str()),
        opt_value(job.target_id.clone()),
        libsql::Value::from(job.status.as_str()),
        libsql::Value::from(to_json(&job.relationships)?),
        libsql::Value::from(to_json(&job.warnings)?),
        libsql::Value::from(i64::from(job.created_count)),
        libsql::Value::from(i64::from(job.updated_count)),
        libsql::Value::from(i64::from(job.skipped_count)),
        libsql::Value::from(job.tokens_used as i64),
        libsql::Value::from(job.cost_estimate),
        opt_value(job.error_message.clone()),
        opt_value(job.error_details.clone()),
        libsql::Value::from(job.created_at.to_rfc3339()),
        opt_value(job.started_at.map(|dt| dt.to_rfc3339())),
        opt_value(job.completed_at.map(|dt| dt.to_rfc3339())),
    ])
}

fn opt_value(opt: Option<String>) -> libsql::Value {
    match opt {
        Some(s) => libsql::Value::from(s),
        None => libsql::Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docforge_shared::{
        AnalysisJobType, ContentUpdateStatus, ProposedUpdate, RelationKind, SourceRef, TriggerKind,
        content_hash_of,
    };

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("df_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn make_item(slug: &str) -> ContentItem {
        let content = format!("# {slug}\n\nBody text for {slug}.");
        ContentItem {
            id: Uuid::now_v7().to_string(),
            slug: slug.into(),
            title: slug.into(),
            description: format!("About {slug}"),
            content: content.clone(),
            sources: vec![SourceRef {
                title: "Upstream".into(),
                url: format!("https://example.com/{slug}"),
            }],
            version: 1,
            content_hash: content_hash_of(&content),
            category: Some("guides".into()),
            published: true,
            last_refreshed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn make_resource(name: &str) -> Resource {
        Resource {
            id: Uuid::now_v7().to_string(),
            name: name.into(),
            description: format!("{name} description"),
            url: format!("https://example.com/{name}"),
            resource_type: "library".into(),
            tags: vec!["rust".into()],
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        let version = storage.get_schema_version().await;
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("df_test_{}.db", Uuid::now_v7()));
        let s1 = Storage::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn content_item_roundtrip() {
        let storage = test_storage().await;
        let item = make_item("intro");
        storage.insert_content_item(&item).await.expect("insert");

        let found = storage
            .get_content_item(&item.id)
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(found.slug, "intro");
        assert_eq!(found.sources.len(), 1);
        assert_eq!(found.version, 1);
        assert!(found.published);

        assert!(
            storage
                .get_content_item("no-such-id")
                .await
                .expect("get missing")
                .is_none()
        );
    }

    #[tokio::test]
    async fn stale_item_selection() {
        let storage = test_storage().await;

        let never_refreshed = make_item("never");
        storage.insert_content_item(&never_refreshed).await.unwrap();

        let mut fresh = make_item("fresh");
        fresh.last_refreshed_at = Some(Utc::now());
        storage.insert_content_item(&fresh).await.unwrap();

        let mut old = make_item("old");
        old.last_refreshed_at = Some(Utc::now() - chrono::Duration::days(90));
        storage.insert_content_item(&old).await.unwrap();

        let mut unpublished = make_item("draft");
        unpublished.published = false;
        storage.insert_content_item(&unpublished).await.unwrap();

        let stale = storage
            .list_stale_items(30, &[], 10)
            .await
            .expect("list stale");
        let slugs: Vec<&str> = stale.iter().map(|i| i.slug.as_str()).collect();
        assert!(slugs.contains(&"never"));
        assert!(slugs.contains(&"old"));
        assert!(!slugs.contains(&"fresh"));
        assert!(!slugs.contains(&"draft"));

        // Category filter and limit.
        let stale = storage
            .list_stale_items(30, &["other".into()], 10)
            .await
            .unwrap();
        assert!(stale.is_empty());

        let stale = storage
            .list_stale_items(30, &["guides".into()], 1)
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
    }

    #[tokio::test]
    async fn resource_roundtrip() {
        let storage = test_storage().await;
        let active = make_resource("tokio");
        let mut inactive = make_resource("defunct");
        inactive.active = false;

        storage.insert_resource(&active).await.unwrap();
        storage.insert_resource(&inactive).await.unwrap();

        let found = storage
            .get_resource(&active.id)
            .await
            .unwrap()
            .expect("exists");
        assert_eq!(found.name, "tokio");
        assert_eq!(found.tags, vec!["rust".to_string()]);

        let actives = storage.list_active_resources().await.unwrap();
        assert_eq!(actives.len(), 1);
        assert_eq!(actives[0].name, "tokio");
    }

    #[tokio::test]
    async fn content_job_roundtrip() {
        let storage = test_storage().await;
        let item = make_item("intro");
        storage.insert_content_item(&item).await.unwrap();

        let mut job = ContentUpdateJob::new(&item, TriggerKind::Manual, "alice");
        storage.insert_content_job(&job).await.expect("insert job");

        let found = storage
            .get_content_job(&job.id)
            .await
            .unwrap()
            .expect("exists");
        assert_eq!(found.status, ContentUpdateStatus::Pending);
        assert_eq!(found.trigger, TriggerKind::Manual);
        assert_eq!(found.triggered_by, "alice");

        job.status = ContentUpdateStatus::Scraping;
        job.started_at = Some(Utc::now());
        job.retry_count = 1;
        storage.update_content_job(&job).await.expect("update job");

        let found = storage.get_content_job(&job.id).await.unwrap().unwrap();
        assert_eq!(found.status, ContentUpdateStatus::Scraping);
        assert_eq!(found.retry_count, 1);
        assert!(found.started_at.is_some());

        let listed = storage.list_content_jobs(10).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn update_missing_job_is_not_found() {
        let storage = test_storage().await;
        let item = make_item("intro");
        let job = ContentUpdateJob::new(&item, TriggerKind::Manual, "alice");
        let result = storage.update_content_job(&job).await;
        assert!(matches!(result, Err(DocforgeError::NotFound { .. })));
    }

    #[tokio::test]
    async fn apply_overwrites_item_and_appends_history() {
        let storage = test_storage().await;
        let item = make_item("intro");
        storage.insert_content_item(&item).await.unwrap();

        let mut job = ContentUpdateJob::new(&item, TriggerKind::Manual, "alice");
        job.proposed = Some(ProposedUpdate {
            title: "Intro, revised".into(),
            description: "Updated description".into(),
            content: "# Intro\n\nRewritten body.".into(),
            sources: item.sources.clone(),
        });
        storage.insert_content_job(&job).await.unwrap();

        let new_version = storage.apply_content_update(&job).await.expect("apply");
        assert_eq!(new_version, 2);

        let updated = storage.get_content_item(&item.id).await.unwrap().unwrap();
        assert_eq!(updated.title, "Intro, revised");
        assert_eq!(updated.version, 2);
        assert_eq!(
            updated.content_hash,
            content_hash_of("# Intro\n\nRewritten body.")
        );
        assert!(updated.last_refreshed_at.is_some());

        // Exactly one history row, holding the pre-apply snapshot.
        let history = storage.list_history(&item.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].version, 1);
        assert_eq!(history[0].content, item.content);
        assert_eq!(history[0].job_id, job.id);

        // Job marked applied inside the same transaction.
        let stored_job = storage.get_content_job(&job.id).await.unwrap().unwrap();
        assert_eq!(stored_job.status, ContentUpdateStatus::Applied);
        assert!(stored_job.applied_at.is_some());
    }

    #[tokio::test]
    async fn apply_without_proposed_fails() {
        let storage = test_storage().await;
        let item = make_item("intro");
        storage.insert_content_item(&item).await.unwrap();
        let job = ContentUpdateJob::new(&item, TriggerKind::Manual, "alice");
        storage.insert_content_job(&job).await.unwrap();

        let result = storage.apply_content_update(&job).await;
        assert!(matches!(result, Err(DocforgeError::Apply(_))));
    }

    #[tokio::test]
    async fn analysis_job_roundtrip() {
        let storage = test_storage().await;
        let mut job =
            RelationshipAnalysisJob::new(AnalysisJobType::DocToResources, Some("doc-1".into()));
        storage.insert_analysis_job(&job).await.expect("insert");

        let found = storage
            .get_analysis_job(&job.id)
            .await
            .unwrap()
            .expect("exists");
        assert_eq!(found.job_type, AnalysisJobType::DocToResources);
        assert_eq!(found.target_id.as_deref(), Some("doc-1"));

        job.status = docforge_shared::AnalysisStatus::Completed;
        job.tokens_used = 1234;
        job.cost_estimate = 0.0025;
        job.relationships.push(DiscoveredRelationship {
            source_kind: EntityKind::Doc,
            source_id: "doc-1".into(),
            target_kind: EntityKind::Resource,
            target_id: "res-1".into(),
            relationship_type: RelationKind::References,
            confidence: 0.9,
            reasoning: "cited directly".into(),
            shared_tags: vec![],
        });
        storage.update_analysis_job(&job).await.expect("update");

        let found = storage.get_analysis_job(&job.id).await.unwrap().unwrap();
        assert_eq!(found.tokens_used, 1234);
        assert_eq!(found.relationships.len(), 1);
        assert_eq!(
            found.relationships[0].relationship_type,
            RelationKind::References
        );
    }

    #[tokio::test]
    async fn relationship_upsert_is_idempotent() {
        let storage = test_storage().await;
        let item = make_item("intro");
        let resource = make_resource("tokio");
        storage.insert_content_item(&item).await.unwrap();
        storage.insert_resource(&resource).await.unwrap();

        let rel = DiscoveredRelationship {
            source_kind: EntityKind::Doc,
            source_id: item.id.clone(),
            target_kind: EntityKind::Resource,
            target_id: resource.id.clone(),
            relationship_type: RelationKind::References,
            confidence: 0.8,
            reasoning: "first pass".into(),
            shared_tags: vec![],
        };

        let outcome = storage.upsert_relationship(&rel).await.expect("first");
        assert_eq!(outcome, UpsertOutcome::Created);

        let second = DiscoveredRelationship {
            confidence: 0.95,
            reasoning: "second pass".into(),
            relationship_type: RelationKind::DeepDive,
            ..rel.clone()
        };
        let outcome = storage.upsert_relationship(&second).await.expect("second");
        assert_eq!(outcome, UpsertOutcome::Updated);

        let stored = storage
            .get_doc_resource_relationship(&item.id, &resource.id)
            .await
            .unwrap()
            .expect("exists");
        assert_eq!(stored.confidence, 0.95);
        assert_eq!(stored.relationship_type, RelationKind::DeepDive);
        assert_eq!(stored.version, 2);
        assert!(!stored.is_manual);
    }

    #[tokio::test]
    async fn resource_to_doc_edge_lands_doc_first() {
        let storage = test_storage().await;
        let item = make_item("intro");
        let resource = make_resource("tokio");
        storage.insert_content_item(&item).await.unwrap();
        storage.insert_resource(&resource).await.unwrap();

        let rel = DiscoveredRelationship {
            source_kind: EntityKind::Resource,
            source_id: resource.id.clone(),
            target_kind: EntityKind::Doc,
            target_id: item.id.clone(),
            relationship_type: RelationKind::Tutorial,
            confidence: 0.7,
            reasoning: "walks through the doc topic".into(),
            shared_tags: vec![],
        };
        storage.upsert_relationship(&rel).await.expect("upsert");

        // Stored keyed (doc, resource) regardless of analysis direction.
        let stored = storage
            .get_doc_resource_relationship(&item.id, &resource.id)
            .await
            .unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn manual_relationship_is_never_overwritten() {
        let storage = test_storage().await;
        let a = make_resource("tokio");
        let b = make_resource("async-std");
        storage.insert_resource(&a).await.unwrap();
        storage.insert_resource(&b).await.unwrap();

        let rel = DiscoveredRelationship {
            source_kind: EntityKind::Resource,
            source_id: a.id.clone(),
            target_kind: EntityKind::Resource,
            target_id: b.id.clone(),
            relationship_type: RelationKind::Alternative,
            confidence: 0.85,
            reasoning: "same niche".into(),
            shared_tags: vec!["async".into()],
        };
        storage.upsert_relationship(&rel).await.unwrap();
        storage
            .mark_relationship_manual(EntityKind::Resource, &a.id, &b.id)
            .await
            .unwrap();

        let outcome = storage
            .upsert_relationship(&DiscoveredRelationship {
                confidence: 0.2,
                ..rel.clone()
            })
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::SkippedManual);

        let stored = storage
            .get_resource_relationship(&a.id, &b.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.confidence, 0.85);
        assert!(stored.is_manual);
    }

    #[tokio::test]
    async fn doc_to_doc_edge_is_rejected() {
        let storage = test_storage().await;
        let rel = DiscoveredRelationship {
            source_kind: EntityKind::Doc,
            source_id: "d1".into(),
            target_kind: EntityKind::Doc,
            target_id: "d2".into(),
            relationship_type: RelationKind::References,
            confidence: 0.9,
            reasoning: "n/a".into(),
            shared_tags: vec![],
        };
        let result = storage.upsert_relationship(&rel).await;
        assert!(matches!(result, Err(DocforgeError::Validation { .. })));
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("df_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.insert_content_item(&make_item("intro")).await.unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        let result = ro.insert_content_item(&make_item("other")).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }
}
