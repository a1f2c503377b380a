//! SQL migration definitions for the docforge database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed within a transaction.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: content items, resources, jobs, relationships, history",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Documentation units with source citations
CREATE TABLE IF NOT EXISTS content_items (
    id                TEXT PRIMARY KEY,
    slug              TEXT NOT NULL UNIQUE,
    title             TEXT NOT NULL,
    description       TEXT NOT NULL,
    content           TEXT NOT NULL,
    sources_json      TEXT NOT NULL DEFAULT '[]',
    version           INTEGER NOT NULL DEFAULT 1,
    content_hash      TEXT NOT NULL,
    category          TEXT,
    published         INTEGER NOT NULL DEFAULT 0,
    last_refreshed_at TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_content_items_published ON content_items(published);
CREATE INDEX IF NOT EXISTS idx_content_items_refreshed ON content_items(last_refreshed_at);

-- External resource catalog
CREATE TABLE IF NOT EXISTS resources (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    description   TEXT NOT NULL,
    url           TEXT NOT NULL,
    resource_type TEXT NOT NULL,
    tags_json     TEXT NOT NULL DEFAULT '[]',
    active        INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_resources_active ON resources(active);

-- Append-only content snapshots, one per applied update job
CREATE TABLE IF NOT EXISTS content_history (
    id           TEXT PRIMARY KEY,
    item_id      TEXT NOT NULL REFERENCES content_items(id) ON DELETE CASCADE,
    version      INTEGER NOT NULL,
    title        TEXT NOT NULL,
    description  TEXT NOT NULL,
    content      TEXT NOT NULL,
    sources_json TEXT NOT NULL DEFAULT '[]',
    content_hash TEXT NOT NULL,
    job_id       TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    UNIQUE(item_id, version)
);

CREATE INDEX IF NOT EXISTS idx_content_history_item ON content_history(item_id);

-- Content update jobs (scrape -> rewrite -> review -> apply)
CREATE TABLE IF NOT EXISTS content_update_jobs (
    id                   TEXT PRIMARY KEY,
    item_id              TEXT NOT NULL REFERENCES content_items(id) ON DELETE CASCADE,
    status               TEXT NOT NULL,
    trigger_kind         TEXT NOT NULL,
    triggered_by         TEXT NOT NULL,
    current_content      TEXT NOT NULL,
    scraped_json         TEXT NOT NULL DEFAULT '[]',
    scrape_failures_json TEXT NOT NULL DEFAULT '[]',
    proposed_json        TEXT,
    summary              TEXT,
    confidence           REAL,
    warnings_json        TEXT NOT NULL DEFAULT '[]',
    key_changes_json     TEXT NOT NULL DEFAULT '[]',
    diff                 TEXT,
    reviewer             TEXT,
    review_notes         TEXT,
    error_message        TEXT,
    error_details        TEXT,
    retry_count          INTEGER NOT NULL DEFAULT 0,
    created_at           TEXT NOT NULL,
    started_at           TEXT,
    scraped_at           TEXT,
    analyzed_at          TEXT,
    reviewed_at          TEXT,
    applied_at           TEXT
);

CREATE INDEX IF NOT EXISTS idx_content_jobs_item ON content_update_jobs(item_id);
CREATE INDEX IF NOT EXISTS idx_content_jobs_status ON content_update_jobs(status);

-- Relationship discovery jobs
CREATE TABLE IF NOT EXISTS relationship_analysis_jobs (
    id                 TEXT PRIMARY KEY,
    job_type           TEXT NOT NULL,
    target_id          TEXT,
    status             TEXT NOT NULL,
    relationships_json TEXT NOT NULL DEFAULT '[]',
    warnings_json      TEXT NOT NULL DEFAULT '[]',
    created_count      INTEGER NOT NULL DEFAULT 0,
    updated_count      INTEGER NOT NULL DEFAULT 0,
    skipped_count      INTEGER NOT NULL DEFAULT 0,
    tokens_used        INTEGER NOT NULL DEFAULT 0,
    cost_estimate      REAL NOT NULL DEFAULT 0,
    error_message      TEXT,
    error_details      TEXT,
    created_at         TEXT NOT NULL,
    started_at         TEXT,
    completed_at       TEXT
);

CREATE INDEX IF NOT EXISTS idx_analysis_jobs_status ON relationship_analysis_jobs(status);

-- Persisted doc <-> resource edges, keyed by the pair
CREATE TABLE IF NOT EXISTS doc_resource_relationships (
    id                TEXT PRIMARY KEY,
    doc_id            TEXT NOT NULL REFERENCES content_items(id) ON DELETE CASCADE,
    resource_id       TEXT NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
    relationship_type TEXT NOT NULL,
    confidence        REAL NOT NULL,
    reasoning         TEXT NOT NULL,
    shared_tags_json  TEXT NOT NULL DEFAULT '[]',
    is_manual         INTEGER NOT NULL DEFAULT 0,
    version           INTEGER NOT NULL DEFAULT 1,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    UNIQUE(doc_id, resource_id)
);

-- Persisted resource <-> resource edges, keyed by the pair
CREATE TABLE IF NOT EXISTS resource_relationships (
    id                TEXT PRIMARY KEY,
    source_id         TEXT NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
    target_id         TEXT NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
    relationship_type TEXT NOT NULL,
    confidence        REAL NOT NULL,
    reasoning         TEXT NOT NULL,
    shared_tags_json  TEXT NOT NULL DEFAULT '[]',
    is_manual         INTEGER NOT NULL DEFAULT 0,
    version           INTEGER NOT NULL DEFAULT 1,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    UNIQUE(source_id, target_id)
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
