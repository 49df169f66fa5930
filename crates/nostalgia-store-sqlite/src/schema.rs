//! SQL schema for the Nostalgia SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS categories (
    category_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    slug        TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS information_items (
    item_id               TEXT PRIMARY KEY,
    title                 TEXT NOT NULL,
    description           TEXT NOT NULL,
    year                  INTEGER NOT NULL,
    is_outdated           INTEGER NOT NULL DEFAULT 0,
    current_status        TEXT NOT NULL DEFAULT '',
    change_description    TEXT NOT NULL DEFAULT '',
    relevance_explanation TEXT NOT NULL DEFAULT '',
    source_url            TEXT,
    submitted_by          TEXT,
    created_at            TEXT NOT NULL,
    updated_at            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS information_item_categories (
    item_id     TEXT NOT NULL REFERENCES information_items(item_id) ON DELETE CASCADE,
    category_id TEXT NOT NULL REFERENCES categories(category_id),
    PRIMARY KEY (item_id, category_id)
);

CREATE TABLE IF NOT EXISTS significant_events (
    event_id    TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    year        INTEGER NOT NULL,
    impact      TEXT NOT NULL,
    source_url  TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (year, title)
);

CREATE TABLE IF NOT EXISTS books (
    book_id     TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    author      TEXT NOT NULL,
    description TEXT NOT NULL,
    year        INTEGER NOT NULL,
    relevance   TEXT NOT NULL,
    isbn        TEXT,
    cover_url   TEXT,
    source_url  TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (title, author, year)
);

CREATE TABLE IF NOT EXISTS book_categories (
    book_id     TEXT NOT NULL REFERENCES books(book_id) ON DELETE CASCADE,
    category_id TEXT NOT NULL REFERENCES categories(category_id),
    PRIMARY KEY (book_id, category_id)
);

CREATE TABLE IF NOT EXISTS api_facts (
    fact_id     TEXT PRIMARY KEY,
    year        INTEGER NOT NULL,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    source_url  TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (year, title)
);

CREATE TABLE IF NOT EXISTS api_fact_categories (
    fact_id     TEXT NOT NULL REFERENCES api_facts(fact_id) ON DELETE CASCADE,
    category_id TEXT NOT NULL REFERENCES categories(category_id),
    PRIMARY KEY (fact_id, category_id)
);

-- Reviewer and review time are written together by a single conditional
-- UPDATE; the CHECK keeps them paired even under manual edits.
CREATE TABLE IF NOT EXISTS submissions (
    submission_id TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL,
    year          INTEGER NOT NULL,
    title         TEXT NOT NULL,
    description   TEXT NOT NULL,
    source_url    TEXT NOT NULL,
    status        TEXT NOT NULL DEFAULT 'under_review',
                  -- 'under_review' | 'approved' | 'denied' | 'undetermined'
    review_notes  TEXT,
    reviewed_by   TEXT,
    reviewed_at   TEXT,
    notification  TEXT,            -- JSON-encoded NotificationContact or NULL
    submitted_at  TEXT NOT NULL,
    CHECK ((reviewed_by IS NULL) = (reviewed_at IS NULL))
);

CREATE TABLE IF NOT EXISTS submission_categories (
    submission_id TEXT NOT NULL REFERENCES submissions(submission_id) ON DELETE CASCADE,
    category_id   TEXT NOT NULL REFERENCES categories(category_id),
    PRIMARY KEY (submission_id, category_id)
);

-- Shared key-value store: staleness cache entries and rate-limit counters.
CREATE TABLE IF NOT EXISTS kv (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS refresh_jobs (
    job_id       TEXT PRIMARY KEY,
    year         INTEGER NOT NULL,
    category     TEXT,
    status       TEXT NOT NULL,   -- 'pending' | 'running' | 'done' | 'abandoned'
    attempts     INTEGER NOT NULL DEFAULT 0,
    available_at TEXT NOT NULL,
    last_error   TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS items_year_idx        ON information_items(year);
CREATE INDEX IF NOT EXISTS events_year_idx       ON significant_events(year);
CREATE INDEX IF NOT EXISTS books_year_idx        ON books(year);
CREATE INDEX IF NOT EXISTS api_facts_year_idx    ON api_facts(year);
CREATE INDEX IF NOT EXISTS submissions_status_idx ON submissions(status, year);
CREATE INDEX IF NOT EXISTS jobs_due_idx          ON refresh_jobs(status, available_at);

PRAGMA user_version = 1;
";
