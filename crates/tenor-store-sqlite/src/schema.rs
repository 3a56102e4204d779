//! SQL schema for the tenor SQLite store.
//!
//! Executed once at connection startup. Foreign keys cascade from partitions
//! to everything that references them.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS partitions (
    partition_id INTEGER PRIMARY KEY,
    name         TEXT NOT NULL UNIQUE CHECK (length(name) > 0),
    code         TEXT,
    app_id       TEXT,
    app_name     TEXT
);

CREATE TABLE IF NOT EXISTS reviews (
    partition_id     INTEGER NOT NULL
                     REFERENCES partitions(partition_id) ON DELETE CASCADE,
    review_id        TEXT NOT NULL,
    content          TEXT NOT NULL CHECK (length(content) > 0),
    rating           INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
    review_date      TEXT NOT NULL,   -- %Y-%m-%d
    engagement       INTEGER CHECK (engagement >= 0),
    author           TEXT,
    source           TEXT NOT NULL,
    sentiment_label  TEXT NOT NULL
                     CHECK (sentiment_label IN ('positive', 'neutral', 'negative')),
    sentiment_score  REAL NOT NULL CHECK (sentiment_score BETWEEN 0.0 AND 1.0),
    sentiment_source TEXT NOT NULL,
    PRIMARY KEY (partition_id, review_id)
);

CREATE TABLE IF NOT EXISTS review_themes (
    partition_id INTEGER NOT NULL,
    review_id    TEXT NOT NULL,
    theme        TEXT NOT NULL CHECK (length(theme) > 0),
    UNIQUE (partition_id, review_id, theme),
    FOREIGN KEY (partition_id, review_id)
        REFERENCES reviews(partition_id, review_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS review_keywords (
    partition_id INTEGER NOT NULL,
    review_id    TEXT NOT NULL,
    keyword      TEXT NOT NULL CHECK (length(keyword) > 0),
    UNIQUE (partition_id, review_id, keyword),
    FOREIGN KEY (partition_id, review_id)
        REFERENCES reviews(partition_id, review_id) ON DELETE CASCADE
);

-- Derived; rewritten wholesale per partition on every aggregation.
CREATE TABLE IF NOT EXISTS sentiment_summary (
    partition_id   INTEGER NOT NULL
                   REFERENCES partitions(partition_id) ON DELETE CASCADE,
    rating         INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
    review_count   INTEGER NOT NULL CHECK (review_count >= 0),
    positive_count INTEGER NOT NULL,
    neutral_count  INTEGER NOT NULL,
    negative_count INTEGER NOT NULL,
    positive_pct   REAL NOT NULL,
    neutral_pct    REAL NOT NULL,
    negative_pct   REAL NOT NULL,
    mean_score     REAL NOT NULL,
    UNIQUE (partition_id, rating)
);

CREATE TABLE IF NOT EXISTS theme_summary (
    partition_id       INTEGER NOT NULL
                       REFERENCES partitions(partition_id) ON DELETE CASCADE,
    theme              TEXT NOT NULL,
    review_count       INTEGER NOT NULL CHECK (review_count >= 0),
    mean_rating        REAL NOT NULL,
    positive_pct       REAL NOT NULL,
    neutral_pct        REAL NOT NULL,
    negative_pct       REAL NOT NULL,
    exemplar_review_id TEXT NOT NULL,
    exemplar           TEXT NOT NULL,
    insight            TEXT NOT NULL
                       CHECK (insight IN ('driver', 'pain_point', 'unremarkable', 'insufficient_data')),
    UNIQUE (partition_id, theme)
);

CREATE INDEX IF NOT EXISTS reviews_date_idx      ON reviews(review_date);
CREATE INDEX IF NOT EXISTS reviews_label_idx     ON reviews(sentiment_label);
CREATE INDEX IF NOT EXISTS review_themes_idx     ON review_themes(partition_id, theme);
CREATE INDEX IF NOT EXISTS review_keywords_idx   ON review_keywords(partition_id, keyword);

PRAGMA user_version = 1;
";
