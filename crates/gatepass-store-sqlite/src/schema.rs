//! SQL schema for the gate pass SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Timestamps are fixed-width RFC 3339 (microseconds, `Z` suffix), so text
/// comparison and `ORDER BY` agree with chronological order.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS identities (
    identity_id   TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    full_name     TEXT NOT NULL,
    student_id    TEXT UNIQUE,
    phone         TEXT,
    department    TEXT,
    role          TEXT NOT NULL DEFAULT 'student',  -- 'student' | 'admin'
    is_active     INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- At most one row per identity is 'active'. Enforced by the issuance
-- transaction, which also retires lapsed rows still marked 'active'.
CREATE TABLE IF NOT EXISTS gate_passes (
    pass_id       TEXT PRIMARY KEY,
    identity_id   TEXT NOT NULL REFERENCES identities(identity_id) ON DELETE CASCADE,
    credential    TEXT NOT NULL UNIQUE,
    status        TEXT NOT NULL DEFAULT 'active',   -- 'active' | 'expired' | 'revoked'
    valid_from    TEXT NOT NULL,
    valid_until   TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    revoked_at    TEXT,
    qr_code_path  TEXT
);

-- Scan log: strictly append-only.
-- No UPDATE or DELETE is ever issued against this table. The implicit rowid
-- breaks ties between entries with equal scanned_at.
CREATE TABLE IF NOT EXISTS gate_pass_logs (
    log_id        TEXT PRIMARY KEY,
    pass_id       TEXT NOT NULL REFERENCES gate_passes(pass_id),
    subject_id    TEXT NOT NULL REFERENCES identities(identity_id),
    verifier_id   TEXT NOT NULL REFERENCES identities(identity_id),
    entry_type    TEXT NOT NULL,                    -- 'inward' | 'outward'
    scanned_at    TEXT NOT NULL,
    location      TEXT,
    notes         TEXT
);

CREATE INDEX IF NOT EXISTS passes_identity_status_idx ON gate_passes(identity_id, status, created_at);
CREATE INDEX IF NOT EXISTS logs_subject_idx           ON gate_pass_logs(subject_id, scanned_at);
CREATE INDEX IF NOT EXISTS logs_scanned_idx           ON gate_pass_logs(scanned_at);

PRAGMA user_version = 1;
";
