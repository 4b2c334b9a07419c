/// SQL DDL for the callsense database.
/// WAL mode + foreign keys enabled at connection time.
pub const SCHEMA_VERSION: u32 = 1;

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS businesses (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    phone TEXT,
    business_type TEXT,
    last_contacted_at TEXT,
    follow_up_date TEXT,
    last_disposition TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS call_sessions (
    id TEXT PRIMARY KEY,
    business_id TEXT NOT NULL REFERENCES businesses(id),
    business_name TEXT NOT NULL,
    contact_name TEXT NOT NULL,
    contact_role TEXT,
    phone TEXT,
    business_type TEXT,
    status TEXT NOT NULL DEFAULT 'in_progress',
    started_at TEXT NOT NULL,
    ended_at TEXT,
    duration_minutes INTEGER,
    buyer_type TEXT,
    urgency TEXT,
    authority TEXT,
    budget TEXT,
    deal_score INTEGER,
    disposition TEXT,
    needs_demo INTEGER NOT NULL DEFAULT 0,
    needs_proposal INTEGER NOT NULL DEFAULT 0,
    needs_case_study INTEGER NOT NULL DEFAULT 0,
    needs_trial INTEGER NOT NULL DEFAULT 0,
    next_action TEXT,
    follow_up_date TEXT,
    notes TEXT,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS call_objections (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL REFERENCES call_sessions(id),
    objection_type TEXT NOT NULL,
    addressed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    UNIQUE (session_id, objection_type)
);

CREATE TABLE IF NOT EXISTS call_pain_points (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL REFERENCES call_sessions(id),
    pain_text TEXT NOT NULL,
    severity INTEGER,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS outreach_notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    business_id TEXT NOT NULL REFERENCES businesses(id),
    note TEXT NOT NULL,
    deal_score INTEGER,
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_call_sessions_active
    ON call_sessions(business_id) WHERE status = 'in_progress';
CREATE INDEX IF NOT EXISTS idx_call_sessions_business ON call_sessions(business_id);
CREATE INDEX IF NOT EXISTS idx_call_objections_session ON call_objections(session_id);
CREATE INDEX IF NOT EXISTS idx_call_pain_points_session ON call_pain_points(session_id);
CREATE INDEX IF NOT EXISTS idx_outreach_notes_business ON outreach_notes(business_id);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;
"#;
