//! SQL schema for the academic-records SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS students (
    student_id     TEXT PRIMARY KEY,
    student_number TEXT NOT NULL UNIQUE,
    name           TEXT NOT NULL,
    program        TEXT NOT NULL,
    cohort         INTEGER NOT NULL
);

-- Chronological order is computed in Rust from (academic_year, period);
-- never ORDER BY a label column.
CREATE TABLE IF NOT EXISTS terms (
    term_id                TEXT PRIMARY KEY,
    academic_year          INTEGER NOT NULL,  -- first calendar year
    period                 TEXT NOT NULL,     -- 'GANJIL' | 'GENAP'
    active                 INTEGER NOT NULL DEFAULT 0,
    registration_opens_at  TEXT NOT NULL,
    registration_closes_at TEXT NOT NULL,
    amendment_opens_at     TEXT,
    amendment_closes_at    TEXT,
    UNIQUE (academic_year, period)
);

-- At most one active term institution-wide.
CREATE UNIQUE INDEX IF NOT EXISTS terms_single_active
    ON terms(active) WHERE active = 1;

CREATE TABLE IF NOT EXISTS courses (
    course_id    TEXT PRIMARY KEY,
    code         TEXT NOT NULL UNIQUE,
    name         TEXT NOT NULL,
    credits      INTEGER NOT NULL CHECK (credits > 0),
    nominal_term INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS sections (
    section_id    TEXT PRIMARY KEY,
    term_id       TEXT NOT NULL REFERENCES terms(term_id),
    course_id     TEXT NOT NULL REFERENCES courses(course_id),
    instructor_id TEXT NOT NULL,
    room          TEXT NOT NULL,
    label         TEXT NOT NULL,
    day           INTEGER NOT NULL,  -- 0 = Monday
    start_minute  INTEGER NOT NULL,
    end_minute    INTEGER NOT NULL,
    seat_cap      INTEGER NOT NULL CHECK (seat_cap > 0),
    CHECK (start_minute < end_minute)
);

CREATE TABLE IF NOT EXISTS packages (
    package_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    program     TEXT NOT NULL,
    cohort      INTEGER NOT NULL,
    term_id     TEXT NOT NULL REFERENCES terms(term_id),
    section_ids TEXT NOT NULL DEFAULT '[]'  -- JSON array, in package order
);

CREATE TABLE IF NOT EXISTS registrations (
    registration_id  TEXT PRIMARY KEY,
    student_id       TEXT NOT NULL REFERENCES students(student_id),
    term_id          TEXT NOT NULL REFERENCES terms(term_id),
    status           TEXT NOT NULL,  -- 'draft' | 'submitted' | 'approved' | 'rejected'
    total_credits    INTEGER NOT NULL DEFAULT 0,
    package_id       TEXT REFERENCES packages(package_id),
    created_at       TEXT NOT NULL,
    submitted_at     TEXT,
    decided_at       TEXT,
    decided_by       TEXT,
    rejection_reason TEXT
);

-- Rejected registrations stay on record; at most one other per student and term.
CREATE UNIQUE INDEX IF NOT EXISTS registrations_live
    ON registrations(student_id, term_id) WHERE status <> 'rejected';

CREATE TABLE IF NOT EXISTS registration_lines (
    line_id         TEXT PRIMARY KEY,
    registration_id TEXT NOT NULL
        REFERENCES registrations(registration_id) ON DELETE CASCADE,
    section_id      TEXT NOT NULL REFERENCES sections(section_id),
    UNIQUE (registration_id, section_id)
);

CREATE TABLE IF NOT EXISTS grades (
    grade_id     TEXT PRIMARY KEY,
    student_id   TEXT NOT NULL REFERENCES students(student_id),
    section_id   TEXT NOT NULL REFERENCES sections(section_id),
    score        REAL NOT NULL CHECK (score >= 0 AND score <= 100),
    letter       TEXT NOT NULL,
    points       REAL NOT NULL,
    finalized    INTEGER NOT NULL DEFAULT 0,
    recorded_at  TEXT NOT NULL,
    finalized_at TEXT,
    UNIQUE (student_id, section_id)
);

-- Derived; rebuilt by transcript aggregation.
CREATE TABLE IF NOT EXISTS transcripts (
    transcript_id      TEXT PRIMARY KEY,
    student_id         TEXT NOT NULL REFERENCES students(student_id),
    term_id            TEXT NOT NULL REFERENCES terms(term_id),
    semester_gpa       REAL NOT NULL,
    cumulative_gpa     REAL NOT NULL,
    semester_credits   INTEGER NOT NULL,
    cumulative_credits INTEGER NOT NULL,
    computed_at        TEXT NOT NULL,
    UNIQUE (student_id, term_id)
);

CREATE INDEX IF NOT EXISTS sections_term_idx   ON sections(term_id);
CREATE INDEX IF NOT EXISTS lines_section_idx   ON registration_lines(section_id);
CREATE INDEX IF NOT EXISTS grades_section_idx  ON grades(section_id);
CREATE INDEX IF NOT EXISTS grades_student_idx  ON grades(student_id);

PRAGMA user_version = 1;
";
