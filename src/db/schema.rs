//! Database Schema
//!
//! SQLite 테이블 스키마 정의

/// 데이터베이스 스키마 생성 SQL
pub const CREATE_SCHEMA: &str = r#"
-- 매처 테이블
CREATE TABLE IF NOT EXISTS matchers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category TEXT NOT NULL,
    raw TEXT NOT NULL DEFAULT '',
    regexp_source TEXT NOT NULL DEFAULT '',
    regexp_flag TEXT NOT NULL DEFAULT '',
    replace_value TEXT NOT NULL,  -- JSON Object
    groups_json TEXT NOT NULL DEFAULT '[]',  -- JSON Array (중첩 가능)
    priority INTEGER NOT NULL DEFAULT 0,
    ignore_part_translated INTEGER NOT NULL DEFAULT 0,
    memo TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL,
    CHECK ((raw = '') <> (regexp_source = ''))
);

-- raw 값이 있을 때는 같은 raw 를 하나만
CREATE UNIQUE INDEX IF NOT EXISTS uniq_raw_not_blank ON matchers(raw) WHERE raw <> '';
-- regex 인 경우 regexp_source + regexp_flag 쌍이 유일
CREATE UNIQUE INDEX IF NOT EXISTS uniq_regex_pair ON matchers(regexp_source, regexp_flag) WHERE raw = '';
CREATE INDEX IF NOT EXISTS idx_matchers_category ON matchers(category);

-- 원문 테이블
CREATE TABLE IF NOT EXISTS translation_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    content TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    UNIQUE (source, content_hash)
);

CREATE INDEX IF NOT EXISTS idx_translation_source ON translation_data(source);

-- 감사 로그 테이블
CREATE TABLE IF NOT EXISTS audit_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    actor TEXT NOT NULL,
    action_flag INTEGER NOT NULL CHECK (action_flag IN (1, 2, 3)),
    object_type TEXT NOT NULL CHECK (object_type IN ('matcher', 'translation_data')),
    object_id INTEGER NOT NULL,
    object_repr TEXT NOT NULL,
    action_time INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_object_type ON audit_log(object_type);
CREATE INDEX IF NOT EXISTS idx_audit_actor ON audit_log(actor);
"#;
