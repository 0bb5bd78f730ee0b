//! Database Module
//!
//! SQLite 데이터베이스 관리 (매처 / 원문 / 감사 로그)

mod rename;
mod schema;

pub use rename::RenameReport;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::PackError;
use crate::models::{
    groups_contain, AuditAction, AuditEntry, MatchSpec, Matcher, ObjectType, TranslationData,
    ValidMatcher,
};
use crate::paginate::{Page, PageRequest};

/// SQLite `IN (...)` 변수 한계(999)보다 살짝 작게
pub const IN_CHUNK: usize = 900;

const MATCHER_COLUMNS: &str = "id, category, raw, regexp_source, regexp_flag, replace_value, \
     groups_json, priority, ignore_part_translated, memo, created_at";

/// 사용자별 활동 집계
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivityRow {
    pub username: String,
    pub created: u64,
    pub edited: u64,
    pub deleted: u64,
}

/// 데이터베이스 상태 (명령 핸들러 간 공유)
pub struct DbState(pub Mutex<Database>);

/// 데이터베이스 래퍼
pub struct Database {
    conn: Connection,
}

fn millis_to_utc(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// JSON 텍스트 컬럼 파싱. 깨진 값은 변환 오류로 올린다
fn json_column<T: DeserializeOwned>(idx: usize, text: &str) -> rusqlite::Result<T> {
    serde_json::from_str(text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn matcher_from_row(row: &Row<'_>) -> rusqlite::Result<Matcher> {
    let raw: String = row.get(2)?;
    let regexp_source: String = row.get(3)?;
    let regexp_flag: String = row.get(4)?;
    let replace_value_json: String = row.get(5)?;
    let groups_json: String = row.get(6)?;

    let spec = if raw.is_empty() {
        MatchSpec::Regex {
            pattern: regexp_source,
            flags: regexp_flag,
        }
    } else {
        MatchSpec::Raw { text: raw }
    };

    Ok(Matcher {
        id: row.get(0)?,
        category: row.get(1)?,
        spec,
        replace_value: json_column(5, &replace_value_json)?,
        groups: json_column(6, &groups_json)?,
        priority: row.get(7)?,
        ignore_part_translated: row.get(8)?,
        memo: row.get(9)?,
        created_at: millis_to_utc(row.get(10)?),
    })
}

fn translation_from_row(row: &Row<'_>) -> rusqlite::Result<TranslationData> {
    Ok(TranslationData {
        id: row.get(0)?,
        source: row.get(1)?,
        content: row.get(2)?,
        content_hash: row.get(3)?,
    })
}

/// UNIQUE/CHECK 제약 위반은 Conflict 로, 나머지는 그대로
fn map_constraint(err: rusqlite::Error, what: &str) -> PackError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            PackError::Conflict(format!("{} already exists", what))
        }
        _ => PackError::Database(err),
    }
}

fn spec_columns(spec: &MatchSpec) -> (&str, &str, &str) {
    match spec {
        MatchSpec::Raw { text } => (text.as_str(), "", ""),
        MatchSpec::Regex { pattern, flags } => ("", pattern.as_str(), flags.as_str()),
    }
}

fn spec_label(spec: &MatchSpec) -> String {
    match spec {
        MatchSpec::Raw { text } => text.clone(),
        MatchSpec::Regex { pattern, flags } => format!("/{}/{}", pattern, flags),
    }
}

fn record_audit(
    conn: &Connection,
    actor: &str,
    action: AuditAction,
    object_type: ObjectType,
    object_id: i64,
    object_repr: &str,
) -> Result<(), PackError> {
    conn.execute(
        "INSERT INTO audit_log (actor, action_flag, object_type, object_id, object_repr, action_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            actor,
            action.code(),
            object_type.as_str(),
            object_id,
            object_repr,
            Utc::now().timestamp_millis(),
        ],
    )?;
    Ok(())
}

impl Database {
    /// 새 데이터베이스 연결 생성
    pub fn new(path: &Path) -> Result<Self, PackError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// 메모리 DB (테스트/미리보기용)
    pub fn open_in_memory() -> Result<Self, PackError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// 데이터베이스 스키마 초기화
    pub fn initialize(&self) -> Result<(), PackError> {
        self.conn.execute_batch(schema::CREATE_SCHEMA)?;
        Ok(())
    }

    // ─────────────────────────────────────────────
    // 매처
    // ─────────────────────────────────────────────

    /// 매처 생성 + 감사 로그(ADDITION)
    pub fn insert_matcher(&self, matcher: &ValidMatcher, actor: &str) -> Result<Matcher, PackError> {
        let tx = self.conn.unchecked_transaction()?;
        let (raw, regexp_source, regexp_flag) = spec_columns(&matcher.spec);

        tx.execute(
            "INSERT INTO matchers (category, raw, regexp_source, regexp_flag, replace_value,
                                   groups_json, priority, ignore_part_translated, memo, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                &matcher.category,
                raw,
                regexp_source,
                regexp_flag,
                serde_json::to_string(&matcher.replace_value)?,
                serde_json::to_string(&matcher.groups)?,
                matcher.priority,
                matcher.ignore_part_translated,
                &matcher.memo,
                Utc::now().timestamp_millis(),
            ],
        )
        .map_err(|e| map_constraint(e, "Matcher with the same pattern"))?;

        let id = tx.last_insert_rowid();
        record_audit(
            &tx,
            actor,
            AuditAction::Addition,
            ObjectType::Matcher,
            id,
            &spec_label(&matcher.spec),
        )?;
        tx.commit()?;

        self.get_matcher(id)
    }

    /// 매처 수정 + 감사 로그(CHANGE)
    pub fn update_matcher(
        &self,
        id: i64,
        matcher: &ValidMatcher,
        actor: &str,
    ) -> Result<Matcher, PackError> {
        let tx = self.conn.unchecked_transaction()?;
        let (raw, regexp_source, regexp_flag) = spec_columns(&matcher.spec);

        let changed = tx
            .execute(
                "UPDATE matchers SET category = ?1, raw = ?2, regexp_source = ?3, regexp_flag = ?4,
                        replace_value = ?5, groups_json = ?6, priority = ?7,
                        ignore_part_translated = ?8, memo = ?9
                 WHERE id = ?10",
                params![
                    &matcher.category,
                    raw,
                    regexp_source,
                    regexp_flag,
                    serde_json::to_string(&matcher.replace_value)?,
                    serde_json::to_string(&matcher.groups)?,
                    matcher.priority,
                    matcher.ignore_part_translated,
                    &matcher.memo,
                    id,
                ],
            )
            .map_err(|e| map_constraint(e, "Matcher with the same pattern"))?;

        if changed == 0 {
            return Err(PackError::MatcherNotFound(id));
        }

        record_audit(
            &tx,
            actor,
            AuditAction::Change,
            ObjectType::Matcher,
            id,
            &spec_label(&matcher.spec),
        )?;
        tx.commit()?;

        self.get_matcher(id)
    }

    /// 매처 삭제 + 감사 로그(DELETION). 삭제된 매처를 반환 (알림용)
    pub fn delete_matcher(&self, id: i64, actor: &str) -> Result<Matcher, PackError> {
        let matcher = self.get_matcher(id)?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM matchers WHERE id = ?1", [id])?;
        record_audit(
            &tx,
            actor,
            AuditAction::Deletion,
            ObjectType::Matcher,
            id,
            &matcher.label(),
        )?;
        tx.commit()?;

        Ok(matcher)
    }

    /// 매처 조회
    pub fn get_matcher(&self, id: i64) -> Result<Matcher, PackError> {
        let sql = format!("SELECT {} FROM matchers WHERE id = ?1", MATCHER_COLUMNS);
        self.conn
            .query_row(&sql, [id], matcher_from_row)
            .optional()?
            .ok_or(PackError::MatcherNotFound(id))
    }

    fn query_matchers(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Matcher>, PackError> {
        let mut stmt = self.conn.prepare(sql)?;
        let iter = stmt.query_map(params, matcher_from_row)?;
        let mut out = Vec::new();
        for m in iter {
            out.push(m?);
        }
        Ok(out)
    }

    /// 전체 매처 (id 오름차순)
    pub fn list_matchers(&self) -> Result<Vec<Matcher>, PackError> {
        let sql = format!("SELECT {} FROM matchers ORDER BY id", MATCHER_COLUMNS);
        self.query_matchers(&sql, [])
    }

    /// category 가 정확히 일치하는 매처
    pub fn find_rules_by_category(&self, category: &str) -> Result<Vec<Matcher>, PackError> {
        let sql = format!(
            "SELECT {} FROM matchers WHERE category = ?1 ORDER BY id",
            MATCHER_COLUMNS
        );
        self.query_matchers(&sql, [category])
    }

    /// groups 안에 `name` 과 정확히 일치하는 leaf 를 가진 매처
    pub fn find_rules_referencing(&self, name: &str) -> Result<Vec<Matcher>, PackError> {
        // JSON 텍스트로 후보를 좁힌 뒤 leaf 단위로 정확히 비교
        let needle = serde_json::to_string(name)?;
        let sql = format!(
            "SELECT {} FROM matchers WHERE instr(groups_json, ?1) > 0 ORDER BY id",
            MATCHER_COLUMNS
        );
        let candidates = self.query_matchers(&sql, [needle])?;
        Ok(candidates
            .into_iter()
            .filter(|m| groups_contain(&m.groups, name))
            .collect())
    }

    /// 카테고리 목록 (중복 제거 & 정렬)
    pub fn list_categories(&self) -> Result<Vec<String>, PackError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT category FROM matchers ORDER BY category")?;
        let iter = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for c in iter {
            out.push(c?);
        }
        Ok(out)
    }

    /// category / raw / regex / memo / 치환값 텍스트 검색
    pub fn search_matchers(&self, term: &str) -> Result<Vec<Matcher>, PackError> {
        let sql = format!(
            "SELECT {} FROM matchers
             WHERE instr(category, ?1) > 0 OR instr(raw, ?1) > 0
                OR instr(regexp_source, ?1) > 0 OR instr(memo, ?1) > 0
                OR instr(replace_value, ?1) > 0
             ORDER BY id",
            MATCHER_COLUMNS
        );
        self.query_matchers(&sql, [term])
    }

    // ─────────────────────────────────────────────
    // 원문 (TranslationData)
    // ─────────────────────────────────────────────

    /// 원문 추가 + 감사 로그. (source, content) 중복이면 Conflict
    pub fn insert_translation(
        &self,
        source: &str,
        content: &str,
        actor: &str,
    ) -> Result<TranslationData, PackError> {
        let source = source.trim();
        if source.is_empty() {
            let mut errors = crate::error::ValidationErrors::default();
            errors.add("source", "Source 값이 필요합니다.");
            return Err(PackError::Validation(errors));
        }

        let hash = crate::models::content_hash(content);
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO translation_data (source, content, content_hash) VALUES (?1, ?2, ?3)",
            params![source, content, &hash],
        )
        .map_err(|e| map_constraint(e, "Translation data with the same content"))?;

        let id = tx.last_insert_rowid();
        record_audit(
            &tx,
            actor,
            AuditAction::Addition,
            ObjectType::TranslationData,
            id,
            source,
        )?;
        tx.commit()?;

        self.get_translation(id)
    }

    /// 원문 삭제 + 감사 로그. 삭제된 항목 반환
    pub fn delete_translation(&self, id: i64, actor: &str) -> Result<TranslationData, PackError> {
        let data = self.get_translation(id)?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM translation_data WHERE id = ?1", [id])?;
        record_audit(
            &tx,
            actor,
            AuditAction::Deletion,
            ObjectType::TranslationData,
            id,
            &data.source,
        )?;
        tx.commit()?;

        Ok(data)
    }

    /// 원문 조회
    pub fn get_translation(&self, id: i64) -> Result<TranslationData, PackError> {
        self.conn
            .query_row(
                "SELECT id, source, content, content_hash FROM translation_data WHERE id = ?1",
                [id],
                translation_from_row,
            )
            .optional()?
            .ok_or(PackError::TranslationNotFound(id))
    }

    /// 원문 목록 (source 필터 + 페이지). fast 모드는 COUNT(*) 를 생략
    pub fn list_translations(
        &self,
        source: Option<&str>,
        request: &PageRequest,
    ) -> Result<Page<TranslationData>, PackError> {
        let limit = request.fetch_limit() as i64;
        let offset = request.offset() as i64;

        let mut rows = Vec::new();
        {
            let mut stmt = self.conn.prepare(
                "SELECT id, source, content, content_hash FROM translation_data
                 WHERE (?1 IS NULL OR source = ?1)
                 ORDER BY id LIMIT ?2 OFFSET ?3",
            )?;
            let iter = stmt.query_map(params![source, limit, offset], translation_from_row)?;
            for row in iter {
                rows.push(row?);
            }
        }

        if request.fast {
            return Ok(Page::estimated(rows, request));
        }

        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM translation_data WHERE (?1 IS NULL OR source = ?1)",
            params![source],
            |row| row.get(0),
        )?;
        Ok(Page::exact(rows, total as u64, request))
    }

    /// source 또는 content 검색
    pub fn search_translations(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<TranslationData>, PackError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source, content, content_hash FROM translation_data
             WHERE instr(source, ?1) > 0 OR instr(content, ?1) > 0
             ORDER BY id LIMIT ?2",
        )?;
        let iter = stmt.query_map(params![term, limit as i64], translation_from_row)?;
        let mut out = Vec::new();
        for row in iter {
            out.push(row?);
        }
        Ok(out)
    }

    /// source 별 원문 목록 (번역 미리보기용)
    pub fn list_sources(&self) -> Result<Vec<String>, PackError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT source FROM translation_data ORDER BY source")?;
        let iter = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for s in iter {
            out.push(s?);
        }
        Ok(out)
    }

    /// 주어진 fingerprint 중 이미 저장된 것
    pub fn existing_hashes(
        &self,
        source: &str,
        hashes: &[String],
    ) -> Result<HashSet<String>, PackError> {
        let mut found = HashSet::new();
        for chunk in hashes.chunks(IN_CHUNK) {
            let placeholders = (0..chunk.len())
                .map(|i| format!("?{}", i + 2))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT content_hash FROM translation_data WHERE source = ?1 AND content_hash IN ({})",
                placeholders
            );
            let mut stmt = self.conn.prepare(&sql)?;

            let mut values: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(chunk.len() + 1);
            values.push(&source);
            for h in chunk {
                values.push(h);
            }

            let iter = stmt.query_map(values.as_slice(), |row| row.get::<_, String>(0))?;
            for h in iter {
                found.insert(h?);
            }
        }
        Ok(found)
    }

    /// 원문 일괄 삽입 (충돌은 무시). 실제 삽입된 행 수 반환
    pub fn insert_translation_batch(
        &self,
        source: &str,
        rows: &[(String, String)],
    ) -> Result<usize, PackError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0usize;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO translation_data (source, content, content_hash)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (content, hash) in rows {
                inserted += stmt.execute(params![source, content, hash])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// 원문 전체 수
    pub fn count_translations(&self) -> Result<u64, PackError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM translation_data", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    // ─────────────────────────────────────────────
    // 감사 로그
    // ─────────────────────────────────────────────

    /// 대상 모델별 기여자 카운트 (내림차순, 동률은 로그 등장 순)
    pub fn contributor_counts(
        &self,
        object_type: ObjectType,
    ) -> Result<Vec<(String, u64)>, PackError> {
        let mut stmt = self.conn.prepare(
            "SELECT actor, COUNT(*) AS cnt, MIN(id) AS first_id FROM audit_log
             WHERE object_type = ?1 AND action_flag IN (1, 2, 3)
             GROUP BY actor
             ORDER BY cnt DESC, first_id ASC",
        )?;
        let iter = stmt.query_map([object_type.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;
        let mut out = Vec::new();
        for row in iter {
            out.push(row?);
        }
        Ok(out)
    }

    /// 사용자별 생성/수정/삭제 수 (username 소문자 기준 정렬)
    pub fn user_activity(&self) -> Result<Vec<UserActivityRow>, PackError> {
        let mut stmt = self.conn.prepare(
            "SELECT actor,
                    SUM(CASE WHEN action_flag = 1 THEN 1 ELSE 0 END),
                    SUM(CASE WHEN action_flag = 2 THEN 1 ELSE 0 END),
                    SUM(CASE WHEN action_flag = 3 THEN 1 ELSE 0 END)
             FROM audit_log
             GROUP BY actor
             ORDER BY lower(actor)",
        )?;
        let iter = stmt.query_map([], |row| {
            Ok(UserActivityRow {
                username: row.get(0)?,
                created: row.get::<_, i64>(1)? as u64,
                edited: row.get::<_, i64>(2)? as u64,
                deleted: row.get::<_, i64>(3)? as u64,
            })
        })?;
        let mut out = Vec::new();
        for row in iter {
            out.push(row?);
        }
        Ok(out)
    }

    /// 최근 감사 로그
    pub fn recent_audit(&self, limit: usize) -> Result<Vec<AuditEntry>, PackError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, actor, action_flag, object_type, object_id, object_repr, action_time
             FROM audit_log ORDER BY id DESC LIMIT ?1",
        )?;
        let iter = stmt.query_map([limit as i64], |row| {
            let flag: i64 = row.get(2)?;
            let object_type: String = row.get(3)?;
            Ok(AuditEntry {
                id: row.get(0)?,
                actor: row.get(1)?,
                action: AuditAction::from_code(flag).unwrap_or(AuditAction::Change),
                object_type: ObjectType::parse(&object_type).unwrap_or(ObjectType::Matcher),
                object_id: row.get(4)?,
                object_repr: row.get(5)?,
                action_time: millis_to_utc(row.get(6)?),
            })
        })?;
        let mut out = Vec::new();
        for row in iter {
            out.push(row?);
        }
        Ok(out)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{MatcherDraft, ReplaceValue};

    pub(crate) fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    pub(crate) fn raw_draft(category: &str, raw: &str, groups: &str) -> MatcherDraft {
        let mut replace_value = ReplaceValue::new();
        replace_value.insert("ko".to_string(), format!("{} (ko)", raw));
        MatcherDraft {
            category: category.to_string(),
            raw: raw.to_string(),
            replace_value,
            groups: serde_json::from_str(groups).unwrap(),
            ..Default::default()
        }
    }

    pub(crate) fn add(db: &Database, category: &str, raw: &str, groups: &str) -> Matcher {
        let valid = raw_draft(category, raw, groups).validate().unwrap();
        db.insert_matcher(&valid, "tester").unwrap()
    }

    #[test]
    fn test_matcher_roundtrip_and_audit() {
        let db = test_db();
        let m = add(&db, "monster", "orc", r#"[["weapon"]]"#);
        assert_eq!(m.category, "monster");
        assert_eq!(m.spec, MatchSpec::Raw { text: "orc".to_string() });

        let mut draft = MatcherDraft::from(&m);
        draft.priority = 5;
        let updated = db.update_matcher(m.id, &draft.validate().unwrap(), "alice").unwrap();
        assert_eq!(updated.priority, 5);

        db.delete_matcher(m.id, "alice").unwrap();
        assert!(matches!(db.get_matcher(m.id), Err(PackError::MatcherNotFound(_))));

        let counts = db.contributor_counts(ObjectType::Matcher).unwrap();
        assert_eq!(counts, vec![("alice".to_string(), 2), ("tester".to_string(), 1)]);
    }

    #[test]
    fn test_malformed_json_column_is_error() {
        let db = test_db();
        let m = add(&db, "monster", "orc", "[]");
        db.conn
            .execute("UPDATE matchers SET replace_value = '{broken' WHERE id = ?1", [m.id])
            .unwrap();

        match db.get_matcher(m.id) {
            Err(PackError::Database(rusqlite::Error::FromSqlConversionFailure(idx, _, _))) => {
                assert_eq!(idx, 5)
            }
            other => panic!("expected conversion failure, got {:?}", other),
        }
        assert!(db.list_matchers().is_err());
    }

    #[test]
    fn test_duplicate_raw_is_conflict() {
        let db = test_db();
        add(&db, "monster", "orc", "[]");
        let again = raw_draft("item", "orc", "[]").validate().unwrap();
        assert!(matches!(db.insert_matcher(&again, "tester"), Err(PackError::Conflict(_))));
    }

    #[test]
    fn test_find_rules_referencing_exact_leaf() {
        let db = test_db();
        add(&db, "a", "one", r#"["weapon"]"#);
        add(&db, "b", "two", r#"[["weapons"]]"#);
        add(&db, "c", "three", r#"[["x", ["weapon"]]]"#);

        let found: Vec<String> = db
            .find_rules_referencing("weapon")
            .unwrap()
            .into_iter()
            .map(|m| m.category)
            .collect();
        assert_eq!(found, vec!["a", "c"]);
    }

    #[test]
    fn test_existing_hashes_and_batch_insert() {
        let db = test_db();
        let rows: Vec<(String, String)> = ["a", "b", "a"]
            .iter()
            .map(|s| (s.to_string(), crate::models::content_hash(s)))
            .collect();
        assert_eq!(db.insert_translation_batch("msgs", &rows).unwrap(), 2);

        let hashes = vec![crate::models::content_hash("a"), crate::models::content_hash("z")];
        let existing = db.existing_hashes("msgs", &hashes).unwrap();
        assert_eq!(existing.len(), 1);
        assert!(db.existing_hashes("other", &hashes).unwrap().is_empty());
    }

    #[test]
    fn test_user_activity_sorted_case_insensitive() {
        let db = test_db();
        let m = add(&db, "a", "one", "[]");
        db.insert_translation("msgs", "hello", "Bob").unwrap();
        db.delete_matcher(m.id, "alice").unwrap();

        let rows = db.user_activity().unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "Bob", "tester"]);
        assert_eq!(rows[0].deleted, 1);
        assert_eq!(rows[1].created, 1);
    }
}
