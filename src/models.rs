//! Translation Pack Data Models
//!
//! 매처(Matcher), 원문(TranslationData), 감사 로그 모델

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PackError, ValidationErrors};

/// 카테고리 최대 길이
pub const CATEGORY_MAX_LEN: usize = 50;

/// 클라이언트(JS RegExp)가 허용하는 플래그
pub const ALLOWED_REGEX_FLAGS: &str = "dgimsuvy";

/// 언어 코드 → 치환 문자열 (ex: {"ko": "안녕", "en": "Hi"})
pub type ReplaceValue = BTreeMap<String, String>;

/// 매칭 조건: raw 와 regex 중 정확히 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MatchSpec {
    Raw { text: String },
    Regex { pattern: String, flags: String },
}

impl MatchSpec {
    pub fn type_name(&self) -> &'static str {
        match self {
            MatchSpec::Raw { .. } => "raw",
            MatchSpec::Regex { .. } => "regex",
        }
    }
}

/// groups 항목: 카테고리 이름, 중첩 리스트, 또는 null
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupEntry {
    Name(String),
    List(Vec<GroupEntry>),
    Null,
}

impl GroupEntry {
    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            GroupEntry::Name(name) => out.push(name),
            GroupEntry::List(items) => {
                for item in items {
                    item.collect_leaves(out);
                }
            }
            GroupEntry::Null => {}
        }
    }

    fn replace_leaf(&mut self, old: &str, new: &str) -> usize {
        match self {
            GroupEntry::Name(name) if *name == old => {
                *name = new.to_string();
                1
            }
            GroupEntry::List(items) => items.iter_mut().map(|i| i.replace_leaf(old, new)).sum(),
            _ => 0,
        }
    }
}

/// 중첩 groups 를 문자열 leaf 시퀀스로 평탄화 (등장 순서 유지, null 제외)
pub fn flatten_groups(groups: &[GroupEntry]) -> Vec<&str> {
    let mut out = Vec::new();
    for entry in groups {
        entry.collect_leaves(&mut out);
    }
    out
}

/// 값이 정확히 `name` 인 leaf 가 있는지
pub fn groups_contain(groups: &[GroupEntry], name: &str) -> bool {
    flatten_groups(groups).into_iter().any(|leaf| leaf == name)
}

/// `old` 와 정확히 일치하는 leaf 만 `new` 로 교체. 트리 모양은 그대로. 교체 수 반환
pub fn replace_group_leaf(groups: &mut [GroupEntry], old: &str, new: &str) -> usize {
    groups.iter_mut().map(|g| g.replace_leaf(old, new)).sum()
}

/// 저장된 매처
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Matcher {
    pub id: i64,
    pub category: String,
    pub spec: MatchSpec,
    pub replace_value: ReplaceValue,
    pub groups: Vec<GroupEntry>,
    pub priority: i64,
    pub ignore_part_translated: bool,
    pub memo: String,
    pub created_at: DateTime<Utc>,
}

impl Matcher {
    /// 목록/알림에서 쓰는 한 줄 표현 (raw 는 그대로, regex 는 `/src/flags`)
    pub fn label(&self) -> String {
        match &self.spec {
            MatchSpec::Raw { text } => text.clone(),
            MatchSpec::Regex { pattern, flags } => format!("/{}/{}", pattern, flags),
        }
    }
}

/// 편집 화면 입력 (검증 전)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatcherDraft {
    pub category: String,
    pub raw: String,
    pub regexp_source: String,
    pub regexp_flag: String,
    pub replace_value: ReplaceValue,
    pub groups: Vec<GroupEntry>,
    pub priority: i64,
    pub ignore_part_translated: bool,
    pub memo: String,
}

/// 검증을 통과한 매처 필드
#[derive(Debug, Clone, PartialEq)]
pub struct ValidMatcher {
    pub category: String,
    pub spec: MatchSpec,
    pub replace_value: ReplaceValue,
    pub groups: Vec<GroupEntry>,
    pub priority: i64,
    pub ignore_part_translated: bool,
    pub memo: String,
}

/// `\r\n` 또는 `\r` → `\n`
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

impl MatcherDraft {
    /// 저장 직전 검증. 실패 시 필드별 오류를 모두 모아 반환
    pub fn validate(&self) -> Result<ValidMatcher, PackError> {
        let mut errors = ValidationErrors::default();

        let category = self.category.trim().to_string();
        if category.is_empty() {
            errors.add("category", "Category 값이 필요합니다.");
        } else if category.chars().count() > CATEGORY_MAX_LEN {
            errors.add(
                "category",
                format!("Category 는 {}자 이하여야 합니다.", CATEGORY_MAX_LEN),
            );
        }

        let raw = normalize_newlines(&self.raw);
        let pattern = normalize_newlines(&self.regexp_source);
        let flags = self.regexp_flag.trim().to_string();

        let spec = match (raw.is_empty(), pattern.is_empty()) {
            (false, true) => {
                if !flags.is_empty() {
                    errors.add("regexp_flag", "Raw 매처에는 flag 를 지정할 수 없습니다.");
                }
                Some(MatchSpec::Raw { text: raw })
            }
            (true, false) => {
                validate_flags(&flags, &mut errors);
                Some(MatchSpec::Regex { pattern, flags })
            }
            _ => {
                errors.add(
                    "__all__",
                    "Either raw or regexp_source(+flag) must be set, not both.",
                );
                None
            }
        };

        if self.replace_value.is_empty() {
            errors.add("replace_value", "하나 이상의 Replace value 가 필요합니다.");
        }

        errors.into_result()?;

        // 위에서 spec 이 None 이면 이미 오류로 반환됨
        let spec = spec.ok_or_else(|| {
            PackError::InvalidOperation("match specification missing".to_string())
        })?;

        Ok(ValidMatcher {
            category,
            spec,
            replace_value: self.replace_value.clone(),
            groups: self.groups.clone(),
            priority: self.priority,
            ignore_part_translated: self.ignore_part_translated,
            memo: self.memo.clone(),
        })
    }
}

impl From<&Matcher> for MatcherDraft {
    fn from(m: &Matcher) -> Self {
        let (raw, regexp_source, regexp_flag) = match &m.spec {
            MatchSpec::Raw { text } => (text.clone(), String::new(), String::new()),
            MatchSpec::Regex { pattern, flags } => (String::new(), pattern.clone(), flags.clone()),
        };
        MatcherDraft {
            category: m.category.clone(),
            raw,
            regexp_source,
            regexp_flag,
            replace_value: m.replace_value.clone(),
            groups: m.groups.clone(),
            priority: m.priority,
            ignore_part_translated: m.ignore_part_translated,
            memo: m.memo.clone(),
        }
    }
}

fn validate_flags(flags: &str, errors: &mut ValidationErrors) {
    let mut seen = Vec::new();
    for c in flags.chars() {
        if !ALLOWED_REGEX_FLAGS.contains(c) {
            errors.add("regexp_flag", format!("알 수 없는 flag: {}", c));
        } else if seen.contains(&c) {
            errors.add("regexp_flag", format!("중복된 flag: {}", c));
        }
        seen.push(c);
    }
}

/// 원문 문자열
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationData {
    pub id: i64,
    pub source: String,
    pub content: String,
    pub content_hash: String,
}

/// 원문 중복 판정용 fingerprint (md5 hex)
pub fn content_hash(content: &str) -> String {
    format!("{:x}", md5::compute(content.as_bytes()))
}

/// 감사 로그 동작 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Addition,
    Change,
    Deletion,
}

impl AuditAction {
    pub fn code(self) -> i64 {
        match self {
            AuditAction::Addition => 1,
            AuditAction::Change => 2,
            AuditAction::Deletion => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(AuditAction::Addition),
            2 => Some(AuditAction::Change),
            3 => Some(AuditAction::Deletion),
            _ => None,
        }
    }

    /// 알림 메시지용 동사
    pub fn verb(self) -> &'static str {
        match self {
            AuditAction::Addition => "created",
            AuditAction::Change => "updated",
            AuditAction::Deletion => "deleted",
        }
    }
}

/// 감사 로그 대상 모델
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Matcher,
    TranslationData,
}

impl ObjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Matcher => "matcher",
            ObjectType::TranslationData => "translation_data",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "matcher" => Some(ObjectType::Matcher),
            "translation_data" => Some(ObjectType::TranslationData),
            _ => None,
        }
    }
}

/// 감사 로그 항목
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: i64,
    pub actor: String,
    pub action: AuditAction,
    pub object_type: ObjectType,
    pub object_id: i64,
    pub object_repr: String,
    pub action_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> MatcherDraft {
        let mut replace_value = ReplaceValue::new();
        replace_value.insert("ko".to_string(), "안녕".to_string());
        MatcherDraft {
            category: "greeting".to_string(),
            replace_value,
            ..Default::default()
        }
    }

    #[test]
    fn test_exactly_one_match_variant() {
        let mut both = draft();
        both.raw = "Hello".to_string();
        both.regexp_source = "^Hello$".to_string();
        assert!(matches!(both.validate(), Err(PackError::Validation(_))));

        let neither = draft();
        assert!(matches!(neither.validate(), Err(PackError::Validation(_))));

        let mut raw = draft();
        raw.raw = "Hello".to_string();
        assert_eq!(raw.validate().unwrap().spec.type_name(), "raw");

        let mut regex = draft();
        regex.regexp_source = "^Hello (.+)$".to_string();
        regex.regexp_flag = "i".to_string();
        assert_eq!(
            regex.validate().unwrap().spec,
            MatchSpec::Regex {
                pattern: "^Hello (.+)$".to_string(),
                flags: "i".to_string()
            }
        );
    }

    #[test]
    fn test_empty_replace_value_rejected() {
        let mut d = draft();
        d.raw = "Hello".to_string();
        d.replace_value.clear();
        match d.validate() {
            Err(PackError::Validation(errors)) => assert!(errors.has_field("replace_value")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_flags_validation() {
        let mut d = draft();
        d.raw = "Hello".to_string();
        d.regexp_flag = "i".to_string();
        assert!(d.validate().is_err());

        let mut d = draft();
        d.regexp_source = "a".to_string();
        d.regexp_flag = "ii".to_string();
        assert!(d.validate().is_err());

        d.regexp_flag = "x".to_string();
        assert!(d.validate().is_err());

        d.regexp_flag = "gimsu".to_string();
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_newlines_normalized() {
        let mut d = draft();
        d.raw = "a\r\nb\rc".to_string();
        let valid = d.validate().unwrap();
        assert_eq!(valid.spec, MatchSpec::Raw { text: "a\nb\nc".to_string() });
    }

    #[test]
    fn test_flatten_groups_in_encounter_order() {
        let groups: Vec<GroupEntry> =
            serde_json::from_str(r#"[["a","b"], "c", [["d"]], null]"#).unwrap();
        assert_eq!(flatten_groups(&groups), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_replace_leaf_exact_only() {
        let mut groups: Vec<GroupEntry> =
            serde_json::from_str(r#"["old", ["older", ["old"]], "gold"]"#).unwrap();
        let replaced = replace_group_leaf(&mut groups, "old", "new");
        assert_eq!(replaced, 2);
        assert_eq!(
            serde_json::to_string(&groups).unwrap(),
            r#"["new",["older",["new"]],"gold"]"#
        );
    }

    #[test]
    fn test_content_hash_is_md5_hex() {
        assert_eq!(content_hash("hello"), "5d41402abc4b2a76b9719d911017c592");
    }
}
