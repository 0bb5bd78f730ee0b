//! 번역 팩(JSON) 생성
//!
//! 전체 매처를 직렬화하고, 감사 로그 기준 기여자 요약과 생성 시각을 붙인다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db::Database;
use crate::error::PackError;
use crate::models::{GroupEntry, MatchSpec, Matcher, ObjectType, ReplaceValue};

/// `regex` 필드: flag 가 없으면 문자열, 있으면 {pattern, flags}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegexField {
    Bare(String),
    WithFlags { pattern: String, flags: String },
}

impl RegexField {
    pub fn pattern(&self) -> &str {
        match self {
            RegexField::Bare(p) => p,
            RegexField::WithFlags { pattern, .. } => pattern,
        }
    }

    pub fn flags(&self) -> &str {
        match self {
            RegexField::Bare(_) => "",
            RegexField::WithFlags { flags, .. } => flags,
        }
    }
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// 클라이언트가 읽는 매처 한 건
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedMatcher {
    pub category: String,
    pub replace_value: ReplaceValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<RegexField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupEntry>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore_part_translated: bool,
    #[serde(default)]
    pub priority: i64,
    pub id: i64,
}

impl From<&Matcher> for SerializedMatcher {
    fn from(m: &Matcher) -> Self {
        let (raw, regex) = match &m.spec {
            MatchSpec::Raw { text } => (Some(text.clone()), None),
            MatchSpec::Regex { pattern, flags } if flags.is_empty() => {
                (None, Some(RegexField::Bare(pattern.clone())))
            }
            MatchSpec::Regex { pattern, flags } => (
                None,
                Some(RegexField::WithFlags {
                    pattern: pattern.clone(),
                    flags: flags.clone(),
                }),
            ),
        };

        SerializedMatcher {
            category: m.category.clone(),
            replace_value: m.replace_value.clone(),
            raw,
            regex,
            groups: m.groups.clone(),
            ignore_part_translated: m.ignore_part_translated,
            priority: m.priority,
            id: m.id,
        }
    }
}

/// 최종 번역 팩
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub matchers: Vec<SerializedMatcher>,
    pub time: String,
    pub messages: Vec<String>,
}

/// JS Date 가 읽을 수 있는 ISO-8601 UTC (초 단위)
pub fn format_time(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// "user (xN), user2 (xM)" 형태의 기여자 요약
pub fn contributor_summary(counts: &[(String, u64)]) -> String {
    counts
        .iter()
        .map(|(user, cnt)| format!("{} (x{})", user, cnt))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 현재 DB 로 번역 팩 생성
pub fn build_payload(db: &Database) -> Result<Payload, PackError> {
    build_payload_at(db, Utc::now())
}

pub fn build_payload_at(db: &Database, now: DateTime<Utc>) -> Result<Payload, PackError> {
    let matchers: Vec<SerializedMatcher> = db
        .list_matchers()?
        .iter()
        .map(SerializedMatcher::from)
        .collect();

    // 기여자 집계 실패는 빈 요약으로 대체
    let summary = match db.contributor_counts(ObjectType::Matcher) {
        Ok(counts) => contributor_summary(&counts),
        Err(e) => {
            warn!(error = %e, "contributor aggregation failed");
            String::new()
        }
    };

    Ok(Payload {
        matchers,
        time: format_time(now),
        messages: vec![summary],
    })
}

impl Payload {
    /// 파일 저장용 JSON (2칸 들여쓰기, 비ASCII 그대로)
    pub fn to_pretty_json(&self) -> Result<String, PackError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
