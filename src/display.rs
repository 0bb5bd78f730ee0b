//! 목록 화면용 행 변환 (순수 함수)

use serde::Serialize;

use crate::models::{GroupEntry, MatchSpec, Matcher, TranslationData};

/// memo 미리보기 최대 글자 수
pub const MEMO_PREVIEW_LEN: usize = 40;

/// 값이 없을 때 표시
pub const EMPTY_CELL: &str = "–";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatcherRow {
    pub id: i64,
    /// "RAW" | "REGEX"
    pub kind: &'static str,
    pub category: String,
    pub pattern: String,
    /// (언어, 치환 문자열)
    pub translations: Vec<(String, String)>,
    /// "1:weapon" 형태
    pub groups: Vec<String>,
    pub memo: String,
    pub priority: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRow {
    pub id: i64,
    pub source: String,
    pub content: String,
    /// 이 원문으로 raw 매처를 만드는 화면 쿼리스트링
    pub to_matcher_query: String,
}

/// raw 는 그대로, regex 는 `/src/` 또는 `/src/flags`
pub fn pattern_text(spec: &MatchSpec) -> String {
    match spec {
        MatchSpec::Raw { text } => text.clone(),
        MatchSpec::Regex { pattern, flags } => format!("/{}/{}", pattern, flags),
    }
}

fn group_label(entry: &GroupEntry) -> String {
    match entry {
        GroupEntry::Name(name) => name.clone(),
        GroupEntry::Null => "null".to_string(),
        GroupEntry::List(_) => serde_json::to_string(entry).unwrap_or_default(),
    }
}

pub fn memo_preview(memo: &str) -> String {
    let trimmed = memo.trim();
    if trimmed.is_empty() {
        return EMPTY_CELL.to_string();
    }
    trimmed
        .replace('\n', " ⏎ ")
        .chars()
        .take(MEMO_PREVIEW_LEN)
        .collect()
}

pub fn matcher_row(m: &Matcher) -> MatcherRow {
    let kind = match m.spec {
        MatchSpec::Raw { .. } => "RAW",
        MatchSpec::Regex { .. } => "REGEX",
    };
    MatcherRow {
        id: m.id,
        kind,
        category: m.category.clone(),
        pattern: pattern_text(&m.spec),
        translations: m
            .replace_value
            .iter()
            .map(|(lang, text)| (lang.clone(), text.clone()))
            .collect(),
        groups: m
            .groups
            .iter()
            .enumerate()
            .map(|(i, g)| format!("{}:{}", i + 1, group_label(g)))
            .collect(),
        memo: memo_preview(&m.memo),
        priority: m.priority,
    }
}

pub fn translation_row(t: &TranslationData) -> TranslationRow {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("category", &t.source)
        .append_pair("raw", &t.content)
        .append_pair("type", "raw")
        .finish();
    TranslationRow {
        id: t.id,
        source: t.source.clone(),
        content: t.content.clone(),
        to_matcher_query: query,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn matcher(spec: MatchSpec, groups: &str, memo: &str) -> Matcher {
        Matcher {
            id: 7,
            category: "monster".to_string(),
            spec,
            replace_value: [
                ("ko".to_string(), "오크".to_string()),
                ("en".to_string(), "orc".to_string()),
            ]
            .into_iter()
            .collect(),
            groups: serde_json::from_str(groups).unwrap(),
            priority: 3,
            ignore_part_translated: false,
            memo: memo.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_regex_row() {
        let row = matcher_row(&matcher(
            MatchSpec::Regex {
                pattern: "^(.+)$".to_string(),
                flags: String::new(),
            },
            r#"["weapon", ["a", "b"], null]"#,
            "",
        ));
        assert_eq!(row.kind, "REGEX");
        assert_eq!(row.pattern, "/^(.+)$/");
        assert_eq!(row.groups, vec!["1:weapon", "2:[\"a\",\"b\"]", "3:null"]);
        assert_eq!(row.memo, EMPTY_CELL);
        // BTreeMap 이라 언어 코드 순
        assert_eq!(row.translations[0].0, "en");
    }

    #[test]
    fn test_memo_preview_truncates() {
        let memo = format!("first line\n{}", "x".repeat(60));
        let preview = memo_preview(&memo);
        assert!(preview.starts_with("first line ⏎ x"));
        assert_eq!(preview.chars().count(), MEMO_PREVIEW_LEN);
    }

    #[test]
    fn test_translation_row_query() {
        let row = translation_row(&TranslationData {
            id: 1,
            source: "monsters".to_string(),
            content: "the orc & co".to_string(),
            content_hash: String::new(),
        });
        assert_eq!(row.to_matcher_query, "category=monsters&raw=the+orc+%26+co&type=raw");
    }
}
