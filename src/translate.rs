//! 번역 미리보기
//!
//! 클라이언트가 번역 팩을 적용하는 방식을 서버에서 재현한다.
//! 카테고리별로 raw 완전 일치 맵과 regex 목록을 두고,
//! regex 캡처는 groups 에 적힌 카테고리로 재귀 번역한다.

use std::collections::HashMap;

use regex::{Captures, Regex, RegexBuilder};
use serde::Serialize;
use tracing::warn;

use crate::models::GroupEntry;
use crate::payload::SerializedMatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranslateStatus {
    Translated,
    PartTranslated,
    Untranslated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslateResult {
    pub target: String,
    pub translation: String,
    pub status: TranslateStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub translations: Vec<TranslateResult>,
}

impl TranslateResult {
    fn untranslated(target: &str) -> Self {
        Self {
            target: target.to_string(),
            translation: target.to_string(),
            status: TranslateStatus::Untranslated,
            translations: Vec::new(),
        }
    }
}

struct CompiledRule {
    regex: Regex,
    global: bool,
    /// 캡처 i → groups[i-1] 의 카테고리 후보
    group_categories: Vec<Vec<String>>,
    replace_value: HashMap<String, String>,
    ignore_part_translated: bool,
}

#[derive(Default)]
struct CategoryRules {
    raw: HashMap<String, HashMap<String, String>>,
    regex: Vec<CompiledRule>,
}

pub struct Translator {
    categories: HashMap<String, CategoryRules>,
}

/// JS RegExp flag → regex 빌더. g 는 치환 방식으로만 쓰이고 d/u/v/y 는 무시
fn compile(pattern: &str, flags: &str) -> Result<(Regex, bool), regex::Error> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            _ => {}
        }
    }
    Ok((builder.build()?, flags.contains('g')))
}

/// JS `String.prototype.replace` 치환 패턴 전개.
/// `$$`, `$&`, `` $` ``, `$'`, `$n`/`$nn`, `$<name>` 를 처리하고 나머지 `$` 는 그대로 둔다.
/// `$<name>` 은 정규식에 이름 있는 그룹이 있을 때만 치환
fn expand_js(template: &str, caps: &Captures<'_>, haystack: &str, named: bool) -> String {
    let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
    let group_count = caps.len() - 1;
    let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("");

    let mut out = String::with_capacity(template.len() + 8);
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let mut next = after.chars();
        let consumed = match next.next() {
            Some('$') => {
                out.push('$');
                1
            }
            Some('&') => {
                out.push_str(group(0));
                1
            }
            Some('`') => {
                out.push_str(&haystack[..whole.0]);
                1
            }
            Some('\'') => {
                out.push_str(&haystack[whole.1..]);
                1
            }
            Some(d) if d.is_ascii_digit() => {
                let one = d.to_digit(10).unwrap_or(0) as usize;
                let two = next
                    .next()
                    .and_then(|e| e.to_digit(10))
                    .map(|e| one * 10 + e as usize);
                match two {
                    Some(n) if (1..=group_count).contains(&n) => {
                        out.push_str(group(n));
                        2
                    }
                    _ if (1..=group_count).contains(&one) => {
                        out.push_str(group(one));
                        1
                    }
                    _ => {
                        out.push('$');
                        0
                    }
                }
            }
            Some('<') if named => match after[1..].find('>') {
                Some(close) => {
                    let name = &after[1..1 + close];
                    if let Some(m) = caps.name(name) {
                        out.push_str(m.as_str());
                    }
                    close + 2
                }
                None => {
                    out.push('$');
                    0
                }
            },
            _ => {
                out.push('$');
                0
            }
        };
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out
}

fn group_categories(groups: &[GroupEntry]) -> Vec<Vec<String>> {
    groups
        .iter()
        .map(|g| match g {
            GroupEntry::Name(name) => vec![name.clone()],
            GroupEntry::List(items) => items
                .iter()
                .filter_map(|i| match i {
                    GroupEntry::Name(n) => Some(n.clone()),
                    _ => None,
                })
                .collect(),
            GroupEntry::Null => Vec::new(),
        })
        .collect()
}

impl Translator {
    pub fn new(matchers: &[SerializedMatcher]) -> Self {
        let mut categories: HashMap<String, CategoryRules> = HashMap::new();
        let mut ordered: Vec<&SerializedMatcher> = matchers.iter().collect();
        // 우선순위 높은 것 먼저, 같으면 id 순
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));

        for m in ordered {
            let entry = categories.entry(m.category.clone()).or_default();
            let replace_value: HashMap<String, String> = m
                .replace_value
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            if let Some(raw) = &m.raw {
                entry.raw.entry(raw.clone()).or_insert(replace_value);
            } else if let Some(regex) = &m.regex {
                match compile(regex.pattern(), regex.flags()) {
                    Ok((compiled, global)) => entry.regex.push(CompiledRule {
                        regex: compiled,
                        global,
                        group_categories: group_categories(&m.groups),
                        replace_value,
                        ignore_part_translated: m.ignore_part_translated,
                    }),
                    Err(e) => {
                        warn!(id = m.id, pattern = regex.pattern(), error = %e, "regex skipped");
                    }
                }
            }
        }

        Self { categories }
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    pub fn translate(&self, target: &str, lang: &str, category: &str) -> TranslateResult {
        self.translate_in(target, lang, category, &mut Vec::new())
    }

    /// `path`: 현재 재귀 중인 카테고리들
    fn translate_in<'a>(
        &'a self,
        target: &str,
        lang: &str,
        category: &'a str,
        path: &mut Vec<&'a str>,
    ) -> TranslateResult {
        let Some(rules) = self.categories.get(category) else {
            return TranslateResult::untranslated(target);
        };

        if let Some(values) = rules.raw.get(target) {
            return TranslateResult {
                target: target.to_string(),
                translation: values.get(lang).cloned().unwrap_or_else(|| target.to_string()),
                status: TranslateStatus::Translated,
                translations: Vec::new(),
            };
        }

        for rule in &rules.regex {
            let Some(caps) = rule.regex.captures(target) else {
                continue;
            };

            let template = rule
                .replace_value
                .get(lang)
                .map(String::as_str)
                .unwrap_or(target);
            let named = rule.regex.capture_names().any(|n| n.is_some());
            let expand = |c: &Captures<'_>| expand_js(template, c, target, named);
            let mut replaced = if rule.global {
                rule.regex.replace_all(target, expand).into_owned()
            } else {
                rule.regex.replace(target, expand).into_owned()
            };

            let mut translations = Vec::new();
            let mut all_translated = true;
            for i in 1..caps.len() {
                let Some(capture) = caps.get(i).map(|c| c.as_str()) else {
                    continue;
                };
                let candidates = rule.group_categories.get(i - 1);

                let mut done = false;
                path.push(category);
                for name in candidates.into_iter().flatten() {
                    // 순환 참조 카테고리는 건너뜀
                    if path.contains(&name.as_str()) || !self.has_category(name) {
                        continue;
                    }
                    let sub = self.translate_in(capture, lang, name, path);
                    if sub.status == TranslateStatus::Translated {
                        replaced = replaced.replacen(capture, &sub.translation, 1);
                        translations.push(sub);
                        done = true;
                        break;
                    }
                }
                path.pop();
                if !done {
                    all_translated = false;
                    translations.push(TranslateResult::untranslated(capture));
                }
            }

            let status = if all_translated || rule.ignore_part_translated {
                TranslateStatus::Translated
            } else {
                TranslateStatus::PartTranslated
            };
            return TranslateResult {
                target: target.to_string(),
                translation: replaced,
                status,
                translations,
            };
        }

        TranslateResult::untranslated(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::RegexField;

    fn raw(id: i64, category: &str, text: &str, ko: &str) -> SerializedMatcher {
        SerializedMatcher {
            category: category.to_string(),
            replace_value: [("ko".to_string(), ko.to_string())].into_iter().collect(),
            raw: Some(text.to_string()),
            regex: None,
            groups: Vec::new(),
            ignore_part_translated: false,
            priority: 0,
            id,
        }
    }

    fn regex(id: i64, category: &str, regex: RegexField, ko: &str, groups: &str) -> SerializedMatcher {
        SerializedMatcher {
            category: category.to_string(),
            replace_value: [("ko".to_string(), ko.to_string())].into_iter().collect(),
            raw: None,
            regex: Some(regex),
            groups: serde_json::from_str(groups).unwrap(),
            ignore_part_translated: false,
            priority: 0,
            id,
        }
    }

    fn bare(p: &str) -> RegexField {
        RegexField::Bare(p.to_string())
    }

    #[test]
    fn test_raw_exact_match() {
        let t = Translator::new(&[raw(1, "monster", "orc", "오크")]);
        let r = t.translate("orc", "ko", "monster");
        assert_eq!(r.translation, "오크");
        assert_eq!(r.status, TranslateStatus::Translated);

        // 언어가 없으면 원문 그대로
        assert_eq!(t.translate("orc", "ja", "monster").translation, "orc");
        assert_eq!(
            t.translate("orc", "ko", "item").status,
            TranslateStatus::Untranslated
        );
    }

    #[test]
    fn test_regex_with_nested_capture() {
        let t = Translator::new(&[
            raw(1, "monster", "orc", "오크"),
            regex(2, "combat", bare("^The (.+) hits you\\.$"), "$1이(가) 당신을 때렸다.", r#"["monster"]"#),
        ]);
        let r = t.translate("The orc hits you.", "ko", "combat");
        assert_eq!(r.translation, "오크이(가) 당신을 때렸다.");
        assert_eq!(r.status, TranslateStatus::Translated);
        assert_eq!(r.translations.len(), 1);
    }

    #[test]
    fn test_mutual_reference_terminates() {
        let t = Translator::new(&[
            regex(1, "a", bare("^(.*)$"), "A[$1]", r#"[["b"]]"#),
            regex(2, "b", bare("^(.*)$"), "B[$1]", r#"[["a"]]"#),
        ]);
        let r = t.translate("x", "ko", "a");
        assert_eq!(r.status, TranslateStatus::PartTranslated);
        assert_eq!(r.translation, "A[x]");
    }

    #[test]
    fn test_part_translated_unless_ignored() {
        let mut m = regex(1, "combat", bare("^(.+) misses$"), "$1 빗나감", r#"[["monster"]]"#);
        let t = Translator::new(&[m.clone(), raw(2, "monster", "orc", "오크")]);
        let r = t.translate("goblin misses", "ko", "combat");
        assert_eq!(r.status, TranslateStatus::PartTranslated);
        assert_eq!(r.translation, "goblin 빗나감");

        m.ignore_part_translated = true;
        let t = Translator::new(&[m]);
        assert_eq!(
            t.translate("goblin misses", "ko", "combat").status,
            TranslateStatus::Translated
        );
    }

    #[test]
    fn test_priority_then_id_and_flags() {
        let mut low = regex(1, "c", bare("hello"), "low", "[]");
        low.priority = 0;
        let mut high = regex(
            2,
            "c",
            RegexField::WithFlags {
                pattern: "HELLO".to_string(),
                flags: "gi".to_string(),
            },
            "hi",
            "[]",
        );
        high.priority = 10;
        let t = Translator::new(&[low, high]);
        assert_eq!(t.translate("hello hello", "ko", "c").translation, "hi hi");
    }

    #[test]
    fn test_same_category_capture_not_recursed() {
        let t = Translator::new(&[regex(1, "c", bare("^(a)$"), "[$1]", r#"["c"]"#)]);
        let r = t.translate("a", "ko", "c");
        assert_eq!(r.translation, "[a]");
        assert_eq!(r.status, TranslateStatus::PartTranslated);
    }

    #[test]
    fn test_bad_pattern_skipped() {
        let t = Translator::new(&[
            regex(1, "c", bare("(unclosed"), "x", "[]"),
            regex(2, "c", bare("^ok$"), "좋아", "[]"),
        ]);
        assert_eq!(t.translate("ok", "ko", "c").translation, "좋아");
    }

    fn expand(pattern: &str, template: &str, text: &str) -> String {
        let re = Regex::new(pattern).unwrap();
        let named = re.capture_names().any(|n| n.is_some());
        re.replace(text, |c: &Captures<'_>| expand_js(template, c, text, named))
            .into_owned()
    }

    #[test]
    fn test_dollar_digit_followed_by_text() {
        assert_eq!(expand("(a)", "$1bc $$ $x", "a"), "abc $ $x");
        // 없는 그룹 번호는 글자 그대로
        assert_eq!(expand("(a)", "$2 $0", "a"), "$2 $0");
        // 두 자리는 그룹이 있을 때만
        assert_eq!(expand("(a)", "$10", "a"), "a0");
    }

    #[test]
    fn test_js_special_patterns() {
        assert_eq!(expand("b+", "[$&]", "abbc"), "a[bb]c");
        assert_eq!(expand("b+", "<$`|$'>", "abbc"), "a<a|c>c");
        assert_eq!(expand("(?P<who>orc)", "$<who>!", "an orc"), "an orc!");
        assert_eq!(expand("(?P<who>orc)", "$<none>.", "an orc"), "an .");
        assert_eq!(expand("orc", "$<who>", "orc"), "$<who>");
    }

    #[test]
    fn test_whole_match_in_translation() {
        let t = Translator::new(&[regex(1, "c", bare("\\d+"), "($&)", "[]")]);
        assert_eq!(t.translate("hp 25", "ko", "c").translation, "hp (25)");
    }
}
