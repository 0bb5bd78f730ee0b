//! 변경 알림 (Discord 형식 웹훅)
//!
//! 매처/원문이 생성·수정·삭제될 때 관리 화면 링크와 요약을 보낸다.
//! 전송 실패는 로그만 남기고 호출자에게 전파하지 않는다.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{AuditAction, GroupEntry, MatchSpec, Matcher, TranslationData};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub description: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookMessage {
    pub content: String,
    pub embeds: Vec<Embed>,
}

/// 중첩 groups → `` `1:a` `2:1:b` `` (null leaf 는 "null")
pub fn groups_to_str(groups: &[GroupEntry]) -> String {
    fn walk(entries: &[GroupEntry], prefix: &str, out: &mut Vec<String>) {
        for (i, entry) in entries.iter().enumerate() {
            let p = format!("{}{}:", prefix, i + 1);
            match entry {
                GroupEntry::List(items) => walk(items, &p, out),
                GroupEntry::Name(name) => out.push(format!("{}{}", p, name)),
                GroupEntry::Null => out.push(format!("{}null", p)),
            }
        }
    }

    let mut flat = Vec::new();
    walk(groups, "", &mut flat);
    flat.iter()
        .map(|s| format!("`{}`", s))
        .collect::<Vec<_>>()
        .join(" ")
}

fn code_block(label: &str, body: &str) -> String {
    format!("{}: ```\n{}\n```", label, body)
}

fn matcher_description(m: &Matcher) -> String {
    let mut lines = vec![format!("category: `{}`", m.category)];

    match &m.spec {
        MatchSpec::Raw { text } => lines.push(code_block("raw", text)),
        MatchSpec::Regex { pattern, flags } => {
            lines.push(code_block("regex", &format!("/{}/{}", pattern, flags)))
        }
    }

    for (lang, text) in &m.replace_value {
        if !text.is_empty() {
            lines.push(code_block(lang, text));
        }
    }

    if !m.groups.is_empty() {
        lines.push(format!("groups: {}", groups_to_str(&m.groups)));
    }
    if !m.memo.is_empty() {
        lines.push(code_block("memo", &m.memo));
    }
    lines.push(format!("priority: `{}`", m.priority));
    if m.ignore_part_translated {
        lines.push(code_block("ignorePartTranslated", "True"));
    }

    lines.join("\n")
}

fn translation_description(t: &TranslationData) -> String {
    [
        format!("source: `{}`", t.source),
        code_block("content", &t.content),
    ]
    .join("\n")
}

pub struct Notifier {
    webhook_url: Option<String>,
    base_url: String,
    http: reqwest::Client,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>, external_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            webhook_url: webhook_url.filter(|u| !u.trim().is_empty()),
            base_url: external_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    /// 알림 비활성
    pub fn disabled() -> Self {
        Self::new(None, "")
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    fn message(
        &self,
        link: String,
        action: AuditAction,
        actor: &str,
        description: String,
        at: DateTime<Utc>,
    ) -> WebhookMessage {
        WebhookMessage {
            content: format!("{} ({}, {})", link, action.verb(), actor),
            embeds: vec![Embed {
                description,
                timestamp: at.to_rfc3339(),
            }],
        }
    }

    pub fn matcher_message(
        &self,
        m: &Matcher,
        action: AuditAction,
        actor: &str,
        at: DateTime<Utc>,
    ) -> WebhookMessage {
        let link = format!("{}/admin/core/matcher/{}/change/", self.base_url, m.id);
        self.message(link, action, actor, matcher_description(m), at)
    }

    pub fn translation_message(
        &self,
        t: &TranslationData,
        action: AuditAction,
        actor: &str,
        at: DateTime<Utc>,
    ) -> WebhookMessage {
        let link = format!("{}/admin/core/translationdata/{}/change/", self.base_url, t.id);
        self.message(link, action, actor, translation_description(t), at)
    }

    pub async fn notify_matcher(&self, m: &Matcher, action: AuditAction, actor: &str) {
        if !self.is_enabled() {
            return;
        }
        let msg = self.matcher_message(m, action, actor, Utc::now());
        self.send(&msg).await;
    }

    pub async fn notify_translation(&self, t: &TranslationData, action: AuditAction, actor: &str) {
        if !self.is_enabled() {
            return;
        }
        let msg = self.translation_message(t, action, actor, Utc::now());
        self.send(&msg).await;
    }

    async fn send(&self, msg: &WebhookMessage) {
        let Some(url) = &self.webhook_url else {
            return;
        };

        let result = self
            .http
            .post(url)
            .json(msg)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match result {
            Ok(_) => debug!(content = %msg.content, "webhook delivered"),
            Err(e) => warn!(error = %e, "webhook error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn matcher() -> Matcher {
        Matcher {
            id: 12,
            category: "monster".to_string(),
            spec: MatchSpec::Regex {
                pattern: "^(.+) hits$".to_string(),
                flags: "i".to_string(),
            },
            replace_value: [
                ("en".to_string(), String::new()),
                ("ko".to_string(), "$1 공격".to_string()),
            ]
            .into_iter()
            .collect(),
            groups: serde_json::from_str(r#"["a", ["b", "c"], null]"#).unwrap(),
            priority: 2,
            ignore_part_translated: true,
            memo: "note".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_groups_to_str_nested() {
        let groups: Vec<GroupEntry> = serde_json::from_str(r#"["a", ["b", ["c"]]]"#).unwrap();
        assert_eq!(groups_to_str(&groups), "`1:a` `2:1:b` `2:2:1:c`");
    }

    #[test]
    fn test_matcher_message() {
        let notifier = Notifier::new(Some("http://hook".to_string()), "https://tr.example.com/");
        let at = Utc.with_ymd_and_hms(2025, 5, 4, 12, 0, 0).unwrap();
        let msg = notifier.matcher_message(&matcher(), AuditAction::Change, "alice", at);

        assert_eq!(
            msg.content,
            "https://tr.example.com/admin/core/matcher/12/change/ (updated, alice)"
        );
        let desc = &msg.embeds[0].description;
        assert!(desc.starts_with("category: `monster`\nregex: ```\n/^(.+) hits$/i\n```"));
        assert!(desc.contains("ko: ```\n$1 공격\n```"));
        // 빈 번역은 생략
        assert!(!desc.contains("en: "));
        assert!(desc.contains("groups: `1:a` `2:1:b` `2:2:c` `3:null`"));
        assert!(desc.contains("priority: `2`"));
        assert!(desc.contains("ignorePartTranslated"));
        assert_eq!(msg.embeds[0].timestamp, "2025-05-04T12:00:00+00:00");
    }

    #[test]
    fn test_translation_message() {
        let notifier = Notifier::new(None, "http://localhost:8000");
        assert!(!notifier.is_enabled());
        let t = TranslationData {
            id: 3,
            source: "msgs".to_string(),
            content: "You die...".to_string(),
            content_hash: String::new(),
        };
        let msg = notifier.translation_message(&t, AuditAction::Deletion, "bob", Utc::now());
        assert!(msg.content.ends_with("(deleted, bob)"));
        assert_eq!(
            msg.embeds[0].description,
            "source: `msgs`\ncontent: ```\nYou die...\n```"
        );
    }

    #[tokio::test]
    async fn test_disabled_notifier_is_noop() {
        let notifier = Notifier::disabled();
        notifier.notify_matcher(&matcher(), AuditAction::Addition, "x").await;
    }
}
