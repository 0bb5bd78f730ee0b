//! Matcher Commands
//!
//! 매처 생성/수정/삭제/조회. 저장·삭제 후 번역 팩을 다시 만들고 알림을 보낸다.

use serde::Deserialize;

use super::build::refresh_after_change;
use super::AppState;
use crate::display::{matcher_row, MatcherRow};
use crate::error::{CommandError, CommandResult};
use crate::models::{AuditAction, Matcher, MatcherDraft};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatcherArgs {
    pub draft: MatcherDraft,
    pub actor: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMatcherArgs {
    pub id: i64,
    pub draft: MatcherDraft,
    pub actor: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMatcherArgs {
    pub id: i64,
    pub actor: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMatchersArgs {
    /// 카테고리 정확히 일치
    pub category: Option<String>,
    /// category / 패턴 / memo / 치환값 부분 일치
    pub search: Option<String>,
}

/// 매처 생성
pub async fn create_matcher(args: CreateMatcherArgs, state: &AppState) -> CommandResult<Matcher> {
    let valid = args.draft.validate()?;

    let matcher = {
        let db = state.lock_db()?;
        let matcher = db.insert_matcher(&valid, &args.actor)?;
        refresh_after_change(&db, &state.settings);
        matcher
    };

    state
        .notifier
        .notify_matcher(&matcher, AuditAction::Addition, &args.actor)
        .await;
    Ok(matcher)
}

/// 매처 수정
pub async fn update_matcher(args: UpdateMatcherArgs, state: &AppState) -> CommandResult<Matcher> {
    let valid = args.draft.validate()?;

    let matcher = {
        let db = state.lock_db()?;
        let matcher = db.update_matcher(args.id, &valid, &args.actor)?;
        refresh_after_change(&db, &state.settings);
        matcher
    };

    state
        .notifier
        .notify_matcher(&matcher, AuditAction::Change, &args.actor)
        .await;
    Ok(matcher)
}

/// 매처 삭제. 삭제된 매처 반환
pub async fn delete_matcher(args: DeleteMatcherArgs, state: &AppState) -> CommandResult<Matcher> {
    let matcher = {
        let db = state.lock_db()?;
        let matcher = db.delete_matcher(args.id, &args.actor)?;
        refresh_after_change(&db, &state.settings);
        matcher
    };

    state
        .notifier
        .notify_matcher(&matcher, AuditAction::Deletion, &args.actor)
        .await;
    Ok(matcher)
}

/// 매처 단건 조회
pub fn get_matcher(id: i64, state: &AppState) -> CommandResult<Matcher> {
    let db = state.lock_db()?;
    db.get_matcher(id).map_err(CommandError::from)
}

/// 매처 목록 (표시용 행)
pub fn list_matchers(args: ListMatchersArgs, state: &AppState) -> CommandResult<Vec<MatcherRow>> {
    let db = state.lock_db()?;

    let matchers = match (&args.category, &args.search) {
        (Some(category), _) => db.find_rules_by_category(category)?,
        (None, Some(term)) => db.search_matchers(term)?,
        (None, None) => db.list_matchers()?,
    };

    // 카테고리 + 검색어를 함께 준 경우 검색어로 한 번 더 거름
    let matchers = match (&args.category, &args.search) {
        (Some(_), Some(term)) => {
            let hits: std::collections::HashSet<i64> =
                db.search_matchers(term)?.into_iter().map(|m| m.id).collect();
            matchers.into_iter().filter(|m| hits.contains(&m.id)).collect()
        }
        _ => matchers,
    };

    Ok(matchers.iter().map(matcher_row).collect())
}

/// 카테고리 목록
pub fn list_categories(state: &AppState) -> CommandResult<Vec<String>> {
    let db = state.lock_db()?;
    db.list_categories().map_err(CommandError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::test_state;
    use crate::db::tests::raw_draft;

    #[tokio::test]
    async fn test_create_refreshes_pack_with_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let m = create_matcher(
            CreateMatcherArgs {
                draft: raw_draft("monster", "orc", "[]"),
                actor: "alice".to_string(),
            },
            &state,
        )
        .await
        .unwrap();
        assert_eq!(m.category, "monster");

        let latest = std::fs::read_to_string(dir.path().join("latest.json")).unwrap();
        assert!(latest.contains("\"raw\": \"orc\""));
        assert!(latest.contains("alice (x1)"));

        let snapshots = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| {
                let name = e.as_ref().unwrap().file_name();
                name.to_string_lossy().starts_with("translation_file_")
            })
            .count();
        assert_eq!(snapshots, 2);
    }

    #[tokio::test]
    async fn test_validation_error_reaches_command_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let mut draft = raw_draft("monster", "orc", "[]");
        draft.regexp_source = "^orc$".to_string();
        let err = create_matcher(
            CreateMatcherArgs {
                draft,
                actor: "alice".to_string(),
            },
            &state,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");
        assert!(!dir.path().join("latest.json").exists());
    }

    #[tokio::test]
    async fn test_update_delete_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let m = create_matcher(
            CreateMatcherArgs {
                draft: raw_draft("monster", "orc", "[]"),
                actor: "alice".to_string(),
            },
            &state,
        )
        .await
        .unwrap();

        let mut draft = MatcherDraft::from(&m);
        draft.memo = "line one\nline two".to_string();
        update_matcher(
            UpdateMatcherArgs {
                id: m.id,
                draft,
                actor: "bob".to_string(),
            },
            &state,
        )
        .await
        .unwrap();

        let rows = list_matchers(
            ListMatchersArgs {
                category: Some("monster".to_string()),
                search: Some("line".to_string()),
            },
            &state,
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].memo, "line one ⏎ line two");
        assert_eq!(list_categories(&state).unwrap(), vec!["monster"]);

        delete_matcher(
            DeleteMatcherArgs {
                id: m.id,
                actor: "bob".to_string(),
            },
            &state,
        )
        .await
        .unwrap();
        assert_eq!(get_matcher(m.id, &state).unwrap_err().code, "MATCHER_NOT_FOUND");

        let latest = std::fs::read_to_string(dir.path().join("latest.json")).unwrap();
        assert!(latest.contains("bob (x2), alice (x1)"));
    }
}
