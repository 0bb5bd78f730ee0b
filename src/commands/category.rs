//! Category Commands
//!
//! 카테고리 일괄 변경 (미리보기 → 확정)

use serde::{Deserialize, Serialize};

use super::build::refresh_after_change;
use super::AppState;
use crate::db::RenameReport;
use crate::error::CommandResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameCategoryArgs {
    pub old: String,
    pub new: String,
    pub actor: String,
    /// true 면 건수만 계산
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameOutcome {
    pub old: String,
    pub new: String,
    pub report: RenameReport,
    pub applied: bool,
}

/// 카테고리 일괄 변경. 확정 시 번역 팩도 다시 만든다
pub fn rename_category(
    args: RenameCategoryArgs,
    state: &AppState,
) -> CommandResult<RenameOutcome> {
    let old = args.old.trim().to_string();
    let new = args.new.trim().to_string();
    let db = state.lock_db()?;

    let report = if args.dry_run {
        db.preview_rename(&old, &new)?
    } else {
        let report = db.rename_category(&old, &new, &args.actor)?;
        refresh_after_change(&db, &state.settings);
        report
    };

    Ok(RenameOutcome {
        old,
        new,
        report,
        applied: !args.dry_run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::test_state;
    use crate::db::tests::add;

    fn args(dry_run: bool) -> RenameCategoryArgs {
        RenameCategoryArgs {
            old: "weapon".to_string(),
            new: " arms ".to_string(),
            actor: "alice".to_string(),
            dry_run,
        }
    }

    #[test]
    fn test_dry_run_then_apply() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        {
            let db = state.lock_db().unwrap();
            add(&db, "weapon", "club", "[]");
            add(&db, "monster", "orc", r#"[["weapon"]]"#);
        }

        let preview = rename_category(args(true), &state).unwrap();
        assert!(!preview.applied);
        assert_eq!(preview.report, RenameReport { direct: 1, nested: 1 });
        assert!(!dir.path().join("latest.json").exists());

        let done = rename_category(args(false), &state).unwrap();
        assert!(done.applied);
        assert_eq!(done.new, "arms");

        let latest = std::fs::read_to_string(dir.path().join("latest.json")).unwrap();
        assert!(latest.contains("\"category\": \"arms\""));
        assert!(!latest.contains("weapon"));
    }

    #[test]
    fn test_same_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let err = rename_category(
            RenameCategoryArgs {
                old: "a".to_string(),
                new: "a".to_string(),
                actor: "alice".to_string(),
                dry_run: false,
            },
            &state,
        )
        .unwrap_err();
        assert_eq!(err.code, "INVALID_OPERATION");
    }
}
