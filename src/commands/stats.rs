//! Stats Commands
//!
//! 사용자 활동 집계 / 최근 변경 이력

use super::AppState;
use crate::db::UserActivityRow;
use crate::error::{CommandError, CommandResult};
use crate::models::AuditEntry;

/// 사용자별 생성/수정/삭제 건수
pub fn user_activity(state: &AppState) -> CommandResult<Vec<UserActivityRow>> {
    let db = state.lock_db()?;
    db.user_activity().map_err(CommandError::from)
}

/// 최근 감사 로그
pub fn recent_activity(limit: usize, state: &AppState) -> CommandResult<Vec<AuditEntry>> {
    let db = state.lock_db()?;
    db.recent_audit(limit).map_err(CommandError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::test_state;
    use crate::db::tests::add;
    use crate::models::AuditAction;

    #[test]
    fn test_activity_rows() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        {
            let db = state.lock_db().unwrap();
            let m = add(&db, "monster", "orc", "[]");
            db.delete_matcher(m.id, "Zed").unwrap();
        }

        let rows = user_activity(&state).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].username, "tester");
        assert_eq!(rows[1].username, "Zed");
        assert_eq!(rows[1].deleted, 1);

        let recent = recent_activity(1, &state).unwrap();
        assert_eq!(recent[0].action, AuditAction::Deletion);
        assert_eq!(recent[0].object_repr, "orc");
    }
}
