//! 카테고리 일괄 변경
//!
//! category 필드와 groups 안의 leaf 를 한 트랜잭션에서 함께 바꾼다.

use std::collections::BTreeMap;

use rusqlite::params;
use serde::Serialize;
use tracing::info;

use super::{record_audit, Database};
use crate::error::{PackError, ValidationErrors};
use crate::models::{replace_group_leaf, AuditAction, ObjectType, CATEGORY_MAX_LEN};

/// 변경(또는 미리보기) 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameReport {
    /// category 가 old 인 매처 수
    pub direct: usize,
    /// groups 에 old leaf 를 가진 매처 수
    pub nested: usize,
}

fn check_names(old: &str, new: &str) -> Result<(), PackError> {
    if old.is_empty() || new.is_empty() {
        return Err(PackError::InvalidOperation(
            "category names must not be empty".to_string(),
        ));
    }
    if old == new {
        return Err(PackError::InvalidOperation(
            "old and new category are the same".to_string(),
        ));
    }
    // 편집 화면과 같은 길이 제한
    let mut errors = ValidationErrors::default();
    if new.chars().count() > CATEGORY_MAX_LEN {
        errors.add(
            "category",
            format!("Category 는 {}자 이하여야 합니다.", CATEGORY_MAX_LEN),
        );
    }
    errors.into_result()
}

impl Database {
    /// 변경 없이 영향 범위만 계산
    pub fn preview_rename(&self, old: &str, new: &str) -> Result<RenameReport, PackError> {
        check_names(old, new)?;
        let direct: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM matchers WHERE category = ?1",
            [old],
            |row| row.get(0),
        )?;
        let nested = self.find_rules_referencing(old)?.len();
        Ok(RenameReport {
            direct: direct as usize,
            nested,
        })
    }

    /// category = old → new, groups leaf == old → new. 전부 성공하거나 전부 롤백
    pub fn rename_category(
        &self,
        old: &str,
        new: &str,
        actor: &str,
    ) -> Result<RenameReport, PackError> {
        check_names(old, new)?;

        // 트랜잭션 시작 전에 후보를 읽어 두고, 같은 트랜잭션 안에서 갱신
        let direct_rules = self.find_rules_by_category(old)?;
        let referencing = self.find_rules_referencing(old)?;

        // 바뀌는 매처 id → 감사 로그 표기. 직접 + 중첩인 매처도 한 건
        let mut changed: BTreeMap<i64, String> =
            direct_rules.iter().map(|m| (m.id, m.label())).collect();

        let tx = self.conn.unchecked_transaction()?;
        let direct = tx.execute(
            "UPDATE matchers SET category = ?1 WHERE category = ?2",
            params![new, old],
        )?;

        let mut nested = 0usize;
        for matcher in referencing {
            let mut groups = matcher.groups.clone();
            if replace_group_leaf(&mut groups, old, new) == 0 {
                continue;
            }
            tx.execute(
                "UPDATE matchers SET groups_json = ?1 WHERE id = ?2",
                params![serde_json::to_string(&groups)?, matcher.id],
            )?;
            changed.entry(matcher.id).or_insert_with(|| matcher.label());
            nested += 1;
        }

        for (id, repr) in &changed {
            record_audit(&tx, actor, AuditAction::Change, ObjectType::Matcher, *id, repr)?;
        }

        tx.commit()?;

        info!(old, new, actor, direct, nested, "category renamed");
        Ok(RenameReport { direct, nested })
    }
}
