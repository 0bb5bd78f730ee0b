//! Build Commands
//!
//! 번역 팩 내보내기 / 빌드 목록

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::AppState;
use crate::config::Settings;
use crate::db::Database;
use crate::error::{CommandError, CommandResult, PackError};
use crate::graph::CategoryGraph;
use crate::payload::build_payload;
use crate::snapshot::{list_builds, BuildFileEntry, SnapshotWriter, WrittenBuild};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportArgs {
    /// true 면 타임스탬프 사본도 남김
    #[serde(default)]
    pub snapshot: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub matchers: usize,
    pub categories: usize,
    /// 순환 간선 "from -> to"
    pub cyclic_edges: Vec<String>,
    pub written: WrittenBuild,
}

/// 팩 생성 → 그래프 → 파일 저장
pub fn export_pack(
    db: &Database,
    settings: &Settings,
    snapshot: bool,
) -> Result<ExportResult, PackError> {
    let payload = build_payload(db)?;
    let graph = CategoryGraph::build(&payload.matchers);
    let dot = graph.to_dot(&|category| settings.category_link(category));

    let renderer = settings.renderer();
    let writer = SnapshotWriter::new(&settings.build_root, renderer.as_ref());
    let written = writer.write(&payload, &dot, snapshot)?;

    let cyclic_edges: Vec<String> = graph
        .cyclic_edges()
        .map(|e| format!("{} -> {}", e.from, e.to))
        .collect();
    if !cyclic_edges.is_empty() {
        warn!(count = cyclic_edges.len(), "category graph has cycles");
    }

    Ok(ExportResult {
        matchers: payload.matchers.len(),
        categories: graph.nodes.len(),
        cyclic_edges,
        written,
    })
}

/// 변경 후 자동 재생성. 실패해도 이미 커밋된 변경은 유지하고 로그만 남김
pub(crate) fn refresh_after_change(db: &Database, settings: &Settings) {
    match export_pack(db, settings, true) {
        Ok(result) => info!(matchers = result.matchers, "translation pack refreshed"),
        Err(e) => warn!(error = %e, "translation pack refresh failed"),
    }
}

/// 번역 팩 내보내기
pub fn export(args: ExportArgs, state: &AppState) -> CommandResult<ExportResult> {
    let db = state.lock_db()?;
    export_pack(&db, &state.settings, args.snapshot).map_err(CommandError::from)
}

/// 빌드 파일 목록 (latest.json 우선)
pub fn builds(state: &AppState) -> CommandResult<Vec<BuildFileEntry>> {
    let settings = &state.settings;
    let ext = settings.renderer().extension().to_string();
    list_builds(&settings.build_root, &settings.build_url, &ext).map_err(CommandError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::test_state;
    use crate::db::tests::add;

    #[test]
    fn test_export_writes_latest_and_reports_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        {
            let db = state.lock_db().unwrap();
            add(&db, "A", "one", r#"["B"]"#);
            add(&db, "B", "two", r#"["A"]"#);
            add(&db, "C", "three", "[]");
        }

        let result = export(ExportArgs { snapshot: false }, &state).unwrap();
        assert_eq!(result.matchers, 3);
        assert_eq!(result.categories, 3);
        assert_eq!(result.cyclic_edges, vec!["A -> B", "B -> A"]);
        assert!(result.written.snapshot_json.is_none());

        let dot = std::fs::read_to_string(dir.path().join("latest.dot")).unwrap();
        assert!(dot.contains("http://localhost:8000/admin/core/matcher/?category=A"));
        assert!(dot.contains("\"A\" -> \"B\" [color=red];"));

        let list = builds(&state).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].graph.as_deref(), Some("latest.dot"));
    }

    #[test]
    fn test_export_snapshot_adds_listing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        export(ExportArgs { snapshot: true }, &state).unwrap();

        let list = builds(&state).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list[1].name.starts_with("translation_file_"));
    }
}
