//! 빌드 결과 저장
//!
//! latest.json / latest.<ext> 는 항상 덮어쓰고,
//! snapshot 요청 시 translation_file_<타임스탬프>.* 사본을 추가로 남긴다.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

use crate::error::PackError;
use crate::graph::GraphRenderer;
use crate::payload::Payload;

pub const LATEST_STEM: &str = "latest";
pub const SNAPSHOT_PREFIX: &str = "translation_file_";

/// 이번 저장으로 만들어진 파일들
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenBuild {
    pub latest_json: PathBuf,
    pub latest_graph: PathBuf,
    pub snapshot_json: Option<PathBuf>,
    pub snapshot_graph: Option<PathBuf>,
}

/// 빌드 목록 항목
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildFileEntry {
    pub name: String,
    pub size: u64,
    pub modified: String,
    pub url: String,
    pub graph: Option<String>,
}

pub struct SnapshotWriter<'a> {
    root: PathBuf,
    renderer: &'a dyn GraphRenderer,
}

/// 임시 파일에 쓰고 rename (읽는 쪽이 반쯤 쓰인 파일을 보지 않도록)
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PackError> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// 스냅샷 파일명용 로컬 시각 (초 단위)
pub fn snapshot_stamp(now: DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

impl<'a> SnapshotWriter<'a> {
    pub fn new(root: impl Into<PathBuf>, renderer: &'a dyn GraphRenderer) -> Self {
        Self {
            root: root.into(),
            renderer,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn write(&self, payload: &Payload, dot: &str, snapshot: bool) -> Result<WrittenBuild, PackError> {
        self.write_at(payload, dot, snapshot, Local::now())
    }

    pub fn write_at(
        &self,
        payload: &Payload,
        dot: &str,
        snapshot: bool,
        now: DateTime<Local>,
    ) -> Result<WrittenBuild, PackError> {
        fs::create_dir_all(&self.root)?;

        let json = payload.to_pretty_json()?;
        let ext = self.renderer.extension();

        let latest_json = self.root.join(format!("{}.json", LATEST_STEM));
        let latest_graph = self.root.join(format!("{}.{}", LATEST_STEM, ext));

        // 그래프를 먼저 임시 경로에 그린다. 실패하면 기존 latest 쌍은 그대로
        let tmp_graph = self.root.join(format!("{}.{}.tmp", LATEST_STEM, ext));
        if let Err(e) = self.renderer.render(dot, &tmp_graph) {
            let _ = fs::remove_file(&tmp_graph);
            return Err(e);
        }
        if let Err(e) = write_atomic(&latest_json, json.as_bytes()) {
            let _ = fs::remove_file(&tmp_graph);
            return Err(e);
        }
        fs::rename(&tmp_graph, &latest_graph)?;

        let (snapshot_json, snapshot_graph) = if snapshot {
            let stem = format!("{}{}", SNAPSHOT_PREFIX, snapshot_stamp(now));
            let snap_json = self.root.join(format!("{}.json", stem));
            let snap_graph = self.root.join(format!("{}.{}", stem, ext));
            fs::write(&snap_json, json.as_bytes())?;
            fs::copy(&latest_graph, &snap_graph)?;
            (Some(snap_json), Some(snap_graph))
        } else {
            (None, None)
        };

        info!(
            root = %self.root.display(),
            matchers = payload.matchers.len(),
            snapshot,
            "translation pack written"
        );

        Ok(WrittenBuild {
            latest_json,
            latest_graph,
            snapshot_json,
            snapshot_graph,
        })
    }
}

fn entry_for(path: &Path, base_url: &str, graph_ext: &str) -> Result<BuildFileEntry, PackError> {
    let meta = fs::metadata(path)?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let modified: DateTime<Local> = meta.modified()?.into();

    let graph_name = path.with_extension(graph_ext);
    let graph = if graph_name.is_file() {
        graph_name
            .file_name()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string())
    } else {
        None
    };

    Ok(BuildFileEntry {
        url: format!("{}{}", base_url, urlencoding::encode(&name)),
        name,
        size: meta.len(),
        modified: modified.format("%Y-%m-%d %H:%M:%S").to_string(),
        graph,
    })
}

/// 빌드 목록: latest.json 우선, 이후 스냅샷을 이름 내림차순. 없는 파일은 목록에서 빠짐
pub fn list_builds(root: &Path, base_url: &str, graph_ext: &str) -> Result<Vec<BuildFileEntry>, PackError> {
    let mut entries = Vec::new();

    let latest = root.join(format!("{}.json", LATEST_STEM));
    if latest.is_file() {
        entries.push(entry_for(&latest, base_url, graph_ext)?);
    }

    if !root.is_dir() {
        return Ok(entries);
    }

    let mut snapshots: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|s| s.to_str())
                .map(|n| n.starts_with(SNAPSHOT_PREFIX) && n.ends_with(".json"))
                .unwrap_or(false)
        })
        .collect();
    snapshots.sort();
    snapshots.reverse();

    for path in snapshots {
        entries.push(entry_for(&path, base_url, graph_ext)?);
    }
    Ok(entries)
}
