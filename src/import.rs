//! 원문 팩 일괄 임포트
//!
//! packs/*.json → translation_data. 파일 이름(stem)이 source 가 된다.
//! 파일 형식: 문자열 리스트, 또는 `messages` 리스트를 가진 객체

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::db::Database;
use crate::error::PackError;
use crate::models::content_hash;

/// INSERT 1회(트랜잭션 1개)당 레코드 수
pub const BATCH: usize = 1000;

/// 진행률 로그 최소 간격
pub const LOG_EVERY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub files: usize,
    pub skipped_files: usize,
    pub total_records: usize,
    pub inserted: usize,
    pub duplicates: usize,
}

/// JSON 파일 파싱. 실패하면 경고 후 None
fn load_records(path: &Path) -> Option<Vec<String>> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            warn!(file = %path.display(), error = %e, "cannot read pack, skipping");
            return None;
        }
    };

    let value: Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            warn!(
                file = %path.display(),
                line = e.line(),
                column = e.column(),
                "invalid JSON, skipping"
            );
            return None;
        }
    };

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("messages") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => {
            warn!(file = %path.display(), "pack is neither a list nor an object, skipping");
            return None;
        }
    };

    let mut records = Vec::with_capacity(items.len());
    let mut non_string = 0usize;
    for item in items {
        match item {
            Value::String(s) => records.push(s),
            _ => non_string += 1,
        }
    }
    if non_string > 0 {
        warn!(file = %path.display(), count = non_string, "non-string entries ignored");
    }
    Some(records)
}

/// 디렉터리의 *.json (이름순)
pub fn pack_files(dir: &Path) -> Result<Vec<PathBuf>, PackError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    files.sort();
    Ok(files)
}

/// 경과 시간 / 처리량 / ETA 로그
struct Progress {
    total: usize,
    processed: usize,
    started: Instant,
    next_log: Instant,
}

impl Progress {
    fn new(total: usize) -> Self {
        let now = Instant::now();
        Self {
            total,
            processed: 0,
            started: now,
            next_log: now + LOG_EVERY,
        }
    }

    fn advance(&mut self, n: usize) {
        self.processed += n;
        let now = Instant::now();
        if now < self.next_log && self.processed < self.total {
            return;
        }
        let elapsed = now.duration_since(self.started).as_secs_f64();
        let speed = if elapsed > 0.0 {
            self.processed as f64 / elapsed
        } else {
            0.0
        };
        info!(
            "▶ {}/{} ({:5.1} %) ▸ {:.0} rows/s ▸ ETA {}",
            self.processed,
            self.total,
            percent(self.processed, self.total),
            speed,
            format_eta(self.total.saturating_sub(self.processed), speed)
        );
        self.next_log = now + LOG_EVERY;
    }
}

fn percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        done as f64 / total as f64 * 100.0
    }
}

/// 남은 건수 / 속도 → "mm:ss"
pub fn format_eta(remaining: usize, speed: f64) -> String {
    let secs = if speed > 0.0 {
        (remaining as f64 / speed) as u64
    } else {
        0
    };
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// packs 디렉터리 임포트. 이미 있는 (source, content) 는 건너뜀
pub fn import_packs(db: &Database, dir: &Path) -> Result<ImportReport, PackError> {
    let files = pack_files(dir)?;
    let mut report = ImportReport {
        files: files.len(),
        ..Default::default()
    };

    if files.is_empty() {
        warn!(dir = %dir.display(), "no JSON files in packs directory");
        return Ok(report);
    }

    // 1차 패스: 총 레코드 수
    for file in &files {
        match load_records(file) {
            Some(records) => report.total_records += records.len(),
            None => report.skipped_files += 1,
        }
    }

    if report.total_records == 0 {
        warn!("no records to insert");
        return Ok(report);
    }

    info!(total = report.total_records, "import started");

    // 2차 패스: 실제 삽입
    let mut progress = Progress::new(report.total_records);
    for file in &files {
        let Some(records) = load_records(file) else {
            continue;
        };
        let Some(source) = file.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        let hashes: Vec<String> = records.iter().map(|r| content_hash(r)).collect();
        let mut existing: HashSet<String> = db.existing_hashes(source, &hashes)?;

        let mut batch: Vec<(String, String)> = Vec::with_capacity(BATCH);
        let mut skipped = 0usize;
        for (content, hash) in records.into_iter().zip(hashes) {
            // 파일 안 중복도 여기서 함께 걸러짐
            if !existing.insert(hash.clone()) {
                skipped += 1;
                continue;
            }
            batch.push((content, hash));

            if batch.len() >= BATCH {
                let n = batch.len();
                let inserted = db.insert_translation_batch(source, &batch)?;
                report.inserted += inserted;
                report.duplicates += n - inserted;
                batch.clear();
                progress.advance(n);
            }
        }

        if !batch.is_empty() {
            let n = batch.len();
            let inserted = db.insert_translation_batch(source, &batch)?;
            report.inserted += inserted;
            report.duplicates += n - inserted;
            progress.advance(n);
        }

        report.duplicates += skipped;
        if skipped > 0 {
            progress.advance(skipped);
        }
    }

    let elapsed = progress.started.elapsed().as_secs_f64();
    info!(
        inserted = report.inserted,
        duplicates = report.duplicates,
        "완료! {} rows, 경과 {:.1}초, 평균 {:.0} rows/s",
        report.total_records,
        elapsed,
        if elapsed > 0.0 {
            report.total_records as f64 / elapsed
        } else {
            0.0
        }
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_db;
    use crate::paginate::PageRequest;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_import_twice_inserts_nothing_second_time() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "monsters.json", r#"["orc", "goblin", "orc"]"#);
        write(dir.path(), "messages.json", r#"{"messages": ["You hit.", "You miss."]}"#);

        let db = test_db();
        let first = import_packs(&db, dir.path()).unwrap();
        assert_eq!(first.files, 2);
        assert_eq!(first.total_records, 5);
        assert_eq!(first.inserted, 4);
        assert_eq!(first.duplicates, 1);

        let second = import_packs(&db, dir.path()).unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 5);
        assert_eq!(db.count_translations().unwrap(), 4);

        let page = db
            .list_translations(Some("monsters"), &PageRequest::new(1, 10, false))
            .unwrap();
        assert_eq!(page.count, 2);
    }

    #[test]
    fn test_malformed_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bad.json", "{ not json");
        write(dir.path(), "scalar.json", "42");
        write(dir.path(), "mixed.json", r#"["ok", 1, null]"#);
        write(dir.path(), "notes.txt", "ignored");

        let db = test_db();
        let report = import_packs(&db, dir.path()).unwrap();
        assert_eq!(report.files, 3);
        assert_eq!(report.skipped_files, 2);
        assert_eq!(report.inserted, 1);
    }

    #[test]
    fn test_same_content_in_different_sources() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", r#"["same"]"#);
        write(dir.path(), "b.json", r#"["same"]"#);

        let db = test_db();
        let report = import_packs(&db, dir.path()).unwrap();
        assert_eq!(report.inserted, 2);
    }

    #[test]
    fn test_eta_format() {
        assert_eq!(format_eta(150, 1.0), "02:30");
        assert_eq!(format_eta(10, 0.0), "00:00");
    }
}
