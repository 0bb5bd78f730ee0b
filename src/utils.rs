use std::path::{Component, Path, PathBuf};

use crate::error::PackError;

/// root 아래의 상대 경로를 실제 파일 경로로 변환
/// - `..`, 절대 경로, 드라이브 prefix 는 거부
/// - canonicalize() 후 root 밖(심볼릭 링크 등)이면 거부
pub fn resolve_under_root(root: &Path, relative: &str) -> Result<PathBuf, PackError> {
    let rel = Path::new(relative.trim_start_matches('/'));

    for component in rel.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(PackError::InvalidOperation(format!(
                    "path escapes build root: {}",
                    relative
                )))
            }
        }
    }

    let canonical_root = root.canonicalize()?;
    let canonical_path = canonical_root.join(rel).canonicalize()?;

    if !canonical_path.starts_with(&canonical_root) {
        return Err(PackError::InvalidOperation(format!(
            "path escapes build root: {}",
            relative
        )));
    }

    Ok(canonical_path)
}
