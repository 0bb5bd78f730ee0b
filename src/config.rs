//! 실행 설정
//!
//! `.env.local` → `.env` → 프로세스 환경변수 순으로 읽는다.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::graph::{DotSourceRenderer, GraphRenderer, GraphvizRenderer};

/// GRAPHVIZ_DOT 에 이 값을 넣으면 SVG 대신 DOT 텍스트 저장
pub const NO_GRAPHVIZ: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_path: PathBuf,
    pub build_root: PathBuf,
    pub build_url: String,
    pub external_url: String,
    pub webhook_url: Option<String>,
    pub packs_dir: PathBuf,
    pub graphviz_dot: String,
    pub bind_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("translation.db"),
            build_root: PathBuf::from("build"),
            build_url: "/build/".to_string(),
            external_url: "http://localhost:8000".to_string(),
            webhook_url: None,
            packs_dir: PathBuf::from("packs"),
            graphviz_dot: "dot".to_string(),
            bind_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

impl Settings {
    /// 환경변수에서 설정 구성 (없거나 빈 값이면 기본값)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let d = Self::default();

        Self {
            database_path: get("DATABASE_PATH").map(PathBuf::from).unwrap_or(d.database_path),
            build_root: get("BUILD_ROOT").map(PathBuf::from).unwrap_or(d.build_root),
            build_url: get("BUILD_URL").unwrap_or(d.build_url),
            external_url: get("EXTERNAL_URL").unwrap_or(d.external_url),
            webhook_url: get("WEBHOOK_URL"),
            packs_dir: get("PACKS_DIR").map(PathBuf::from).unwrap_or(d.packs_dir),
            graphviz_dot: get("GRAPHVIZ_DOT").unwrap_or(d.graphviz_dot),
            bind_addr: get("BIND_ADDR").unwrap_or(d.bind_addr),
        }
    }

    /// 설정된 그래프 렌더러
    pub fn renderer(&self) -> Box<dyn GraphRenderer> {
        if self.graphviz_dot.eq_ignore_ascii_case(NO_GRAPHVIZ) {
            Box::new(DotSourceRenderer)
        } else {
            Box::new(GraphvizRenderer::new(&self.graphviz_dot))
        }
    }

    /// 그래프 노드 링크: 관리 화면의 카테고리 필터
    pub fn category_link(&self, category: &str) -> String {
        let base = self.external_url.trim_end_matches('/');
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("category", category)
            .finish();
        format!("{}/admin/core/matcher/?{}", base, query)
    }
}

/// `.env.local` 탐색 시 올라갈 최대 상위 디렉터리 수
const ENV_SEARCH_DEPTH: usize = 6;

/// 이 도구가 읽는 환경변수. 느슨한 로더는 이 키들만 받는다
pub const ENV_KEYS: &[&str] = &[
    "DATABASE_PATH",
    "BUILD_ROOT",
    "BUILD_URL",
    "EXTERNAL_URL",
    "WEBHOOK_URL",
    "PACKS_DIR",
    "GRAPHVIZ_DOT",
    "BIND_ADDR",
    "RUST_LOG",
];

/// 한 줄에서 `KEY=VALUE` 추출.
/// `export ` 접두어, 감싼 따옴표, 따옴표 없는 값 뒤의 ` #` 주석을 허용하고
/// 모르는 키는 무시
fn parse_env_line(line: &str) -> Option<(&'static str, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = ENV_KEYS.iter().copied().find(|k| *k == key.trim())?;

    let value = value.trim();
    let quoted = value.len() >= 2
        && (value.starts_with('"') || value.starts_with('\''))
        && value.ends_with(&value[..1]);
    let value = if quoted {
        &value[1..value.len() - 1]
    } else {
        value.split(" #").next().unwrap_or_default().trim_end()
    };
    Some((key, value.to_string()))
}

/// dotenvy 가 거부한 파일에서 알아볼 수 있는 줄만 반영.
/// 이미 비어 있지 않은 값이 있는 키는 그대로 둔다. 반영한 키 목록 반환
fn load_env_lenient(path: &Path) -> std::io::Result<Vec<&'static str>> {
    let text = std::fs::read_to_string(path)?;
    let mut applied = Vec::new();
    for (key, value) in text.lines().filter_map(parse_env_line) {
        let has_value = std::env::var(key).map(|v| !v.trim().is_empty()).unwrap_or(false);
        if !has_value {
            std::env::set_var(key, value);
            applied.push(key);
        }
    }
    Ok(applied)
}

/// `start` 와 그 상위 디렉터리에서 가장 가까운 `.env.local`
fn find_env_local(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(ENV_SEARCH_DEPTH + 1)
        .map(|dir| dir.join(".env.local"))
        .find(|p| p.is_file())
}

/// `.env.local` (CWD 에서 위로 탐색) 후 `.env`. 파일이 없어도 실패하지 않음
pub fn load_env_files() {
    let local = std::env::current_dir()
        .ok()
        .and_then(|cwd| find_env_local(&cwd));

    if let Some(path) = local {
        if let Err(strict) = dotenvy::from_path(&path) {
            match load_env_lenient(&path) {
                Ok(keys) => debug!(
                    file = %path.display(),
                    error = %strict,
                    ?keys,
                    "env file parsed leniently"
                ),
                Err(e) => debug!(file = %path.display(), error = %e, "env file unreadable"),
            }
        }
    }

    let _ = dotenvy::dotenv();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let s = Settings::from_lookup(|_| None);
        assert_eq!(s, Settings::default());
        assert_eq!(s.build_url, "/build/");
        assert!(s.webhook_url.is_none());
    }

    #[test]
    fn test_overrides_and_blank_values() {
        let env: HashMap<&str, &str> = [
            ("BUILD_ROOT", "/srv/build"),
            ("WEBHOOK_URL", "  "),
            ("GRAPHVIZ_DOT", "none"),
        ]
        .into_iter()
        .collect();
        let s = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(s.build_root, PathBuf::from("/srv/build"));
        assert!(s.webhook_url.is_none());
        assert_eq!(s.renderer().extension(), "dot");
    }

    #[test]
    fn test_category_link_is_encoded() {
        let s = Settings {
            external_url: "https://tr.example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            s.category_link("item & weapon"),
            "https://tr.example.com/admin/core/matcher/?category=item+%26+weapon"
        );
    }

    #[test]
    fn test_env_line_parsing() {
        assert_eq!(
            parse_env_line("BUILD_URL='/packs/'"),
            Some(("BUILD_URL", "/packs/".to_string()))
        );
        assert_eq!(
            parse_env_line("export BIND_ADDR = 0.0.0.0:9000  # public"),
            Some(("BIND_ADDR", "0.0.0.0:9000".to_string()))
        );
        assert_eq!(
            parse_env_line(r#"WEBHOOK_URL="https://hooks.example.com/a#b""#),
            Some(("WEBHOOK_URL", "https://hooks.example.com/a#b".to_string()))
        );
        assert_eq!(parse_env_line("# BUILD_ROOT=x"), None);
        assert_eq!(parse_env_line("```"), None);
        assert_eq!(parse_env_line("OPENAI_KEY=secret"), None);
        assert_eq!(parse_env_line("build_root=x"), None);
    }

    #[test]
    fn test_env_local_found_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        assert!(find_env_local(&nested).is_none());

        std::fs::write(dir.path().join(".env.local"), "PACKS_DIR=p\n").unwrap();
        assert_eq!(find_env_local(&nested), Some(dir.path().join(".env.local")));
    }
}
