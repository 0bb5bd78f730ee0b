//! Translation Pack Backend Library
//!
//! 번역 매처 저장소, 번역 팩(JSON)과 카테고리 그래프 생성, 원문 임포트,
//! 빌드 결과 정적 서버를 담당합니다.

pub mod commands;
pub mod config;
pub mod db;
pub mod display;
pub mod error;
pub mod graph;
pub mod import;
pub mod models;
pub mod notify;
pub mod paginate;
pub mod payload;
pub mod server;
pub mod snapshot;
pub mod translate;
pub mod utils;

use tracing_subscriber::EnvFilter;

use crate::commands::AppState;
use crate::config::{load_env_files, Settings};
use crate::error::PackError;

/// RUST_LOG 기반 로그 초기화 (기본 info). 두 번 불려도 무시
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// env 파일 로드 → 설정 → DB 연결 및 스키마 초기화
pub fn bootstrap() -> Result<AppState, PackError> {
    load_env_files();
    let settings = Settings::from_env();
    tracing::debug!(
        db = %settings.database_path.display(),
        build = %settings.build_root.display(),
        "settings loaded"
    );
    AppState::open(settings)
}
