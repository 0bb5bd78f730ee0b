//! Commands Module
//!
//! CLI / 서버에서 호출하는 명령 정의.
//! 명령은 `*Args` 를 받아 `CommandResult<T>` 를 돌려준다.

pub mod build;
pub mod category;
pub mod matcher;
pub mod stats;
pub mod translation;

use std::sync::{Mutex, MutexGuard};

use crate::config::Settings;
use crate::db::{Database, DbState};
use crate::error::{CommandError, CommandResult, PackError};
use crate::notify::Notifier;

/// 명령 핸들러 간 공유 상태
pub struct AppState {
    pub db: DbState,
    pub settings: Settings,
    pub notifier: Notifier,
}

impl AppState {
    /// 설정의 DB 파일을 열고 스키마 초기화
    pub fn open(settings: Settings) -> Result<Self, PackError> {
        let db = Database::new(&settings.database_path)?;
        db.initialize()?;
        Ok(Self::with_database(db, settings))
    }

    pub fn with_database(db: Database, settings: Settings) -> Self {
        let notifier = Notifier::new(settings.webhook_url.clone(), &settings.external_url);
        Self {
            db: DbState(Mutex::new(db)),
            settings,
            notifier,
        }
    }

    pub(crate) fn lock_db(&self) -> CommandResult<MutexGuard<'_, Database>> {
        self.db.0.lock().map_err(|e| CommandError {
            code: "LOCK_ERROR".to_string(),
            message: format!("Failed to acquire database lock: {}", e),
            details: None,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 메모리 DB + 임시 build 디렉터리 + DOT 렌더러
    pub(crate) fn test_state(build_root: &std::path::Path) -> AppState {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let settings = Settings {
            build_root: build_root.to_path_buf(),
            graphviz_dot: "none".to_string(),
            ..Default::default()
        };
        AppState::with_database(db, settings)
    }
}
