//! Translation Pack Error Types
//!
//! 애플리케이션 전역 에러 타입 정의

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// 폼 필드 단위 검증 오류
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// 저장 시점 검증 오류 모음 (편집 화면의 form error 에 대응)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// 오류가 하나라도 있으면 Err 로 변환
    pub fn into_result(self) -> Result<(), PackError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(PackError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// 번역 팩 백엔드 에러
#[derive(Error, Debug)]
pub enum PackError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Matcher not found: {0}")]
    MatcherNotFound(i64),

    #[error("Translation data not found: {0}")]
    TranslationNotFound(i64),

    #[error("Graph render failed: {0}")]
    Render(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// 명령 응답용 직렬화 가능한 에러
#[derive(Debug, Serialize)]
pub struct CommandError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl From<PackError> for CommandError {
    fn from(error: PackError) -> Self {
        let code = match &error {
            PackError::Database(_) => "DB_ERROR",
            PackError::Io(_) => "IO_ERROR",
            PackError::Serialization(_) => "SERIALIZATION_ERROR",
            PackError::Validation(_) => "VALIDATION_ERROR",
            PackError::Conflict(_) => "CONFLICT",
            PackError::MatcherNotFound(_) => "MATCHER_NOT_FOUND",
            PackError::TranslationNotFound(_) => "TRANSLATION_NOT_FOUND",
            PackError::Render(_) => "RENDER_ERROR",
            PackError::InvalidOperation(_) => "INVALID_OPERATION",
        };

        // 검증 오류는 필드별 메시지를 details 로 함께 전달
        let details = match &error {
            PackError::Validation(errors) => serde_json::to_string(&errors.errors).ok(),
            _ => None,
        };

        CommandError {
            code: code.to_string(),
            message: error.to_string(),
            details,
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for CommandError {}

/// 명령 결과 타입
pub type CommandResult<T> = Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_carries_field_details() {
        let mut errors = ValidationErrors::default();
        errors.add("raw", "Raw 값이 필요합니다.");

        let cmd: CommandError = PackError::Validation(errors).into();
        assert_eq!(cmd.code, "VALIDATION_ERROR");
        assert!(cmd.message.contains("raw"));
        assert!(cmd.details.unwrap().contains("\"field\":\"raw\""));
    }

    #[test]
    fn test_not_found_code() {
        let cmd: CommandError = PackError::MatcherNotFound(7).into();
        assert_eq!(cmd.code, "MATCHER_NOT_FOUND");
        assert_eq!(cmd.message, "Matcher not found: 7");
        assert!(cmd.details.is_none());
    }
}
