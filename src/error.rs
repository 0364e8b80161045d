//! Secure Storage Error Types
//!
//! 저장소 전역 에러 타입 정의
//!
//! - `StorageError`: 닫힌 분류 체계(`ErrorKind`)에 속하는 에러
//! - `ProviderError`: 백엔드가 보고하는 원본 에러 (code는 선택)
//! - `classify`: 알려진 code만 `StorageError`로 재분류하고 나머지는 그대로 전달

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 저장소 에러 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// 키가 비어 있음
    MissingKey,
    /// 저장된 문자열을 디코딩할 수 없음
    InvalidData,
    /// 백엔드가 보고한 플랫폼 수준 에러 (권한, 잠긴 키스토어 등)
    OsError,
    /// 분류되지 않은 백엔드 에러
    UnknownError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 4] = [
        ErrorKind::MissingKey,
        ErrorKind::InvalidData,
        ErrorKind::OsError,
        ErrorKind::UnknownError,
    ];

    /// 와이어 코드 (`missingKey`, `invalidData`, `osError`, `unknownError`)
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::MissingKey => "missingKey",
            ErrorKind::InvalidData => "invalidData",
            ErrorKind::OsError => "osError",
            ErrorKind::UnknownError => "unknownError",
        }
    }

    /// 분류 체계에 속하는 코드일 때만 `Some`
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// 호출자가 재시도를 고려할 수 있는 에러인지 여부
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::OsError | ErrorKind::UnknownError)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| format!("unknown storage error code: {}", s))
    }
}

/// 분류된 저장소 에러 (message + kind)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StorageError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn missing_key() -> Self {
        Self::new(ErrorKind::MissingKey, "No key provided")
    }

    pub fn invalid_data() -> Self {
        Self::new(ErrorKind::InvalidData, "Invalid data")
    }
}

/// 백엔드가 반환하는 원본 에러
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{message}")]
pub struct ProviderError {
    pub code: Option<String>,
    pub message: String,
    pub details: Option<String>,
}

impl ProviderError {
    /// 코드가 붙은 에러
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            details: None,
        }
    }

    /// 코드 없는 (분류 불가) 에러
    pub fn uncoded(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            details: None,
        }
    }

    pub fn os(message: impl Into<String>) -> Self {
        Self::with_code(ErrorKind::OsError.code(), message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::with_code(ErrorKind::UnknownError.code(), message)
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Provider 연산 결과 타입
pub type ProviderResult<T> = Result<T, ProviderError>;

/// 저장소 최상위 에러
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// 분류 체계에 속하는 에러
    #[error("{0}")]
    Storage(#[from] StorageError),

    /// 분류되지 않은 백엔드 에러 (원본 그대로)
    #[error("Provider error: {0}")]
    Provider(ProviderError),
}

impl Error {
    /// 분류된 에러일 때의 kind
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Storage(err) => Some(err.kind),
            Error::Provider(_) => None,
        }
    }
}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        classify(err)
    }
}

/// 저장소 연산 결과 타입
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Provider 에러 재분류
///
/// code가 분류 체계의 구성원이면 메시지를 보존한 `StorageError`로,
/// 그렇지 않으면 원본 에러를 그대로 전달한다.
pub fn classify(err: ProviderError) -> Error {
    match err.code.as_deref().and_then(ErrorKind::from_code) {
        Some(kind) => Error::Storage(StorageError::new(kind, err.message)),
        None => Error::Provider(err),
    }
}

/// 명령 응답용 직렬화 가능한 에러
#[derive(Debug, Serialize)]
pub struct CommandError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl From<Error> for CommandError {
    fn from(error: Error) -> Self {
        match error {
            Error::Storage(err) => CommandError {
                code: err.kind.code().to_string(),
                message: err.message,
                details: None,
            },
            Error::Provider(err) => CommandError {
                code: err.code.unwrap_or_else(|| "PROVIDER_ERROR".to_string()),
                message: err.message,
                details: err.details,
            },
        }
    }
}

/// 명령 결과 타입
pub type CommandResult<T> = Result<T, CommandError>;
