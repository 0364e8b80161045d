//! Secure Storage - Cross-platform Key-Value Storage Library
//!
//! 하나의 API(`get`/`set`/`remove`/`keys`/`clear` 및 raw 문자열 변형)로
//! OS 자격 증명 저장소와 로컬 키-값 저장소를 투명하게 다룹니다.
//!
//! ```text
//! SecureStorage (facade)
//!   ├─ keys      : 논리 키 -> 물리 키 (prefix)
//!   ├─ codec     : DataType <-> 저장 문자열
//!   ├─ error     : 백엔드 에러 분류
//!   └─ provider  : StorageProvider (memory / local SQLite / keychain)
//! ```

pub mod codec;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod keys;
pub mod memory;
pub mod models;
pub mod provider;
pub mod secrets;
pub mod storage;

pub use config::{BackendKind, ConfigError, StorageConfig};
pub use db::LocalStorageProvider;
pub use error::{Error, ErrorKind, ProviderError, Result, StorageError};
pub use memory::MemoryProvider;
pub use models::{DataType, KeychainAccess};
pub use provider::{ProviderCapabilities, StorageProvider};
pub use secrets::KeychainProvider;
pub use storage::{GetOptions, SecureStorage, SetOptions, StorageSettings};
