//! Local Storage Provider
//!
//! SQLite 파일 하나에 키-값을 평문으로 저장하는 로컬 백엔드
//! (웹 환경의 localStorage에 대응).
//!
//! - sync / access 인자는 무시
//! - 원자적 prefix 삭제를 제공하지 않으므로 파사드가 `keys()` + 개별 삭제로 처리

mod schema;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{
    GetItemRequest, GetItemResponse, PrefixRequest, PrefixedKeysResponse, ProviderCapabilities,
    RemoveItemRequest, RemoveItemResponse, SetItemRequest, StorageProvider,
};

fn map_sqlite_error(err: rusqlite::Error) -> ProviderError {
    ProviderError::os(format!("Local storage error: {}", err))
}

/// SQLite 기반 로컬 키-값 백엔드
pub struct LocalStorageProvider {
    conn: Mutex<Connection>,
}

impl LocalStorageProvider {
    /// 파일 DB 열기 (상위 디렉토리가 없으면 생성)
    pub fn open(path: &Path) -> ProviderResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ProviderError::os(format!("Failed to create local storage directory: {}", e))
                })?;
            }
        }

        let conn = Connection::open(path).map_err(map_sqlite_error)?;
        Self::with_connection(conn)
    }

    /// 메모리 DB 열기 (프로세스 종료 시 소멸)
    pub fn open_in_memory() -> ProviderResult<Self> {
        let conn = Connection::open_in_memory().map_err(map_sqlite_error)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> ProviderResult<Self> {
        conn.execute_batch(schema::CREATE_SCHEMA)
            .map_err(map_sqlite_error)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> ProviderResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            ProviderError::with_code("LOCK_ERROR", format!("Failed to lock local storage: {}", e))
        })
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            sync_toggle: false,
            atomic_clear: false,
        }
    }

    async fn internal_get_item(&self, request: GetItemRequest) -> ProviderResult<GetItemResponse> {
        let conn = self.lock()?;
        let data = conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?1",
                [&request.prefixed_key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(map_sqlite_error)?;
        Ok(GetItemResponse { data })
    }

    async fn internal_set_item(&self, request: SetItemRequest) -> ProviderResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO local_storage (key, value) VALUES (?1, ?2)",
            (&request.prefixed_key, &request.data),
        )
        .map_err(map_sqlite_error)?;
        Ok(())
    }

    async fn internal_remove_item(
        &self,
        request: RemoveItemRequest,
    ) -> ProviderResult<RemoveItemResponse> {
        let conn = self.lock()?;
        let deleted = conn
            .execute(
                "DELETE FROM local_storage WHERE key = ?1",
                [&request.prefixed_key],
            )
            .map_err(map_sqlite_error)?;
        Ok(RemoveItemResponse {
            success: deleted > 0,
        })
    }

    async fn get_prefixed_keys(&self, request: PrefixRequest) -> ProviderResult<PrefixedKeysResponse> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT key FROM local_storage ORDER BY key")
            .map_err(map_sqlite_error)?;
        let iter = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(map_sqlite_error)?;

        // LIKE는 와일드카드/대소문자 처리 때문에 쓰지 않고 정확한 접두사 비교
        let mut keys = Vec::new();
        for key in iter {
            let key = key.map_err(map_sqlite_error)?;
            if key.starts_with(&request.prefix) {
                keys.push(key);
            }
        }
        Ok(PrefixedKeysResponse { keys })
    }
}
