//! Keychain Provider
//!
//! OS 키체인/키링(`keyring`)에 레코드를 저장하는 보안 네이티브 백엔드.
//!
//! - 레코드 = 서비스 `<service>` (sync 호출이면 `<service>.sync`)의 계정 `<물리 키>`
//! - 파티션마다 `KeyIndex` 엔트리로 키 목록과 접근 정책을 관리
//! - 실시간 동기화 토글과 원자적 prefix 삭제 지원

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use keyring::{Entry, Error as KeyringError};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::models::KeychainAccess;
use crate::provider::{
    GetItemRequest, GetItemResponse, PrefixRequest, PrefixedKeysResponse, ProviderCapabilities,
    RemoveItemRequest, RemoveItemResponse, SetItemRequest, StorageProvider,
};
use crate::secrets::index::{KeyIndex, INDEX_ACCOUNT};

/// Keychain 기본 서비스 이름
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "secure-storage";

/// 동기화 파티션 서비스 이름 접미사
const SYNC_SERVICE_SUFFIX: &str = ".sync";

fn map_keyring_error(err: KeyringError) -> ProviderError {
    match &err {
        KeyringError::PlatformFailure(_) | KeyringError::NoStorageAccess(_) => {
            ProviderError::os(format!("Secure store error: {}", err))
        }
        _ => ProviderError::unknown(format!("Secure store error: {}", err)),
    }
}

/// OS 자격 증명 저장소 백엔드
pub struct KeychainProvider {
    service: String,
    /// 백엔드 수준 동기화 상태 (`set_synchronize_keychain`)
    ///
    /// 조회/기록 용도로만 쓴다. 파티션 선택은 요청마다 실린 `sync` 값이 결정한다.
    synchronize: AtomicBool,
    /// (service, account) -> 엔트리 핸들
    ///
    /// 살아 있는 레코드와 파티션 인덱스 핸들만 남는다. 삭제되었거나 없는 키는 제거된다.
    entries: Mutex<HashMap<(String, String), Arc<Entry>>>,
    /// 인덱스 read-modify-write 직렬화
    index_lock: tokio::sync::Mutex<()>,
}

impl KeychainProvider {
    pub fn new(service: impl Into<String>) -> Self {
        Self::with_synchronize(service, false)
    }

    /// 동기화 상태를 지정해서 생성 (설정의 sync 기본값 반영)
    pub fn with_synchronize(service: impl Into<String>, synchronize: bool) -> Self {
        let service = service.into();
        info!(service = %service, synchronize, "keychain provider created");
        Self {
            service,
            synchronize: AtomicBool::new(synchronize),
            entries: Mutex::new(HashMap::new()),
            index_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// 백엔드의 현재 동기화 상태
    pub fn is_synchronizing(&self) -> bool {
        self.synchronize.load(Ordering::SeqCst)
    }

    /// 레코드가 기록될 때 사용된 접근 정책
    pub async fn recorded_access(
        &self,
        prefixed_key: &str,
        sync: bool,
    ) -> ProviderResult<Option<KeychainAccess>> {
        let service = self.service_for(sync);
        let _guard = self.index_lock.lock().await;
        Ok(self.load_index(&service)?.access(prefixed_key))
    }

    fn service_for(&self, sync: bool) -> String {
        if sync {
            format!("{}{}", self.service, SYNC_SERVICE_SUFFIX)
        } else {
            self.service.clone()
        }
    }

    fn lock_entries(
        &self,
    ) -> ProviderResult<MutexGuard<'_, HashMap<(String, String), Arc<Entry>>>> {
        self.entries.lock().map_err(|e| {
            ProviderError::with_code("LOCK_ERROR", format!("Failed to lock keychain entries: {}", e))
        })
    }

    fn entry(&self, service: &str, account: &str) -> ProviderResult<Arc<Entry>> {
        let mut entries = self.lock_entries()?;

        let cache_key = (service.to_string(), account.to_string());
        if let Some(entry) = entries.get(&cache_key) {
            return Ok(Arc::clone(entry));
        }

        let entry = Arc::new(Entry::new(service, account).map_err(map_keyring_error)?);
        entries.insert(cache_key, Arc::clone(&entry));
        Ok(entry)
    }

    /// 더 이상 레코드가 없는 핸들 제거
    fn evict(&self, service: &str, account: &str) -> ProviderResult<()> {
        self.lock_entries()?
            .remove(&(service.to_string(), account.to_string()));
        Ok(())
    }

    fn record_entry(&self, service: &str, prefixed_key: &str) -> ProviderResult<Arc<Entry>> {
        if prefixed_key == INDEX_ACCOUNT {
            return Err(ProviderError::unknown(format!(
                "Key is reserved by the keychain index: {}",
                prefixed_key
            )));
        }
        self.entry(service, prefixed_key)
    }

    fn load_index(&self, service: &str) -> ProviderResult<KeyIndex> {
        let entry = self.entry(service, INDEX_ACCOUNT)?;
        match entry.get_password() {
            Ok(text) => KeyIndex::from_json(&text),
            Err(KeyringError::NoEntry) => Ok(KeyIndex::default()),
            Err(err) => Err(map_keyring_error(err)),
        }
    }

    fn save_index(&self, service: &str, index: &KeyIndex) -> ProviderResult<()> {
        let entry = self.entry(service, INDEX_ACCOUNT)?;
        if index.is_empty() {
            return match entry.delete_password() {
                Ok(()) | Err(KeyringError::NoEntry) => Ok(()),
                Err(err) => Err(map_keyring_error(err)),
            };
        }
        entry
            .set_password(&index.to_json()?)
            .map_err(map_keyring_error)
    }

    /// 레코드 삭제. 존재했으면 `true`
    fn delete_record(&self, service: &str, prefixed_key: &str) -> ProviderResult<bool> {
        let entry = self.record_entry(service, prefixed_key)?;
        let existed = match entry.delete_password() {
            Ok(()) => true,
            Err(KeyringError::NoEntry) => false,
            Err(err) => return Err(map_keyring_error(err)),
        };
        self.evict(service, prefixed_key)?;
        Ok(existed)
    }
}

impl Default for KeychainProvider {
    fn default() -> Self {
        Self::new(DEFAULT_KEYCHAIN_SERVICE)
    }
}

#[async_trait]
impl StorageProvider for KeychainProvider {
    fn name(&self) -> &'static str {
        "keychain"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            sync_toggle: true,
            atomic_clear: true,
        }
    }

    async fn set_synchronize_keychain(&self, sync: bool) -> ProviderResult<()> {
        self.synchronize.store(sync, Ordering::SeqCst);
        info!(service = %self.service, sync, "keychain synchronization toggled");
        Ok(())
    }

    async fn internal_get_item(&self, request: GetItemRequest) -> ProviderResult<GetItemResponse> {
        let service = self.service_for(request.sync);

        // 없는 키의 핸들 제거가 동시 쓰기와 겹치지 않도록 인덱스 락 안에서 처리
        let _guard = self.index_lock.lock().await;
        let entry = self.record_entry(&service, &request.prefixed_key)?;
        match entry.get_password() {
            Ok(data) => Ok(GetItemResponse { data: Some(data) }),
            Err(KeyringError::NoEntry) => {
                self.evict(&service, &request.prefixed_key)?;
                Ok(GetItemResponse { data: None })
            }
            Err(err) => Err(map_keyring_error(err)),
        }
    }

    async fn internal_set_item(&self, request: SetItemRequest) -> ProviderResult<()> {
        let service = self.service_for(request.sync);

        let _guard = self.index_lock.lock().await;
        let entry = self.record_entry(&service, &request.prefixed_key)?;
        entry
            .set_password(&request.data)
            .map_err(map_keyring_error)?;

        let mut index = self.load_index(&service)?;
        if index.insert(&request.prefixed_key, request.access) {
            self.save_index(&service, &index)?;
        }
        Ok(())
    }

    async fn internal_remove_item(
        &self,
        request: RemoveItemRequest,
    ) -> ProviderResult<RemoveItemResponse> {
        let service = self.service_for(request.sync);

        let _guard = self.index_lock.lock().await;
        let success = self.delete_record(&service, &request.prefixed_key)?;

        let mut index = self.load_index(&service)?;
        if index.remove(&request.prefixed_key) {
            self.save_index(&service, &index)?;
        }
        Ok(RemoveItemResponse { success })
    }

    async fn clear_items_with_prefix(&self, request: PrefixRequest) -> ProviderResult<()> {
        let service = self.service_for(request.sync);

        let _guard = self.index_lock.lock().await;
        let mut index = self.load_index(&service)?;
        let keys = index.keys_with_prefix(&request.prefix);
        for key in &keys {
            self.delete_record(&service, key)?;
            index.remove(key);
        }
        if !keys.is_empty() {
            self.save_index(&service, &index)?;
        }

        debug!(service = %service, removed = keys.len(), "keychain prefix cleared");
        Ok(())
    }

    async fn get_prefixed_keys(&self, request: PrefixRequest) -> ProviderResult<PrefixedKeysResponse> {
        let service = self.service_for(request.sync);
        let _guard = self.index_lock.lock().await;
        let index = self.load_index(&service)?;
        Ok(PrefixedKeysResponse {
            keys: index.keys_with_prefix(&request.prefix),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataType;
    use crate::storage::{GetOptions, SecureStorage};

    fn mock_provider() -> KeychainProvider {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
        KeychainProvider::new("secure-storage-test")
    }

    fn set_request(key: &str, data: &str, sync: bool, access: KeychainAccess) -> SetItemRequest {
        SetItemRequest {
            prefixed_key: key.to_string(),
            data: data.to_string(),
            sync,
            access,
        }
    }

    fn prefix_request(prefix: &str, sync: bool) -> PrefixRequest {
        PrefixRequest {
            prefix: prefix.to_string(),
            sync,
        }
    }

    #[tokio::test]
    async fn test_set_get_remove_with_index() {
        let provider = mock_provider();
        provider
            .internal_set_item(set_request("p_a", "42", false, KeychainAccess::AfterFirstUnlock))
            .await
            .unwrap();

        let got = provider
            .internal_get_item(GetItemRequest {
                prefixed_key: "p_a".into(),
                sync: false,
            })
            .await
            .unwrap();
        assert_eq!(got.data.as_deref(), Some("42"));
        assert_eq!(
            provider.recorded_access("p_a", false).await.unwrap(),
            Some(KeychainAccess::AfterFirstUnlock)
        );

        let keys = provider.get_prefixed_keys(prefix_request("p_", false)).await.unwrap();
        assert_eq!(keys.keys, vec!["p_a".to_string()]);

        let remove = RemoveItemRequest {
            prefixed_key: "p_a".into(),
            sync: false,
        };
        assert!(provider.internal_remove_item(remove.clone()).await.unwrap().success);
        assert!(!provider.internal_remove_item(remove).await.unwrap().success);
        assert!(provider
            .get_prefixed_keys(prefix_request("", false))
            .await
            .unwrap()
            .keys
            .is_empty());
    }

    #[tokio::test]
    async fn test_sync_partition_is_separate() {
        let provider = mock_provider();
        provider
            .internal_set_item(set_request("p_a", "1", true, KeychainAccess::WhenUnlocked))
            .await
            .unwrap();

        let unsynced = provider
            .internal_get_item(GetItemRequest {
                prefixed_key: "p_a".into(),
                sync: false,
            })
            .await
            .unwrap();
        assert_eq!(unsynced.data, None);

        let keys = provider.get_prefixed_keys(prefix_request("p_", true)).await.unwrap();
        assert_eq!(keys.keys, vec!["p_a".to_string()]);
    }

    #[tokio::test]
    async fn test_clear_prefix_leaves_other_prefixes() {
        let provider = mock_provider();
        for key in ["p_a", "p_b", "q_a"] {
            provider
                .internal_set_item(set_request(key, "0", false, KeychainAccess::WhenUnlocked))
                .await
                .unwrap();
        }

        provider
            .clear_items_with_prefix(prefix_request("p_", false))
            .await
            .unwrap();

        let keys = provider.get_prefixed_keys(prefix_request("", false)).await.unwrap();
        assert_eq!(keys.keys, vec!["q_a".to_string()]);
    }

    #[tokio::test]
    async fn test_sync_toggle_and_reserved_key() {
        let provider = mock_provider();
        assert!(!provider.is_synchronizing());
        provider.set_synchronize_keychain(true).await.unwrap();
        assert!(provider.is_synchronizing());

        let err = provider
            .internal_set_item(set_request(INDEX_ACCOUNT, "x", false, KeychainAccess::WhenUnlocked))
            .await
            .unwrap_err();
        assert_eq!(err.code.as_deref(), Some("unknownError"));
    }

    fn cached_entries(provider: &KeychainProvider) -> usize {
        provider.entries.lock().unwrap().len()
    }

    #[tokio::test]
    async fn test_entry_cache_is_bounded_by_live_records() {
        let provider = mock_provider();
        for i in 0..200 {
            let key = format!("p_{}", i);
            provider
                .internal_set_item(set_request(&key, "1", false, KeychainAccess::WhenUnlocked))
                .await
                .unwrap();
            assert!(
                provider
                    .internal_remove_item(RemoveItemRequest {
                        prefixed_key: key,
                        sync: false,
                    })
                    .await
                    .unwrap()
                    .success
            );
        }
        // 인덱스 핸들만 남는다
        assert_eq!(cached_entries(&provider), 1);

        for key in ["p_a", "p_b", "q_a"] {
            provider
                .internal_set_item(set_request(key, "0", false, KeychainAccess::WhenUnlocked))
                .await
                .unwrap();
        }
        assert_eq!(cached_entries(&provider), 4);
        provider
            .clear_items_with_prefix(prefix_request("p_", false))
            .await
            .unwrap();
        assert_eq!(cached_entries(&provider), 2);

        let missing = provider
            .internal_get_item(GetItemRequest {
                prefixed_key: "never_written".into(),
                sync: false,
            })
            .await
            .unwrap();
        assert_eq!(missing.data, None);
        assert_eq!(cached_entries(&provider), 2);

        let kept = provider
            .internal_get_item(GetItemRequest {
                prefixed_key: "q_a".into(),
                sync: false,
            })
            .await
            .unwrap();
        assert_eq!(kept.data.as_deref(), Some("0"));
    }

    #[tokio::test]
    async fn test_initial_synchronize_flag() {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
        let provider = KeychainProvider::with_synchronize("secure-storage-test", true);
        assert!(provider.is_synchronizing());
        assert!(!KeychainProvider::default().is_synchronizing());
    }

    #[tokio::test]
    async fn test_facade_sync_default_selects_partition() {
        let storage = SecureStorage::new(Arc::new(mock_provider()));
        storage.set("a", 1i64).await.unwrap();

        storage.set_synchronize(true).await.unwrap();
        assert!(storage.keys().await.unwrap().is_empty());
        assert_eq!(storage.get("a").await.unwrap(), None);
        assert_eq!(storage.keys_with(Some(false)).await.unwrap(), vec!["a".to_string()]);
        assert_eq!(
            storage
                .get_with(
                    "a",
                    GetOptions {
                        sync: Some(false),
                        ..Default::default()
                    },
                )
                .await
                .unwrap(),
            Some(DataType::from(1i64))
        );

        storage.clear_with(Some(false)).await.unwrap();
        assert!(storage.keys_with(Some(false)).await.unwrap().is_empty());
    }
}
