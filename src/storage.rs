//! Storage Facade
//!
//! 공개 API(`get`/`set`/`remove`/`keys`/`clear` 및 raw 문자열 변형)를 제공하고
//! 키 네임스페이스, 값 코덱, 에러 분류를 조합해 주입된 백엔드에 위임한다.
//!
//! - prefix / sync / access 설정은 인스턴스 필드로 보관
//! - 각 연산 시작 시 설정을 복사해서 사용 (한 호출 안에서는 prefix가 바뀌지 않음)
//! - 값 캐시 없음: 모든 호출은 백엔드까지 도달

use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::codec;
use crate::config::{ConfigError, StorageConfig};
use crate::error::{Result, StorageError};
use crate::keys::{self, DEFAULT_KEY_PREFIX};
use crate::models::{DataType, KeychainAccess};
use crate::provider::{
    GetItemRequest, PrefixRequest, RemoveItemRequest, SetItemRequest, StorageProvider,
};

/// 프로세스 단위 저장소 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// 물리 키 prefix (빈 문자열이면 네임스페이스 없음)
    pub prefix: String,
    /// 기기 간 동기화 기본값
    pub sync: bool,
    /// 쓰기 시 기본 접근 정책
    pub access: KeychainAccess,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            sync: false,
            access: KeychainAccess::default(),
        }
    }
}

/// `get` 호출 옵션
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetOptions {
    /// ISO 날짜 패턴을 날짜 값으로 변환할지 여부 (기본 `true`)
    pub convert_date: bool,
    /// 호출 단위 sync 재정의
    pub sync: Option<bool>,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            convert_date: true,
            sync: None,
        }
    }
}

/// `set` 호출 옵션
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetOptions {
    /// 날짜 값을 ISO 문자열로 변환할지 여부 (기본 `true`)
    pub convert_date: bool,
    /// 호출 단위 sync 재정의
    pub sync: Option<bool>,
    /// 호출 단위 접근 정책 재정의
    pub access: Option<KeychainAccess>,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            convert_date: true,
            sync: None,
            access: None,
        }
    }
}

fn require_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StorageError::missing_key().into());
    }
    Ok(())
}

/// 저장소 파사드
pub struct SecureStorage {
    provider: Arc<dyn StorageProvider>,
    settings: RwLock<StorageSettings>,
}

impl fmt::Debug for SecureStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureStorage")
            .field("provider", &self.provider.name())
            .finish_non_exhaustive()
    }
}

impl SecureStorage {
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self::with_settings(provider, StorageSettings::default())
    }

    pub fn with_settings(provider: Arc<dyn StorageProvider>, settings: StorageSettings) -> Self {
        info!(
            provider = provider.name(),
            prefix = %settings.prefix,
            sync = settings.sync,
            "secure storage created"
        );
        Self {
            provider,
            settings: RwLock::new(settings),
        }
    }

    /// 설정에 맞는 백엔드를 만들고 prefix/sync/access를 설정값으로 초기화
    pub fn from_config(config: &StorageConfig) -> Result<Self, ConfigError> {
        let provider = config.backend.build_provider(config)?;
        Ok(Self::with_settings(provider, config.settings()))
    }

    pub fn provider(&self) -> &Arc<dyn StorageProvider> {
        &self.provider
    }

    /// 현재 설정 복사본
    pub async fn settings(&self) -> StorageSettings {
        self.settings.read().await.clone()
    }

    // =====================================
    // 설정
    // =====================================

    /// 키 prefix 변경. 기존 레코드는 옮기지 않는다.
    pub async fn set_key_prefix(&self, prefix: impl Into<String>) {
        let prefix = prefix.into();
        info!(prefix = %prefix, "key prefix changed");
        self.settings.write().await.prefix = prefix;
    }

    pub async fn get_key_prefix(&self) -> String {
        self.settings.read().await.prefix.clone()
    }

    /// 동기화 기본값 변경. 백엔드가 지원하면 실시간 동기화 설정도 전달한다.
    pub async fn set_synchronize(&self, sync: bool) -> Result<()> {
        self.settings.write().await.sync = sync;
        if self.provider.capabilities().sync_toggle {
            self.provider.set_synchronize_keychain(sync).await?;
        }
        Ok(())
    }

    pub async fn get_synchronize(&self) -> bool {
        self.settings.read().await.sync
    }

    /// 쓰기 기본 접근 정책 변경 (기록만 하고 강제하지 않음)
    pub async fn set_default_keychain_access(&self, access: KeychainAccess) {
        self.settings.write().await.access = access;
    }

    pub async fn get_default_keychain_access(&self) -> KeychainAccess {
        self.settings.read().await.access
    }

    // =====================================
    // 읽기
    // =====================================

    pub async fn get(&self, key: &str) -> Result<Option<DataType>> {
        self.get_with(key, GetOptions::default()).await
    }

    /// 값 조회. 레코드가 없으면 `None`, 디코딩 실패는 `InvalidData`
    pub async fn get_with(&self, key: &str, options: GetOptions) -> Result<Option<DataType>> {
        require_key(key)?;
        let settings = self.settings().await;
        let sync = options.sync.unwrap_or(settings.sync);
        debug!(key, sync, "get");

        let response = self
            .provider
            .internal_get_item(GetItemRequest {
                prefixed_key: keys::prefixed_key(&settings.prefix, key),
                sync,
            })
            .await?;

        match response.data {
            None => Ok(None),
            Some(data) => Ok(Some(codec::decode(&data, options.convert_date)?)),
        }
    }

    /// 저장된 문자열을 디코딩하지 않고 그대로 조회
    pub async fn get_item(&self, key: &str) -> Result<Option<String>> {
        require_key(key)?;
        let settings = self.settings().await;
        debug!(key, "get_item");

        let response = self
            .provider
            .internal_get_item(GetItemRequest {
                prefixed_key: keys::prefixed_key(&settings.prefix, key),
                sync: settings.sync,
            })
            .await?;
        Ok(response.data)
    }

    // =====================================
    // 쓰기
    // =====================================

    pub async fn set(&self, key: &str, value: impl Into<DataType>) -> Result<()> {
        self.set_with(key, value, SetOptions::default()).await
    }

    /// 값 인코딩 후 저장
    pub async fn set_with(
        &self,
        key: &str,
        value: impl Into<DataType>,
        options: SetOptions,
    ) -> Result<()> {
        require_key(key)?;
        let value = match value.into() {
            DataType::Date(date) if options.convert_date => {
                DataType::String(codec::to_iso_string(&date))
            }
            other => other,
        };

        let settings = self.settings().await;
        let sync = options.sync.unwrap_or(settings.sync);
        let access = options.access.unwrap_or(settings.access);
        debug!(key, sync, access = %access, "set");

        self.provider
            .internal_set_item(SetItemRequest {
                prefixed_key: keys::prefixed_key(&settings.prefix, key),
                data: codec::encode(&value),
                sync,
                access,
            })
            .await?;
        Ok(())
    }

    /// 문자열을 인코딩 없이 그대로 저장
    pub async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        require_key(key)?;
        let settings = self.settings().await;
        debug!(key, "set_item");

        self.provider
            .internal_set_item(SetItemRequest {
                prefixed_key: keys::prefixed_key(&settings.prefix, key),
                data: value.to_string(),
                sync: settings.sync,
                access: settings.access,
            })
            .await?;
        Ok(())
    }

    // =====================================
    // 삭제
    // =====================================

    pub async fn remove(&self, key: &str) -> Result<bool> {
        self.remove_with(key, None).await
    }

    /// 레코드 삭제. 직전에 레코드가 있었으면 `true`
    pub async fn remove_with(&self, key: &str, sync: Option<bool>) -> Result<bool> {
        require_key(key)?;
        let settings = self.settings().await;
        let sync = sync.unwrap_or(settings.sync);
        debug!(key, sync, "remove");

        let response = self
            .provider
            .internal_remove_item(RemoveItemRequest {
                prefixed_key: keys::prefixed_key(&settings.prefix, key),
                sync,
            })
            .await?;
        Ok(response.success)
    }

    /// `remove`와 같은 삭제지만 존재 여부는 버린다.
    pub async fn remove_item(&self, key: &str) -> Result<()> {
        require_key(key)?;
        let settings = self.settings().await;
        debug!(key, "remove_item");

        self.provider
            .internal_remove_item(RemoveItemRequest {
                prefixed_key: keys::prefixed_key(&settings.prefix, key),
                sync: settings.sync,
            })
            .await?;
        Ok(())
    }

    // =====================================
    // prefix 단위 연산
    // =====================================

    pub async fn keys(&self) -> Result<Vec<String>> {
        self.keys_with(None).await
    }

    /// 현재 prefix의 논리 키 목록
    pub async fn keys_with(&self, sync: Option<bool>) -> Result<Vec<String>> {
        let settings = self.settings().await;
        let sync = sync.unwrap_or(settings.sync);

        let response = self
            .provider
            .get_prefixed_keys(PrefixRequest {
                prefix: settings.prefix.clone(),
                sync,
            })
            .await?;
        Ok(keys::logical_keys(&settings.prefix, response.keys))
    }

    pub async fn clear(&self) -> Result<()> {
        self.clear_with(None).await
    }

    /// 현재 prefix의 모든 레코드 삭제
    ///
    /// 원자적 삭제가 없는 백엔드는 키 목록 조회 후 순차 삭제하며,
    /// 중간 실패 시 이미 지운 레코드는 되돌리지 않는다.
    pub async fn clear_with(&self, sync: Option<bool>) -> Result<()> {
        let settings = self.settings().await;
        let sync = sync.unwrap_or(settings.sync);
        let request = PrefixRequest {
            prefix: settings.prefix,
            sync,
        };

        if self.provider.capabilities().atomic_clear {
            debug!(prefix = %request.prefix, sync, "clear");
            self.provider.clear_items_with_prefix(request).await?;
            return Ok(());
        }

        warn!(
            provider = self.provider.name(),
            "no atomic prefix clear, removing keys one by one"
        );
        let response = self.provider.get_prefixed_keys(request).await?;
        for prefixed_key in response.keys {
            self.provider
                .internal_remove_item(RemoveItemRequest { prefixed_key, sync })
                .await?;
        }
        Ok(())
    }
}
