//! Backend Operation Provider
//!
//! 물리 저장소 하나에 대한 6개 기본 연산 계약. 저장소 파사드는 이 트레이트에만
//! 의존하며 구체 백엔드는 생성 시점에 주입된다.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};
use crate::models::KeychainAccess;

/// `internalGetItem` 요청
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetItemRequest {
    pub prefixed_key: String,
    pub sync: bool,
}

/// `internalGetItem` 응답 (`data`가 `None`이면 레코드 없음)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetItemResponse {
    pub data: Option<String>,
}

/// `internalSetItem` 요청
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetItemRequest {
    pub prefixed_key: String,
    pub data: String,
    pub sync: bool,
    pub access: KeychainAccess,
}

/// `internalRemoveItem` 요청
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemRequest {
    pub prefixed_key: String,
    pub sync: bool,
}

/// `internalRemoveItem` 응답 (레코드가 있었고 삭제되었으면 `true`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemoveItemResponse {
    pub success: bool,
}

/// `clearItemsWithPrefix` / `getPrefixedKeys` 요청
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixRequest {
    pub prefix: String,
    pub sync: bool,
}

/// `getPrefixedKeys` 응답 (물리 키 목록)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrefixedKeysResponse {
    pub keys: Vec<String>,
}

/// 백엔드가 지원하는 선택 기능
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProviderCapabilities {
    /// `set_synchronize_keychain`으로 실시간 동기화 설정을 바꿀 수 있음
    pub sync_toggle: bool,
    /// `clear_items_with_prefix`를 원자적 기본 연산으로 제공함
    pub atomic_clear: bool,
}

/// 저장소 백엔드 계약
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// 로그용 백엔드 이름
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::default()
    }

    /// 백엔드 수준 기기 간 동기화 on/off. 지원하지 않으면 no-op
    async fn set_synchronize_keychain(&self, _sync: bool) -> ProviderResult<()> {
        Ok(())
    }

    async fn internal_get_item(&self, request: GetItemRequest) -> ProviderResult<GetItemResponse>;

    async fn internal_set_item(&self, request: SetItemRequest) -> ProviderResult<()>;

    async fn internal_remove_item(
        &self,
        request: RemoveItemRequest,
    ) -> ProviderResult<RemoveItemResponse>;

    /// prefix로 시작하는 모든 레코드 삭제
    ///
    /// 원자적 기본 연산이 없는 백엔드는 구현하지 않아도 된다.
    /// 파사드는 `capabilities().atomic_clear`가 거짓이면 `keys()` + 개별 삭제로 대신한다.
    async fn clear_items_with_prefix(&self, _request: PrefixRequest) -> ProviderResult<()> {
        Err(ProviderError::uncoded("clearItemsWithPrefix is native only"))
    }

    async fn get_prefixed_keys(&self, request: PrefixRequest) -> ProviderResult<PrefixedKeysResponse>;
}
