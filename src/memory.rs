//! Memory Provider
//!
//! 프로세스 메모리에만 존재하는 휘발성 백엔드. 테스트와 임시 세션용.
//! sync/access 인자는 무시한다.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::ProviderResult;
use crate::provider::{
    GetItemRequest, GetItemResponse, PrefixRequest, PrefixedKeysResponse, ProviderCapabilities,
    RemoveItemRequest, RemoveItemResponse, SetItemRequest, StorageProvider,
};

/// 휘발성 키-값 백엔드
#[derive(Debug, Default)]
pub struct MemoryProvider {
    records: RwLock<BTreeMap<String, String>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 물리 레코드 수
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl StorageProvider for MemoryProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            sync_toggle: false,
            atomic_clear: true,
        }
    }

    async fn internal_get_item(&self, request: GetItemRequest) -> ProviderResult<GetItemResponse> {
        let records = self.records.read().await;
        Ok(GetItemResponse {
            data: records.get(&request.prefixed_key).cloned(),
        })
    }

    async fn internal_set_item(&self, request: SetItemRequest) -> ProviderResult<()> {
        self.records
            .write()
            .await
            .insert(request.prefixed_key, request.data);
        Ok(())
    }

    async fn internal_remove_item(
        &self,
        request: RemoveItemRequest,
    ) -> ProviderResult<RemoveItemResponse> {
        let removed = self.records.write().await.remove(&request.prefixed_key);
        Ok(RemoveItemResponse {
            success: removed.is_some(),
        })
    }

    async fn clear_items_with_prefix(&self, request: PrefixRequest) -> ProviderResult<()> {
        self.records
            .write()
            .await
            .retain(|key, _| !key.starts_with(&request.prefix));
        Ok(())
    }

    async fn get_prefixed_keys(&self, request: PrefixRequest) -> ProviderResult<PrefixedKeysResponse> {
        let records = self.records.read().await;
        Ok(PrefixedKeysResponse {
            keys: records
                .keys()
                .filter(|key| key.starts_with(&request.prefix))
                .cloned()
                .collect(),
        })
    }
}
