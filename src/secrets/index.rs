//! Keychain 키 인덱스
//!
//! OS 자격 증명 저장소는 서비스 단위 열거를 지원하지 않으므로,
//! 파티션(서비스)마다 예약된 엔트리 하나에 물리 키 목록과
//! 각 레코드가 기록될 때의 접근 정책을 JSON으로 보관한다.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};
use crate::models::KeychainAccess;

/// 인덱스 엔트리의 계정 이름 (레코드 키로 사용할 수 없음)
pub const INDEX_ACCOUNT: &str = "__secure_storage_index__";

/// 인덱스 페이로드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyIndex {
    /// 물리 키 -> 기록 시 접근 정책
    pub items: BTreeMap<String, KeychainAccess>,
    /// 페이로드 버전 (향후 마이그레이션용)
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

impl Default for KeyIndex {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
            version: default_version(),
        }
    }
}

impl KeyIndex {
    pub fn from_json(text: &str) -> ProviderResult<Self> {
        serde_json::from_str(text).map_err(|e| {
            ProviderError::unknown("Corrupted keychain index").details(e.to_string())
        })
    }

    pub fn to_json(&self) -> ProviderResult<String> {
        serde_json::to_string(self)
            .map_err(|e| ProviderError::unknown(format!("Failed to encode keychain index: {}", e)))
    }

    /// 키 추가/갱신. 내용이 바뀌었으면 `true`
    pub fn insert(&mut self, key: &str, access: KeychainAccess) -> bool {
        self.items.insert(key.to_string(), access) != Some(access)
    }

    /// 키 제거. 있었으면 `true`
    pub fn remove(&mut self, key: &str) -> bool {
        self.items.remove(key).is_some()
    }

    pub fn access(&self, key: &str) -> Option<KeychainAccess> {
        self.items.get(key).copied()
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.items
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
