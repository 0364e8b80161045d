//! Secure Store Commands
//!
//! 프로세스 전역 저장소 인스턴스에 대한 명령 계층.
//! CLI와 호스트 바인딩이 같은 진입점을 사용한다.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec;
use crate::config::StorageConfig;
use crate::error::{CommandError, CommandResult};
use crate::models::{DataType, KeychainAccess};
use crate::storage::{GetOptions, SecureStorage, SetOptions};

/// 전역 저장소 인스턴스
static STORAGE: OnceCell<SecureStorage> = OnceCell::new();

fn already_initialized() -> CommandError {
    CommandError {
        code: "ALREADY_INITIALIZED".to_string(),
        message: "Secure store is already initialized.".to_string(),
        details: None,
    }
}

fn storage() -> CommandResult<&'static SecureStorage> {
    STORAGE.get().ok_or_else(|| CommandError {
        code: "NOT_INITIALIZED".to_string(),
        message: "Secure store is not initialized.".to_string(),
        details: None,
    })
}

/// 설정으로 전역 저장소 초기화 (1회)
pub fn init(config: &StorageConfig) -> CommandResult<&'static SecureStorage> {
    if STORAGE.get().is_some() {
        return Err(already_initialized());
    }
    let storage = SecureStorage::from_config(config)?;
    install(storage)
}

/// 이미 구성된 저장소를 전역 인스턴스로 등록 (1회)
pub fn install(instance: SecureStorage) -> CommandResult<&'static SecureStorage> {
    STORAGE.set(instance).map_err(|_| already_initialized())?;
    storage()
}

/// 명령 출력용 JSON (날짜는 ISO 문자열)
pub fn data_to_json(value: DataType) -> Value {
    match value {
        DataType::Date(date) => Value::String(codec::to_iso_string(&date)),
        other => other.to_json().unwrap_or(Value::Null),
    }
}

/// 저장 요청
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureSetArgs {
    pub key: String,
    pub value: Value,
    pub convert_date: Option<bool>,
    pub sync: Option<bool>,
    pub access: Option<KeychainAccess>,
}

/// 현재 설정 조회 결과
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureStoreInfo {
    pub provider: String,
    pub prefix: String,
    pub sync: bool,
    pub access: KeychainAccess,
}

pub async fn storage_get(
    key: String,
    convert_date: Option<bool>,
    sync: Option<bool>,
) -> CommandResult<Option<Value>> {
    let options = GetOptions {
        convert_date: convert_date.unwrap_or(true),
        sync,
    };
    let value = storage()?.get_with(&key, options).await?;
    Ok(value.map(data_to_json))
}

pub async fn storage_get_item(key: String) -> CommandResult<Option<String>> {
    Ok(storage()?.get_item(&key).await?)
}

pub async fn storage_set(args: SecureSetArgs) -> CommandResult<()> {
    let options = SetOptions {
        convert_date: args.convert_date.unwrap_or(true),
        sync: args.sync,
        access: args.access,
    };
    Ok(storage()?
        .set_with(&args.key, DataType::from(args.value), options)
        .await?)
}

pub async fn storage_set_item(key: String, value: String) -> CommandResult<()> {
    Ok(storage()?.set_item(&key, &value).await?)
}

pub async fn storage_remove(key: String, sync: Option<bool>) -> CommandResult<bool> {
    Ok(storage()?.remove_with(&key, sync).await?)
}

pub async fn storage_remove_item(key: String) -> CommandResult<()> {
    Ok(storage()?.remove_item(&key).await?)
}

pub async fn storage_keys(sync: Option<bool>) -> CommandResult<Vec<String>> {
    Ok(storage()?.keys_with(sync).await?)
}

pub async fn storage_clear(sync: Option<bool>) -> CommandResult<()> {
    Ok(storage()?.clear_with(sync).await?)
}

pub async fn storage_get_prefix() -> CommandResult<String> {
    Ok(storage()?.get_key_prefix().await)
}

pub async fn storage_set_prefix(prefix: String) -> CommandResult<()> {
    storage()?.set_key_prefix(prefix).await;
    Ok(())
}

pub async fn storage_set_synchronize(sync: bool) -> CommandResult<()> {
    Ok(storage()?.set_synchronize(sync).await?)
}

pub async fn storage_set_default_access(access: KeychainAccess) -> CommandResult<()> {
    storage()?.set_default_keychain_access(access).await;
    Ok(())
}

pub async fn storage_info() -> CommandResult<SecureStoreInfo> {
    let storage = storage()?;
    let settings = storage.settings().await;
    Ok(SecureStoreInfo {
        provider: storage.provider().name().to_string(),
        prefix: settings.prefix,
        sync: settings.sync,
        access: settings.access,
    })
}
