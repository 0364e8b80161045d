//! Storage Configuration
//!
//! 환경 변수(.env.local / .env 포함)에서 저장소 설정을 읽고
//! 시작 시점에 한 번 백엔드를 선택한다.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::db::LocalStorageProvider;
use crate::error::{CommandError, ProviderError};
use crate::keys::DEFAULT_KEY_PREFIX;
use crate::memory::MemoryProvider;
use crate::models::KeychainAccess;
use crate::provider::StorageProvider;
use crate::secrets::{KeychainProvider, DEFAULT_KEYCHAIN_SERVICE};
use crate::storage::StorageSettings;

pub const ENV_PREFIX: &str = "SECURE_STORAGE_PREFIX";
pub const ENV_SYNC: &str = "SECURE_STORAGE_SYNC";
pub const ENV_ACCESS: &str = "SECURE_STORAGE_ACCESS";
pub const ENV_BACKEND: &str = "SECURE_STORAGE_BACKEND";
pub const ENV_DB_PATH: &str = "SECURE_STORAGE_DB_PATH";
pub const ENV_SERVICE: &str = "SECURE_STORAGE_SERVICE";

/// 로컬 백엔드 기본 DB 파일
pub const DEFAULT_LOCAL_DB_PATH: &str = "secure-storage.db";

/// 설정 오류
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Failed to open backend: {0}")]
    Backend(#[from] ProviderError),
}

impl From<ConfigError> for CommandError {
    fn from(err: ConfigError) -> Self {
        CommandError {
            code: "CONFIG_ERROR".to_string(),
            message: format!("Secure store config error: {}", err),
            details: None,
        }
    }
}

/// 저장소 백엔드 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// 휘발성 메모리
    Memory,
    /// SQLite 로컬 파일 (localStorage 대응)
    Local,
    /// OS 키체인/키링
    Keychain,
}

impl BackendKind {
    /// 플랫폼 기본값: 모바일/macOS는 키체인, 그 외는 로컬 파일
    pub fn platform_default() -> Self {
        if cfg!(any(target_os = "ios", target_os = "android", target_os = "macos")) {
            BackendKind::Keychain
        } else {
            BackendKind::Local
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Local => "local",
            BackendKind::Keychain => "keychain",
        }
    }

    /// 설정에 맞는 백엔드 생성
    pub fn build_provider(
        self,
        config: &StorageConfig,
    ) -> Result<Arc<dyn StorageProvider>, ConfigError> {
        info!(backend = self.as_str(), "building storage provider");
        let provider: Arc<dyn StorageProvider> = match self {
            BackendKind::Memory => Arc::new(MemoryProvider::new()),
            BackendKind::Local => Arc::new(LocalStorageProvider::open(&config.local_db_path)?),
            BackendKind::Keychain => Arc::new(KeychainProvider::with_synchronize(
                config.keychain_service.clone(),
                config.synchronize,
            )),
        };
        Ok(provider)
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "local" | "web" => Ok(BackendKind::Local),
            "keychain" | "native" => Ok(BackendKind::Keychain),
            other => Err(format!("unknown backend: {}", other)),
        }
    }
}

/// 저장소 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub key_prefix: String,
    pub synchronize: bool,
    pub default_access: KeychainAccess,
    pub backend: BackendKind,
    pub local_db_path: PathBuf,
    pub keychain_service: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            synchronize: false,
            default_access: KeychainAccess::default(),
            backend: BackendKind::platform_default(),
            local_db_path: PathBuf::from(DEFAULT_LOCAL_DB_PATH),
            keychain_service: DEFAULT_KEYCHAIN_SERVICE.to_string(),
        }
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        }),
    }
}

impl StorageConfig {
    /// 프로세스 환경 변수에서 설정 읽기
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 임의의 조회 함수로 설정 읽기 (없는 값은 기본값)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // prefix는 빈 문자열도 유효 (네임스페이스 없음)
        if let Some(prefix) = lookup(ENV_PREFIX) {
            config.key_prefix = prefix;
        }
        if let Some(sync) = lookup(ENV_SYNC) {
            config.synchronize = parse_bool(ENV_SYNC, &sync)?;
        }
        if let Some(access) = lookup(ENV_ACCESS) {
            config.default_access =
                access.trim().parse::<KeychainAccess>().map_err(|_| ConfigError::InvalidValue {
                    name: ENV_ACCESS,
                    value: access.clone(),
                })?;
        }
        if let Some(backend) = lookup(ENV_BACKEND) {
            config.backend = backend.parse::<BackendKind>().map_err(|_| ConfigError::InvalidValue {
                name: ENV_BACKEND,
                value: backend.clone(),
            })?;
        }
        if let Some(path) = lookup(ENV_DB_PATH).filter(|p| !p.trim().is_empty()) {
            config.local_db_path = PathBuf::from(path);
        }
        if let Some(service) = lookup(ENV_SERVICE).filter(|s| !s.trim().is_empty()) {
            config.keychain_service = service;
        }

        debug!(backend = config.backend.as_str(), "storage config loaded");
        Ok(config)
    }

    /// 파사드 초기 설정
    pub fn settings(&self) -> StorageSettings {
        StorageSettings {
            prefix: self.key_prefix.clone(),
            sync: self.synchronize,
            access: self.default_access,
        }
    }
}

// =====================================
// .env 로딩
// =====================================

/// `.env.local` 탐색 시 거슬러 올라가는 최대 상위 디렉토리 수
const ENV_SEARCH_DEPTH: usize = 6;

const LOCAL_ENV_FILE: &str = ".env.local";

/// `KEY=VALUE` 한 줄을 (키, 값)으로 분해
///
/// 주석, 코드 펜스, 대문자 환경 변수 이름이 아닌 줄은 `None`.
fn parse_env_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with("```") {
        return None;
    }

    let line = line.strip_prefix("export ").map_or(line, str::trim_start);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let is_env_name = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_');
    is_env_name.then(|| (key, unquote(value.trim())))
}

/// 값 양끝의 같은 따옴표 한 쌍 제거
fn unquote(value: &str) -> &str {
    ['"', '\'']
        .into_iter()
        .find_map(|quote| value.strip_prefix(quote)?.strip_suffix(quote))
        .unwrap_or(value)
}

/// 파싱 가능한 줄만 환경에 반영. 비어 있지 않은 기존 값은 유지하며 반영한 변수 수 반환
fn apply_env_file_lenient(path: &Path) -> std::io::Result<usize> {
    let text = std::fs::read_to_string(path)?;
    let mut applied = 0usize;

    for (key, value) in text.lines().filter_map(parse_env_line) {
        let already_set = std::env::var(key).is_ok_and(|v| !v.trim().is_empty());
        if !already_set {
            std::env::set_var(key, value);
            applied += 1;
        }
    }

    Ok(applied)
}

/// `start`부터 상위로 `.env.local` 탐색
fn locate_local_env(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(ENV_SEARCH_DEPTH + 1)
        .map(|dir| dir.join(LOCAL_ENV_FILE))
        .find(|candidate| candidate.exists())
}

/// `.env.local`(CWD에서 상위로 탐색)과 `.env`를 프로세스 환경에 로드
///
/// 파일이 없거나 파싱에 실패해도 오류로 취급하지 않는다.
pub fn load_env() {
    let local = std::env::current_dir()
        .ok()
        .and_then(|cwd| locate_local_env(&cwd));
    if let Some(path) = local {
        // dotenvy가 거부한 파일은 줄 단위로 다시 읽는다
        if dotenvy::from_path(&path).is_err() {
            match apply_env_file_lenient(&path) {
                Ok(applied) => debug!(path = %path.display(), applied, "env loaded (lenient)"),
                Err(e) => debug!(path = %path.display(), error = %e, "env load failed"),
            }
        }
    }
    let _ = dotenvy::dotenv();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StorageConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, StorageConfig::default());
        assert_eq!(config.key_prefix, "capacitor-storage_");
        assert!(!config.synchronize);
        assert_eq!(config.default_access, KeychainAccess::WhenUnlocked);
    }

    #[test]
    fn test_values_from_lookup() {
        let config = StorageConfig::from_lookup(lookup_from(&[
            (ENV_PREFIX, ""),
            (ENV_SYNC, "true"),
            (ENV_ACCESS, "afterFirstUnlockThisDeviceOnly"),
            (ENV_BACKEND, "memory"),
            (ENV_DB_PATH, "/tmp/x.db"),
            (ENV_SERVICE, "com.example.app"),
        ]))
        .unwrap();

        assert_eq!(config.key_prefix, "");
        assert!(config.synchronize);
        assert_eq!(
            config.default_access,
            KeychainAccess::AfterFirstUnlockThisDeviceOnly
        );
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.local_db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.keychain_service, "com.example.app");

        let settings = config.settings();
        assert_eq!(settings.prefix, "");
        assert!(settings.sync);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for (name, value) in [(ENV_SYNC, "maybe"), (ENV_ACCESS, "always"), (ENV_BACKEND, "s3")] {
            let err = StorageConfig::from_lookup(lookup_from(&[(name, value)])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { name: n, .. } if n == name));
        }
    }

    #[test]
    fn test_backend_aliases() {
        assert_eq!("web".parse::<BackendKind>(), Ok(BackendKind::Local));
        assert_eq!("Native".parse::<BackendKind>(), Ok(BackendKind::Keychain));
    }

    #[test]
    fn test_build_local_provider_creates_db() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            backend: BackendKind::Local,
            local_db_path: dir.path().join("data").join("local.db"),
            ..Default::default()
        };
        let provider = config.backend.build_provider(&config).unwrap();
        assert_eq!(provider.name(), "local");
        assert!(config.local_db_path.exists());
    }

    #[test]
    fn test_parse_env_line() {
        assert_eq!(parse_env_line("SECURE_STORAGE_PREFIX=app_"), Some(("SECURE_STORAGE_PREFIX", "app_")));
        assert_eq!(parse_env_line("  export A_1 = 'quoted' "), Some(("A_1", "quoted")));
        assert_eq!(parse_env_line("B=\"x\""), Some(("B", "x")));
        assert_eq!(parse_env_line("C=\"unbalanced'"), Some(("C", "\"unbalanced'")));
        assert_eq!(parse_env_line("D=\""), Some(("D", "\"")));
        assert_eq!(parse_env_line("# comment"), None);
        assert_eq!(parse_env_line("```"), None);
        assert_eq!(parse_env_line("lower_case=1"), None);
        assert_eq!(parse_env_line("no equals sign"), None);
    }

    #[test]
    fn test_lenient_loader_keeps_existing_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(LOCAL_ENV_FILE);
        std::env::set_var("SECURE_STORAGE_TEST_LENIENT_KEEP", "original");
        std::fs::write(
            &path,
            "# comment\n```\nexport SECURE_STORAGE_TEST_LENIENT_A='quoted'\nnot a line\nlower_case=1\nSECURE_STORAGE_TEST_LENIENT_B = plain\nSECURE_STORAGE_TEST_LENIENT_KEEP=replaced\n",
        )
        .unwrap();

        let applied = apply_env_file_lenient(&path).unwrap();
        assert_eq!(applied, 2);
        assert_eq!(
            std::env::var("SECURE_STORAGE_TEST_LENIENT_A").unwrap(),
            "quoted"
        );
        assert_eq!(std::env::var("SECURE_STORAGE_TEST_LENIENT_B").unwrap(), "plain");
        assert_eq!(
            std::env::var("SECURE_STORAGE_TEST_LENIENT_KEEP").unwrap(),
            "original"
        );
    }

    #[test]
    fn test_locate_local_env_searches_ancestors() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(locate_local_env(&nested), None);

        std::fs::write(dir.path().join(LOCAL_ENV_FILE), "X=1\n").unwrap();
        assert_eq!(
            locate_local_env(&nested),
            Some(dir.path().join(LOCAL_ENV_FILE))
        );
    }

    #[test]
    fn test_keychain_backend_seeds_synchronize() {
        let config = StorageConfig {
            backend: BackendKind::Keychain,
            synchronize: true,
            ..Default::default()
        };
        let provider = config.backend.build_provider(&config).unwrap();
        assert_eq!(provider.name(), "keychain");
        assert!(provider.capabilities().sync_toggle);
    }
}
