//! Secure Storage Data Models
//!
//! 호출자에게 노출되는 값 타입과 키체인 접근 정책

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// 저장 가능한 값
///
/// `string | number | boolean | object | Date | null` 에 대응한다.
/// 배열은 object의 한 형태로 취급한다.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(Map<String, Value>),
    Date(DateTime<Utc>),
}

impl DataType {
    pub fn is_null(&self) -> bool {
        matches!(self, DataType::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataType::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            DataType::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// JSON 값으로 변환 (날짜는 그대로 `Value`로 표현할 수 없으므로 `None`)
    pub fn to_json(&self) -> Option<Value> {
        match self {
            DataType::Null => Some(Value::Null),
            DataType::Bool(b) => Some(Value::Bool(*b)),
            DataType::Number(n) => Some(Value::Number(n.clone())),
            DataType::String(s) => Some(Value::String(s.clone())),
            DataType::Array(items) => Some(Value::Array(items.clone())),
            DataType::Object(map) => Some(Value::Object(map.clone())),
            DataType::Date(_) => None,
        }
    }
}

impl From<Value> for DataType {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => DataType::Null,
            Value::Bool(b) => DataType::Bool(b),
            Value::Number(n) => DataType::Number(n),
            Value::String(s) => DataType::String(s),
            Value::Array(items) => DataType::Array(items),
            Value::Object(map) => DataType::Object(map),
        }
    }
}

impl From<&str> for DataType {
    fn from(value: &str) -> Self {
        DataType::String(value.to_string())
    }
}

impl From<String> for DataType {
    fn from(value: String) -> Self {
        DataType::String(value)
    }
}

impl From<bool> for DataType {
    fn from(value: bool) -> Self {
        DataType::Bool(value)
    }
}

impl From<i64> for DataType {
    fn from(value: i64) -> Self {
        DataType::Number(value.into())
    }
}

impl From<u64> for DataType {
    fn from(value: u64) -> Self {
        DataType::Number(value.into())
    }
}

/// 유한하지 않은 값(NaN, ±inf)은 JSON과 같이 `null`이 된다.
impl From<f64> for DataType {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(DataType::Null, DataType::Number)
    }
}

impl From<DateTime<Utc>> for DataType {
    fn from(value: DateTime<Utc>) -> Self {
        DataType::Date(value)
    }
}

impl<T: Into<DataType>> From<Option<T>> for DataType {
    fn from(value: Option<T>) -> Self {
        value.map_or(DataType::Null, Into::into)
    }
}

/// iOS 키체인 접근 정책
///
/// 저장된 항목을 기기 잠금 상태에 따라 언제 읽을 수 있는지 결정한다.
/// 보안 네이티브 백엔드에서만 의미가 있다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeychainAccess {
    /// 잠금 해제 상태에서만 접근, 암호화 백업으로 이전됨 (기본값)
    #[default]
    WhenUnlocked,
    /// 잠금 해제 상태에서만 접근, 기기 간 이전 안 됨
    WhenUnlockedThisDeviceOnly,
    /// 재시작 후 첫 잠금 해제 이후 접근, 백업으로 이전됨
    AfterFirstUnlock,
    /// 재시작 후 첫 잠금 해제 이후 접근, 기기 간 이전 안 됨
    AfterFirstUnlockThisDeviceOnly,
    /// 패스코드가 설정된 기기에서 잠금 해제 상태에서만 접근
    WhenPasscodeSetThisDeviceOnly,
}

impl KeychainAccess {
    pub const ALL: [KeychainAccess; 5] = [
        KeychainAccess::WhenUnlocked,
        KeychainAccess::WhenUnlockedThisDeviceOnly,
        KeychainAccess::AfterFirstUnlock,
        KeychainAccess::AfterFirstUnlockThisDeviceOnly,
        KeychainAccess::WhenPasscodeSetThisDeviceOnly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            KeychainAccess::WhenUnlocked => "whenUnlocked",
            KeychainAccess::WhenUnlockedThisDeviceOnly => "whenUnlockedThisDeviceOnly",
            KeychainAccess::AfterFirstUnlock => "afterFirstUnlock",
            KeychainAccess::AfterFirstUnlockThisDeviceOnly => "afterFirstUnlockThisDeviceOnly",
            KeychainAccess::WhenPasscodeSetThisDeviceOnly => "whenPasscodeSetThisDeviceOnly",
        }
    }

    /// 백업/동기화로 다른 기기에 이전될 수 없는 정책인지 여부
    pub fn is_this_device_only(self) -> bool {
        matches!(
            self,
            KeychainAccess::WhenUnlockedThisDeviceOnly
                | KeychainAccess::AfterFirstUnlockThisDeviceOnly
                | KeychainAccess::WhenPasscodeSetThisDeviceOnly
        )
    }
}

impl fmt::Display for KeychainAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeychainAccess {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|access| access.as_str() == s)
            .ok_or_else(|| format!("unknown keychain access: {}", s))
    }
}
