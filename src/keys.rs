//! Key Namespacer
//!
//! 논리 키 <-> 물리 키 변환. 물리 키 = prefix + 논리 키

/// 기본 키 prefix
pub const DEFAULT_KEY_PREFIX: &str = "capacitor-storage_";

/// 논리 키에 prefix를 붙여 물리 키 생성
pub fn prefixed_key(prefix: &str, key: &str) -> String {
    let mut physical = String::with_capacity(prefix.len() + key.len());
    physical.push_str(prefix);
    physical.push_str(key);
    physical
}

/// 물리 키 앞에서 prefix 길이만큼의 글자를 제거
///
/// prefix 일치 여부는 확인하지 않는 위치 기반 제거다.
/// 글자 단위로 자르므로 어떤 입력에서도 패닉하지 않는다.
pub fn strip_prefix(prefix: &str, physical_key: &str) -> String {
    let prefix_len = prefix.chars().count();
    match physical_key.char_indices().nth(prefix_len) {
        Some((idx, _)) => physical_key[idx..].to_string(),
        None => String::new(),
    }
}

/// 물리 키 목록을 논리 키 목록으로 변환
pub fn logical_keys(prefix: &str, physical_keys: Vec<String>) -> Vec<String> {
    physical_keys
        .iter()
        .map(|key| strip_prefix(prefix, key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_key() {
        assert_eq!(prefixed_key("app_", "token"), "app_token");
        assert_eq!(prefixed_key("", "token"), "token");
        assert_eq!(prefixed_key(DEFAULT_KEY_PREFIX, "x"), "capacitor-storage_x");
    }

    #[test]
    fn test_strip_is_positional() {
        assert_eq!(strip_prefix("app_", "app_token"), "token");
        // prefix가 달라도 길이만큼 제거
        assert_eq!(strip_prefix("abc_", "xyz_token"), "token");
        assert_eq!(strip_prefix("", "token"), "token");
        assert_eq!(strip_prefix("longprefix_", "short"), "");
    }

    #[test]
    fn test_strip_counts_characters() {
        assert_eq!(strip_prefix("키_", "키_값"), "값");
        assert_eq!(strip_prefix("ab", "가나다"), "다");
    }

    #[test]
    fn test_logical_keys() {
        let keys = logical_keys("p_", vec!["p_a".into(), "p_b".into()]);
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
