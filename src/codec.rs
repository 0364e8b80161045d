//! Value Codec
//!
//! 호출자에게 보이는 `DataType` 값과 백엔드가 저장하는 문자열 사이의 변환
//!
//! - 인코딩: JSON 직렬화. 날짜는 밀리초 정밀도 + `Z` 접미사의 ISO-8601 문자열로
//!   바꾼 뒤 따옴표 포함 JSON 문자열로 저장
//! - 디코딩: `"YYYY-MM-DDTHH:mm:ss.sssZ"` 패턴(따옴표 포함)이면 날짜로,
//!   아니면 일반 JSON 파싱. 파싱 실패는 항상 `InvalidData`

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

use crate::error::StorageError;
use crate::models::DataType;

/// 따옴표를 포함한 ISO 날짜 문자열 길이
const QUOTED_ISO_DATE_LEN: usize = 26;

/// 날짜를 ISO-8601 (밀리초, UTC `Z`) 문자열로 변환
pub fn to_iso_string(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 값을 저장용 문자열로 인코딩
///
/// 날짜는 `convert_date` 여부와 관계없이 ISO 문자열로 직렬화된다.
pub fn encode(value: &DataType) -> String {
    let json = match value {
        DataType::Date(date) => Value::String(to_iso_string(date)),
        other => other.to_json().unwrap_or(Value::Null),
    };
    json.to_string()
}

/// 저장된 문자열을 값으로 디코딩
pub fn decode(data: &str, convert_date: bool) -> Result<DataType, StorageError> {
    if convert_date {
        if let Some(date) = parse_iso_date(data) {
            return Ok(DataType::Date(date));
        }
    }

    serde_json::from_str::<Value>(data)
        .map(DataType::from)
        .map_err(|_| StorageError::invalid_data())
}

/// `"YYYY-MM-DDTHH:mm:ss.sssZ"` (따옴표 포함) 패턴이면 UTC 날짜로 변환
///
/// 초와 밀리초 사이 구분자는 줄바꿈이 아닌 임의의 한 글자를 허용한다.
/// 범위를 벗어난 필드(예: 13월, 32일)는 다음 단위로 넘어간다.
pub fn parse_iso_date(data: &str) -> Option<DateTime<Utc>> {
    let chars: Vec<char> = data.chars().collect();
    if chars.len() != QUOTED_ISO_DATE_LEN {
        return None;
    }

    let literal = |idx: usize, expected: char| chars[idx] == expected;
    let structure_ok = literal(0, '"')
        && literal(5, '-')
        && literal(8, '-')
        && literal(11, 'T')
        && literal(14, ':')
        && literal(17, ':')
        && !matches!(chars[20], '\n' | '\r' | '\u{2028}' | '\u{2029}')
        && literal(24, 'Z')
        && literal(25, '"');
    if !structure_ok {
        return None;
    }

    let field = |start: usize, len: usize| -> Option<i64> {
        chars[start..start + len]
            .iter()
            .try_fold(0i64, |acc, c| c.to_digit(10).map(|d| acc * 10 + i64::from(d)))
    };

    let year = field(1, 4)?;
    let month = field(6, 2)? - 1; // 0-based
    let day = field(9, 2)?;
    let hour = field(12, 2)?;
    let minute = field(15, 2)?;
    let second = field(18, 2)?;
    let millis = field(21, 3)?;

    utc_from_fields(year, month, day, hour, minute, second, millis)
}

fn utc_from_fields(
    year: i64,
    month0: i64,
    day: i64,
    hour: i64,
    minute: i64,
    second: i64,
    millis: i64,
) -> Option<DateTime<Utc>> {
    // month0 < 0 는 "00" 월: 전년도 12월
    let year = year + month0.div_euclid(12);
    let month = u32::try_from(month0.rem_euclid(12) + 1).ok()?;
    let first_of_month = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, 1)?;

    let offset = Duration::days(day - 1)
        + Duration::hours(hour)
        + Duration::minutes(minute)
        + Duration::seconds(second)
        + Duration::milliseconds(millis);

    let naive = first_of_month
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(offset)?;
    Some(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, ms: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap() + Duration::milliseconds(ms as i64)
    }

    #[test]
    fn test_encode_number_and_string() {
        assert_eq!(encode(&DataType::from(42i64)), "42");
        assert_eq!(encode(&DataType::from("hi")), "\"hi\"");
        assert_eq!(encode(&DataType::Null), "null");
        assert_eq!(encode(&DataType::from(json!({"a": [1, true]}))), r#"{"a":[1,true]}"#);
    }

    #[test]
    fn test_encode_date_as_quoted_iso() {
        let date = utc(2024, 1, 15, 10, 30, 0, 500);
        assert_eq!(encode(&DataType::Date(date)), "\"2024-01-15T10:30:00.500Z\"");
    }

    #[test]
    fn test_decode_date_when_converting() {
        let decoded = decode("\"2024-01-15T10:30:00.500Z\"", true).unwrap();
        assert_eq!(decoded, DataType::Date(utc(2024, 1, 15, 10, 30, 0, 500)));
    }

    #[test]
    fn test_decode_date_as_string_without_conversion() {
        let decoded = decode("\"2024-01-15T10:30:00.500Z\"", false).unwrap();
        assert_eq!(decoded, DataType::from("2024-01-15T10:30:00.500Z"));
    }

    #[test]
    fn test_pattern_requires_quotes_and_millis() {
        assert!(parse_iso_date("2024-01-15T10:30:00.500Z").is_none());
        assert!(parse_iso_date("\"2024-01-15T10:30:00Z\"").is_none());
        assert!(parse_iso_date("\"2024-01-15T10:30:00.500+00:00\"").is_none());
        assert!(parse_iso_date("\"2024-01-15 10:30:00.500Z\"").is_none());
        assert!(parse_iso_date("\"2024-01-15T10:30:00,500Z\"").is_some());
    }

    #[test]
    fn test_out_of_range_fields_roll_over() {
        assert_eq!(
            parse_iso_date("\"2024-13-01T00:00:00.000Z\""),
            Some(utc(2025, 1, 1, 0, 0, 0, 0))
        );
        assert_eq!(
            parse_iso_date("\"2024-02-30T00:00:00.000Z\""),
            Some(utc(2024, 3, 1, 0, 0, 0, 0))
        );
        assert_eq!(
            parse_iso_date("\"2024-00-15T00:00:00.000Z\""),
            Some(utc(2023, 12, 15, 0, 0, 0, 0))
        );
    }

    #[test]
    fn test_invalid_text_is_invalid_data() {
        for bad in ["", "not json", "{\"a\":", "'single'", "undefined"] {
            let err = decode(bad, true).unwrap_err();
            assert_eq!(err, StorageError::invalid_data());
        }
    }

    #[test]
    fn test_non_ascii_input_never_panics() {
        assert!(parse_iso_date("\"２０２４-01-15T10:30:00.500Z\"").is_none());
        assert!(decode("\"한국어\"", true).is_ok());
    }
}
