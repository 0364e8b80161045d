//! Local Storage Schema
//!
//! SQLite 테이블 스키마 정의

/// 로컬 저장소 스키마 생성 SQL
pub const CREATE_SCHEMA: &str = r#"
-- 키-값 테이블 (브라우저 localStorage 대응)
CREATE TABLE IF NOT EXISTS local_storage (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);
"#;
