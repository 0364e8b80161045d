//! Secure Native 모듈
//!
//! OS 자격 증명 저장소(키체인/키링)를 사용하는 보안 백엔드
//!
//! - 레코드는 키체인 엔트리 하나에 하나씩 저장
//! - 키 목록과 접근 정책은 파티션별 인덱스 엔트리(`KeyIndex`)로 관리

pub mod index;
pub mod keychain;

pub use keychain::{KeychainProvider, DEFAULT_KEYCHAIN_SERVICE};
