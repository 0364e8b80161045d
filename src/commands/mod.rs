//! Commands Module
//!
//! 호스트(CLI, 네이티브 바인딩)에서 호출 가능한 명령 정의

pub mod secure_store;
