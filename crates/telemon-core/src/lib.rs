//! # telemon-core
//!
//! TELEMON 도메인 모델, 포트(trait) 정의, 에러 타입.
//! 모든 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`]: 텔레메트리 메시지/레코드, 메트릭, 전송 결과
//! - [`ports`]: Hexagonal Architecture 포트 인터페이스 (async_trait)
//! - [`error`]: 핵심 에러 타입 (thiserror)
//! - [`config`]: 파이프라인 설정 구조체 + 검증

pub mod config;
pub mod error;
pub mod models;
pub mod ports;
