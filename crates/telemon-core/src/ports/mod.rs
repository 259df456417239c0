//! 포트 인터페이스 (trait).
//!
//! Hexagonal Architecture의 포트 레이어.
//! `telemon-network`가 이 trait들을 구현하며,
//! `telemon-pipeline`의 드라이버는 `Arc<dyn T>`로만 의존한다.
//!
//! async trait은 `async_trait` 매크로를 사용하여 object safety를 보장한다.

pub mod connector;
pub mod decoder;
pub mod sink;
