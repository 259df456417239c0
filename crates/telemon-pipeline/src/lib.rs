//! # telemon-pipeline
//!
//! 디바이스 구독 하나당 파이프라인 한 개.
//! 커넥터 → 디코더 → 추출기 → 싱크를 `PipelineDriver` 상태 머신이 구동한다.
//!
//! ```text
//! Idle → Connecting → Streaming → Backoff → (Connecting | Terminated)
//! ```

pub mod backoff;
pub mod driver;
pub mod extractor;
pub mod reader;
pub mod rules;
pub mod stats;
