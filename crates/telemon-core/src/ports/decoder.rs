//! 레코드 디코더 포트.
//!
//! 구현: `telemon-network` crate (prost GPB key-value)

use crate::error::DecodeError;
use crate::models::telemetry::{TelemetryMessage, TelemetryRecord};

/// 바이너리 메시지 → 구조화 레코드
///
/// 부작용 없는 순수 함수여야 한다. 잘못된 입력은 panic이 아니라 `DecodeError`.
pub trait RecordDecoder: Send + Sync {
    fn decode(&self, message: &TelemetryMessage) -> Result<TelemetryRecord, DecodeError>;
}
