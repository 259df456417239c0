//! 텔레메트리 스트림 커넥터 포트.
//!
//! 구현: `telemon-network` crate (tonic gRPC dial-in)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::telemetry::{SubscriptionSpec, TelemetryMessage};

/// 디바이스 텔레메트리 구독 수립
///
/// 재연결은 하지 않는다. 재시작 여부는 파이프라인 드라이버가 결정한다.
#[async_trait]
pub trait TelemetryConnector: Send + Sync {
    /// 엔드포인트에 구독을 열고 메시지 스트림을 반환
    ///
    /// 연결 자체가 실패하면 `CoreError::Connection`.
    async fn open(
        &self,
        endpoint: &str,
        subscription: &SubscriptionSpec,
    ) -> Result<Box<dyn TelemetryStream>, CoreError>;
}

/// 열린 구독의 메시지 스트림
///
/// 소비자가 다음 메시지를 요청할 때만 전송 계층에서 읽는다.
/// 내부에 메시지를 무한정 쌓아 두지 않는다.
#[async_trait]
pub trait TelemetryStream: Send {
    /// 다음 메시지 읽기
    ///
    /// - `Ok(Some(msg))`: 다음 메시지
    /// - `Ok(None)`: 스트림 정상 종료
    /// - `Err(CoreError::ConnectionLost)`: 연결 끊김
    async fn next_message(&mut self) -> Result<Option<TelemetryMessage>, CoreError>;
}
