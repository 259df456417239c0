//! gRPC `Status` → `CoreError` 변환 (구독 단계/스트림 단계 구분).

use telemon_core::error::CoreError;
use tonic::{Code, Status};

/// 오류가 발생한 시점
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// 구독 요청 (스트림 수립 전)
    Subscribe,
    /// 수신 중 (스트림 수립 후)
    Stream,
}

/// gRPC 상태 → `CoreError`
///
/// 구독 단계 오류는 `Connection`, 수신 중 오류는 `ConnectionLost`로 매핑된다.
/// 둘 다 드라이버에서 백오프 대상이며 메시지만 코드별로 구분한다.
pub fn map_grpc_status_error(operation: &str, status: Status, phase: StreamPhase) -> CoreError {
    let code = status.code();
    let message = status.message();

    let detail = match code {
        Code::Unauthenticated | Code::PermissionDenied => {
            format!("{operation}: 인증 거부: {message}")
        }
        Code::NotFound | Code::InvalidArgument | Code::FailedPrecondition => {
            format!("{operation}: 구독 거부: {message} ({code})")
        }
        Code::Ok => format!("{operation}: 스트림 종료"),
        _ => format!("{operation}: {message} ({code})"),
    };

    match phase {
        StreamPhase::Subscribe => CoreError::Connection(detail),
        StreamPhase::Stream => CoreError::ConnectionLost(detail),
    }
}
