//! 취소 가능한 스트림 읽기.
//!
//! 읽기 한 번의 결과는 메시지, 유휴(타임아웃), 스트림 종료, 취소 중 하나다.
//! 종료 신호는 읽기 대기 중에도 즉시 관측된다.

use std::time::Duration;
use telemon_core::error::CoreError;
use telemon_core::models::telemetry::TelemetryMessage;
use telemon_core::ports::connector::TelemetryStream;
use tokio::sync::watch;

/// 읽기 한 번의 결과
#[derive(Debug)]
pub enum ReadOutcome {
    Message(TelemetryMessage),
    /// 타임아웃 안에 메시지 없음 (종료 신호 재확인 후 다시 읽는다)
    Idle,
    /// 스트림 종료 또는 연결 끊김
    EndOfStream(CoreError),
    /// 종료 요청
    Cancelled,
}

/// 종료 요청 여부 (송신 측이 사라진 경우도 종료로 본다)
pub fn shutdown_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow() || shutdown.has_changed().is_err()
}

/// 종료 신호가 올 때까지 대기
pub async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// 다음 메시지 읽기
///
/// `read_timeout`이 지나면 `Idle`을 돌려주므로 호출자는 루프 상단에서
/// 종료 여부를 다시 확인할 수 있다.
pub async fn read_next(
    stream: &mut dyn TelemetryStream,
    shutdown: &mut watch::Receiver<bool>,
    read_timeout: Duration,
) -> ReadOutcome {
    if shutdown_requested(shutdown) {
        return ReadOutcome::Cancelled;
    }

    tokio::select! {
        biased;
        _ = wait_for_shutdown(shutdown) => ReadOutcome::Cancelled,
        result = tokio::time::timeout(read_timeout, stream.next_message()) => match result {
            Err(_) => ReadOutcome::Idle,
            Ok(Ok(Some(message))) => ReadOutcome::Message(message),
            Ok(Ok(None)) => ReadOutcome::EndOfStream(CoreError::ConnectionLost(
                "스트림 종료".to_string(),
            )),
            Ok(Err(e)) => ReadOutcome::EndOfStream(e),
        },
    }
}
