//! TELEMON 핵심 에러 타입.
//!
//! 어댑터 crate는 전송/디코딩 실패를 이 타입으로 매핑해 포트 경계를 넘긴다.
//! 치명적인 에러는 생성 시점의 설정 오류와 명시적 종료뿐이며,
//! 나머지는 발생한 컴포넌트 경계에서 복구된다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류 (생성 시점에 치명적)
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패: {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 디바이스 연결 수립 실패 (Backoff 전이 트리거)
    #[error("연결 에러: {0}")]
    Connection(String),

    /// 스트리밍 중 연결 끊김
    #[error("연결 끊김: {0}")]
    ConnectionLost(String),

    /// 단일 메시지 디코딩 실패
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// 싱크 전송 실패
    #[error("전송 실패: {0}")]
    Delivery(String),

    /// 네트워크 에러 (연결 실패, 타임아웃)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl CoreError {
    /// 재연결로 복구 가능한 전송 계층 에러인지
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            CoreError::Connection(_) | CoreError::ConnectionLost(_) | CoreError::Network(_)
        )
    }
}

/// 레코드 디코딩 에러.
///
/// 메시지 하나에 국한되며, 파이프라인은 로그를 남기고 다음 메시지로 넘어간다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// 페이로드 형식 오류
    #[error("디코딩 실패: 잘못된 페이로드: {0}")]
    Malformed(String),

    /// 페이로드가 중간에 잘림
    #[error("디코딩 실패: 페이로드 잘림")]
    Truncated,

    /// 지원하지 않는 인코딩
    #[error("디코딩 실패: 지원하지 않는 인코딩: {0}")]
    UnsupportedEncoding(String),

    /// 레코드에 경로(encoding path)가 없음
    #[error("디코딩 실패: 경로 누락")]
    MissingPath,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_are_recoverable() {
        assert!(CoreError::Connection("refused".to_string()).is_connection_error());
        assert!(CoreError::ConnectionLost("reset".to_string()).is_connection_error());
        assert!(!CoreError::Config("no devices".to_string()).is_connection_error());
        assert!(!CoreError::Decode(DecodeError::Truncated).is_connection_error());
    }

    #[test]
    fn decode_error_converts_transparently() {
        let err: CoreError = DecodeError::MissingPath.into();
        assert_eq!(err.to_string(), DecodeError::MissingPath.to_string());
    }
}
