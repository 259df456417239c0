//! gRPC dial-in 텔레메트리 모듈
//!
//! 디바이스의 dial-in 구독 서비스(`CreateSubs`)에 접속해
//! 서버 스트리밍 응답을 `TelemetryStream`으로 노출한다.
//!
//! ```rust,ignore
//! let connector = GrpcDialInConnector::from_device(&device)?;
//! let mut stream = connector.open(&device.endpoint, &device.subscription()).await?;
//! while let Some(message) = stream.next_message().await? {
//!     // ...
//! }
//! ```

mod dial_in;
mod error_mapping;

pub use dial_in::{Credentials, GrpcDialInConnector, GrpcTelemetryStream};
pub use error_mapping::{map_grpc_status_error, StreamPhase};
