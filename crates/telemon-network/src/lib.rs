//! # telemon-network
//!
//! 네트워크 어댑터.
//! 디바이스 텔레메트리 구독(gRPC dial-in), GPB key-value 레코드 디코딩,
//! InfluxDB 라인 프로토콜 HTTP 싱크를 담당한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use telemon_network::decoder::GpbDecoder;
//! use telemon_network::grpc::GrpcDialInConnector;
//! use telemon_network::influx_sink::HttpLineProtocolSink;
//! ```

pub mod decoder;
pub mod grpc;
pub mod influx_sink;
pub mod line_protocol;
pub mod proto;
