//! TELEMON 도메인 모델.
//!
//! 커넥터 → 디코더 → 추출기 → 싱크로 흐르는 데이터 구조체를 정의한다.

pub mod metric;
pub mod telemetry;
