//! 메트릭 싱크 포트.
//!
//! 구현: `telemon-network` crate (reqwest + InfluxDB 라인 프로토콜)

use async_trait::async_trait;

use crate::models::metric::{DeliveryOutcome, Metric};

/// 시계열 싱크 전송
///
/// 배치 단위로 전송하되 결과는 메트릭 단위로 돌려준다.
/// 전송 실패는 `DeliveryStatus::Failed`로만 표현하고 에러로 올리지 않는다.
/// 내부 재시도는 하지 않는다 (재시도 정책은 호출자 소유).
#[async_trait]
pub trait MetricSink: Send + Sync {
    async fn deliver(&self, metrics: &[Metric]) -> Vec<DeliveryOutcome>;
}
