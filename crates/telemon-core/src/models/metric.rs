//! 메트릭 및 전송 결과 모델.
//!
//! `Metric`은 싱크 경계를 넘는 유일한 엔티티다. 생성 후 변경하지 않는다.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 메트릭 필드 값 (숫자만)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Integer(i64),
    Float(f64),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            MetricValue::Integer(v) => *v as f64,
            MetricValue::Float(v) => *v,
        }
    }

    /// 라인 프로토콜로 표현 가능한 값인지 (NaN/inf 제외)
    pub fn is_finite(&self) -> bool {
        match self {
            MetricValue::Integer(_) => true,
            MetricValue::Float(v) => v.is_finite(),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Integer(v) => write!(f, "{v}"),
            MetricValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// 추출된 메트릭 한 건 (라인 프로토콜 한 줄)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// measurement 이름 (예: "interface_stats")
    pub name: String,
    /// 레이블 (태그). 키 정렬 순서로 직렬화된다.
    pub labels: BTreeMap<String, String>,
    /// 값 필드. 추출 규칙에 정의된 순서를 유지한다.
    pub fields: Vec<(String, MetricValue)>,
    /// epoch 기준 나노초
    pub timestamp: u64,
    /// 프로듀서 타임스탬프가 없어 로컬 수집 시각으로 대체했는지
    pub timestamp_is_local: bool,
}

impl Metric {
    /// 이름으로 필드 값 조회
    pub fn field(&self, name: &str) -> Option<MetricValue> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value)
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }
}

/// 메트릭 단위 전송 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    Failed(String),
}

/// 전송 시도 한 번의 메트릭별 결과. 저장되지 않는다.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    pub metric: Metric,
    pub status: DeliveryStatus,
}

impl DeliveryOutcome {
    pub fn delivered(metric: Metric) -> Self {
        Self {
            metric,
            status: DeliveryStatus::Delivered,
        }
    }

    pub fn failed(metric: Metric, reason: impl Into<String>) -> Self {
        Self {
            metric,
            status: DeliveryStatus::Failed(reason.into()),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self.status, DeliveryStatus::Delivered)
    }

    /// 실패 사유 (성공이면 None)
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.status {
            DeliveryStatus::Delivered => None,
            DeliveryStatus::Failed(reason) => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metric() -> Metric {
        Metric {
            name: "interface_stats".to_string(),
            labels: BTreeMap::from([("interface_name".to_string(), "Gi0/1".to_string())]),
            fields: vec![
                ("ifInOctets".to_string(), MetricValue::Integer(1000)),
                ("ifOutOctets".to_string(), MetricValue::Integer(2000)),
            ],
            timestamp: 1_700_000_000_000_000_000,
            timestamp_is_local: false,
        }
    }

    #[test]
    fn field_and_label_lookup() {
        let metric = sample_metric();
        assert_eq!(metric.field("ifOutOctets"), Some(MetricValue::Integer(2000)));
        assert_eq!(metric.field("ifErrors"), None);
        assert_eq!(metric.label("interface_name"), Some("Gi0/1"));
    }

    #[test]
    fn outcome_status_helpers() {
        let ok = DeliveryOutcome::delivered(sample_metric());
        assert!(ok.is_delivered());
        assert_eq!(ok.failure_reason(), None);

        let failed = DeliveryOutcome::failed(sample_metric(), "HTTP 500");
        assert!(!failed.is_delivered());
        assert_eq!(failed.failure_reason(), Some("HTTP 500"));
    }

    #[test]
    fn non_finite_float_is_flagged() {
        assert!(MetricValue::Integer(0).is_finite());
        assert!(!MetricValue::Float(f64::NAN).is_finite());
        assert!(!MetricValue::Float(f64::INFINITY).is_finite());
    }
}
