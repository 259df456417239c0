//! 메트릭 추출기.
//!
//! 레코드 경로에 처음 일치하는 규칙으로 행마다 메트릭 하나를 만든다.
//! 일치 규칙이 없거나 필드가 빠진 경우는 에러가 아니며 카운터로만 남는다.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use telemon_core::models::metric::{Metric, MetricValue};
use telemon_core::models::telemetry::{
    normalize_timestamp_nanos, FieldValue, RowEntry, TelemetryRecord,
};
use tracing::debug;

use crate::rules::{ExtractionRule, FieldMapping, RuleSet};

/// 레이블 값이 없고 기본값도 없을 때
pub const UNKNOWN_LABEL: &str = "unknown";

/// 현재 시각 (epoch 나노초)
pub fn now_nanos() -> u64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .and_then(|ns| u64::try_from(ns).ok())
        .unwrap_or(0)
}

/// 추출 통계 (락 없는 카운터)
#[derive(Debug, Default)]
struct ExtractionCounters {
    records_matched: AtomicU64,
    records_unmatched: AtomicU64,
    rows_extracted: AtomicU64,
    values_defaulted: AtomicU64,
}

/// 추출 통계 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    /// 규칙이 일치한 레코드 수
    pub records_matched: u64,
    /// 일치 규칙이 없어 버려진 레코드 수
    pub records_unmatched: u64,
    /// 메트릭으로 변환된 행 수
    pub rows_extracted: u64,
    /// 기본값 또는 0/"unknown"으로 채운 레이블·필드 수
    pub values_defaulted: u64,
}

/// 메트릭 추출기
pub struct MetricExtractor {
    rules: Arc<RuleSet>,
    static_labels: BTreeMap<String, String>,
    counters: ExtractionCounters,
}

impl MetricExtractor {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self {
            rules,
            static_labels: BTreeMap::new(),
            counters: ExtractionCounters::default(),
        }
    }

    /// 모든 메트릭에 붙일 고정 레이블 (규칙 레이블과 이름이 겹치면 규칙이 우선)
    pub fn with_static_labels<I, K, V>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.static_labels
            .extend(labels.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// 레코드 → 메트릭 (타임스탬프가 없으면 현재 시각)
    pub fn extract(&self, record: &TelemetryRecord) -> Vec<Metric> {
        self.extract_at(record, now_nanos())
    }

    /// 레코드 → 메트릭, 로컬 수집 시각을 명시
    pub fn extract_at(&self, record: &TelemetryRecord, now_ns: u64) -> Vec<Metric> {
        if record.path.is_empty() || self.rules.is_empty() {
            return Vec::new();
        }

        let Some(rule) = self.rules.first_match(&record.path) else {
            self.counters.records_unmatched.fetch_add(1, Ordering::Relaxed);
            debug!(stage = "extract", path = %record.path, "일치하는 추출 규칙 없음");
            return Vec::new();
        };
        self.counters.records_matched.fetch_add(1, Ordering::Relaxed);

        let (timestamp, timestamp_is_local) = if record.has_timestamp() {
            (normalize_timestamp_nanos(record.timestamp), false)
        } else {
            (now_ns, true)
        };

        let metrics: Vec<Metric> = record
            .rows
            .iter()
            .map(|row| self.build_metric(rule, row, timestamp, timestamp_is_local))
            .collect();

        self.counters
            .rows_extracted
            .fetch_add(metrics.len() as u64, Ordering::Relaxed);
        metrics
    }

    fn build_metric(
        &self,
        rule: &ExtractionRule,
        row: &RowEntry,
        timestamp: u64,
        timestamp_is_local: bool,
    ) -> Metric {
        let mut labels = self.static_labels.clone();
        for mapping in &rule.labels {
            labels.insert(mapping.name.clone(), self.resolve_label(mapping, row));
        }

        let fields = rule
            .fields
            .iter()
            .map(|mapping| (mapping.name.clone(), self.resolve_field(mapping, row)))
            .collect();

        Metric {
            name: rule.name.clone(),
            labels,
            fields,
            timestamp,
            timestamp_is_local,
        }
    }

    /// 행 값 → 기본값 → "unknown" (빈 문자열은 없는 값으로 본다)
    fn resolve_label(&self, mapping: &FieldMapping, row: &RowEntry) -> String {
        if let Some(value) = row.get(&mapping.source).and_then(non_empty_label) {
            return value;
        }
        self.counters.values_defaulted.fetch_add(1, Ordering::Relaxed);
        mapping
            .default
            .as_ref()
            .and_then(non_empty_label)
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
    }

    /// 행 값 → 기본값 → 0 (숫자로 해석할 수 없는 값은 없는 것으로 본다)
    fn resolve_field(&self, mapping: &FieldMapping, row: &RowEntry) -> MetricValue {
        if let Some(value) = row.get(&mapping.source).and_then(to_metric_value) {
            return value;
        }
        self.counters.values_defaulted.fetch_add(1, Ordering::Relaxed);
        mapping
            .default
            .as_ref()
            .and_then(to_metric_value)
            .unwrap_or(MetricValue::Integer(0))
    }

    pub fn stats(&self) -> ExtractionStats {
        ExtractionStats {
            records_matched: self.counters.records_matched.load(Ordering::Relaxed),
            records_unmatched: self.counters.records_unmatched.load(Ordering::Relaxed),
            rows_extracted: self.counters.rows_extracted.load(Ordering::Relaxed),
            values_defaulted: self.counters.values_defaulted.load(Ordering::Relaxed),
        }
    }
}

fn non_empty_label(value: &FieldValue) -> Option<String> {
    let label = value.to_label();
    if label.trim().is_empty() {
        None
    } else {
        Some(label)
    }
}

/// 행 값의 숫자 변환 (bool은 1/0, 문자열은 정수 → 실수 순으로 파싱)
fn to_metric_value(value: &FieldValue) -> Option<MetricValue> {
    match value {
        FieldValue::Integer(v) => Some(MetricValue::Integer(*v)),
        FieldValue::Float(v) => Some(MetricValue::Float(*v)),
        FieldValue::Boolean(b) => Some(MetricValue::Integer(i64::from(*b))),
        FieldValue::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(MetricValue::Integer)
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(MetricValue::Float))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{ExtractionRule, PathPredicate};
    use telemon_core::config::AppConfig;

    const TS: u64 = 1_700_000_000_000_000_000;

    fn interface_extractor() -> MetricExtractor {
        let rules = RuleSet::from_config(&AppConfig::default_config().rules).unwrap();
        MetricExtractor::new(Arc::new(rules))
    }

    fn interface_record() -> TelemetryRecord {
        TelemetryRecord::new(
            TS,
            "interfaces/interface-stats",
            vec![RowEntry::new()
                .with("interface-name", "Gi0/1")
                .with("in-octets", 1000i64)
                .with("out-octets", 2000i64)
                .with("input-errors", 0i64)],
        )
    }

    #[test]
    fn interface_stats_scenario() {
        let metrics = interface_extractor().extract(&interface_record());

        assert_eq!(metrics.len(), 1);
        let metric = &metrics[0];
        assert_eq!(metric.name, "interface_stats");
        assert_eq!(
            metric.labels,
            BTreeMap::from([("interface_name".to_string(), "Gi0/1".to_string())])
        );
        assert_eq!(
            metric.fields,
            vec![
                ("ifInOctets".to_string(), MetricValue::Integer(1000)),
                ("ifOutOctets".to_string(), MetricValue::Integer(2000)),
                ("ifErrors".to_string(), MetricValue::Integer(0)),
            ]
        );
        assert_eq!(metric.timestamp, TS);
        assert!(!metric.timestamp_is_local);
    }

    #[test]
    fn empty_label_value_falls_back() {
        let extractor = interface_extractor();
        let mut record = interface_record();
        record.rows[0] = record.rows[0].clone().with("interface-name", "");

        let metrics = extractor.extract(&record);
        assert_eq!(metrics[0].label("interface_name"), Some(UNKNOWN_LABEL));
        assert_eq!(extractor.stats().values_defaulted, 1);
    }

    #[test]
    fn unmatched_path_yields_nothing() {
        let extractor = interface_extractor();
        let mut record = interface_record();
        record.path = "bgp/neighbors".to_string();

        assert!(extractor.extract(&record).is_empty());
        assert_eq!(extractor.stats().records_unmatched, 1);
        assert_eq!(extractor.stats().records_matched, 0);
    }

    #[test]
    fn empty_rule_set_or_path_yields_nothing() {
        let extractor = MetricExtractor::new(Arc::new(RuleSet::default()));
        assert!(extractor.extract(&interface_record()).is_empty());

        let extractor = interface_extractor();
        let mut record = interface_record();
        record.path.clear();
        assert!(extractor.extract(&record).is_empty());
    }

    #[test]
    fn missing_field_uses_configured_default() {
        let rules = RuleSet::new(vec![ExtractionRule::new(
            "interface_stats",
            PathPredicate::Contains("interface".into()),
        )
        .label("interface_name", "interface-name")
        .field("ifInOctets", "in-octets")
        .field_with_default("ifErrors", "input-errors", 7i64)]);
        let extractor = MetricExtractor::new(Arc::new(rules));

        let record = TelemetryRecord::new(
            TS,
            "interfaces/interface-stats",
            vec![RowEntry::new().with("in-octets", 5i64)],
        );
        let metrics = extractor.extract(&record);

        assert_eq!(metrics[0].field("ifErrors"), Some(MetricValue::Integer(7)));
        assert_eq!(metrics[0].label("interface_name"), Some(UNKNOWN_LABEL));
        assert_eq!(extractor.stats().values_defaulted, 2);
    }

    #[test]
    fn missing_field_without_default_is_zero() {
        let extractor = interface_extractor();
        let record = TelemetryRecord::new(
            TS,
            "interfaces/interface-stats",
            vec![RowEntry::new().with("interface-name", "Gi0/3")],
        );
        let metric = &extractor.extract(&record)[0];
        assert_eq!(metric.field("ifInOctets"), Some(MetricValue::Integer(0)));
        assert_eq!(metric.field("ifErrors"), Some(MetricValue::Integer(0)));
    }

    #[test]
    fn one_metric_per_row() {
        let extractor = interface_extractor();
        let mut record = interface_record();
        record.rows.push(
            RowEntry::new()
                .with("interface-name", "Gi0/2")
                .with("in-octets", 1i64),
        );
        let metrics = extractor.extract(&record);

        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[1].label("interface_name"), Some("Gi0/2"));
        assert_eq!(extractor.stats().rows_extracted, 2);
    }

    #[test]
    fn zero_timestamp_replaced_by_local_clock() {
        let extractor = interface_extractor();
        let mut record = interface_record();
        record.timestamp = 0;

        let metric = &extractor.extract_at(&record, 42)[0];
        assert_eq!(metric.timestamp, 42);
        assert!(metric.timestamp_is_local);
    }

    #[test]
    fn millisecond_timestamp_normalized() {
        let extractor = interface_extractor();
        let mut record = interface_record();
        record.timestamp = 1_700_000_000_000;
        assert_eq!(extractor.extract(&record)[0].timestamp, TS);
    }

    #[test]
    fn numeric_coercion_of_row_values() {
        assert_eq!(
            to_metric_value(&FieldValue::from("12")),
            Some(MetricValue::Integer(12))
        );
        assert_eq!(
            to_metric_value(&FieldValue::from("1.5")),
            Some(MetricValue::Float(1.5))
        );
        assert_eq!(
            to_metric_value(&FieldValue::Boolean(true)),
            Some(MetricValue::Integer(1))
        );
        assert_eq!(to_metric_value(&FieldValue::from("up")), None);
    }

    #[test]
    fn static_labels_attached_and_overridden_by_rule() {
        let extractor = interface_extractor().with_static_labels([
            ("device", "router1"),
            ("interface_name", "static"),
        ]);
        let metric = &extractor.extract(&interface_record())[0];

        assert_eq!(metric.label("device"), Some("router1"));
        assert_eq!(metric.label("interface_name"), Some("Gi0/1"));
    }

    #[test]
    fn now_nanos_is_recent() {
        assert!(now_nanos() > TS);
    }
}
