//! Influx 라인 프로토콜 직렬화.
//!
//! ```text
//! measurement,tag1=val1,tag2=val2 field1=val1,field2=val2 timestamp_ns
//! ```
//!
//! 태그는 키 정렬 순서, 필드는 메트릭에 정의된 순서로 기록한다.

use telemon_core::models::metric::{Metric, MetricValue};

/// 직렬화 옵션
#[derive(Debug, Clone, Copy, Default)]
pub struct LineOptions {
    /// 정수 필드에 `i` 접미사 부여
    pub integer_suffix: bool,
}

/// 메트릭 한 건을 라인 한 줄로 직렬화
///
/// 유한한 필드가 하나도 없으면 `None` (라인 프로토콜은 필드 1개 이상 필수).
/// NaN/inf 필드와 키나 값이 빈 태그는 건너뛴다.
/// 줄바꿈은 공백으로 바꿔 요청 본문의 줄 구분을 깨지 않게 한다.
pub fn serialize_metric(metric: &Metric, options: LineOptions) -> Option<String> {
    let fields: Vec<String> = metric
        .fields
        .iter()
        .filter(|(_, value)| value.is_finite())
        .map(|(key, value)| format!("{}={}", escape_key(key), format_value(value, options)))
        .collect();

    if fields.is_empty() {
        return None;
    }

    let mut line = escape_measurement(&metric.name);
    for (key, value) in metric
        .labels
        .iter()
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
    {
        line.push(',');
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&escape_key(value));
    }
    line.push(' ');
    line.push_str(&fields.join(","));
    line.push(' ');
    line.push_str(&metric.timestamp.to_string());

    Some(line)
}

fn format_value(value: &MetricValue, options: LineOptions) -> String {
    match value {
        MetricValue::Integer(v) if options.integer_suffix => format!("{v}i"),
        MetricValue::Integer(v) => v.to_string(),
        MetricValue::Float(v) => v.to_string(),
    }
}

/// measurement 이스케이프: 쉼표, 공백
fn escape_measurement(s: &str) -> String {
    strip_newlines(s).replace(',', "\\,").replace(' ', "\\ ")
}

/// 태그 키/값, 필드 키 이스케이프: 쉼표, 등호, 공백
fn escape_key(s: &str) -> String {
    strip_newlines(s)
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

fn strip_newlines(s: &str) -> String {
    s.replace(['\r', '\n'], " ")
}
