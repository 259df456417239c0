//! 텔레메트리 스트림 모델.
//!
//! 커넥터가 생성하는 원시 메시지와 디코더가 생성하는 구조화 레코드.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 구독 시 요청하는 인코딩
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubscriptionEncoding {
    /// 자기 기술형 GPB key-value (행마다 필드 이름 포함)
    #[default]
    Gpb,
    /// 컴팩트 GPB (모델별 스키마 필요)
    GpbCompact,
    /// JSON
    Json,
}

impl SubscriptionEncoding {
    /// dial-in 구독 요청의 `encode` 코드
    pub fn wire_code(self) -> i64 {
        match self {
            SubscriptionEncoding::GpbCompact => 2,
            SubscriptionEncoding::Gpb => 3,
            SubscriptionEncoding::Json => 4,
        }
    }
}

impl fmt::Display for SubscriptionEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionEncoding::Gpb => write!(f, "gpb"),
            SubscriptionEncoding::GpbCompact => write!(f, "gpb-compact"),
            SubscriptionEncoding::Json => write!(f, "json"),
        }
    }
}

/// 구독 명세: 구독 ID, 요청 인코딩, keep-alive 여부
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSpec {
    /// 디바이스에 설정된 구독 식별자
    pub subscription_id: String,
    /// 요청 인코딩
    pub encoding: SubscriptionEncoding,
    /// 스트림 유지 (HTTP/2 keep-alive)
    pub keep_alive: bool,
}

impl SubscriptionSpec {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            encoding: SubscriptionEncoding::Gpb,
            keep_alive: true,
        }
    }
}

/// 커넥터가 프레임마다 생성하는 불투명 바이너리 메시지.
///
/// 디코더가 한 번 소비한 뒤 버려진다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryMessage {
    /// 인코딩된 레코드
    pub payload: Vec<u8>,
    /// 구독 시 요청한 인코딩
    pub encoding: SubscriptionEncoding,
    /// 스트림 내 도착 순서 (0부터). 프로듀서 시퀀스 번호가 아니다.
    pub arrival_index: u64,
}

impl TelemetryMessage {
    pub fn new(payload: Vec<u8>, encoding: SubscriptionEncoding, arrival_index: u64) -> Self {
        Self {
            payload,
            encoding,
            arrival_index,
        }
    }
}

/// 행 필드 값
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl FieldValue {
    /// 숫자로 해석 가능한 경우 f64로 변환 (bool은 1/0)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::String(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// 레이블 값으로 쓸 문자열 표현
    pub fn to_label(&self) -> String {
        match self {
            FieldValue::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Boolean(v) => write!(f, "{v}"),
            FieldValue::Integer(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::String(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

/// 레코드의 한 행. 필드는 이름으로 접근하므로 순서는 의미가 없다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowEntry {
    pub fields: BTreeMap<String, FieldValue>,
}

impl RowEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 필드 추가 (빌더)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// 초 단위로 간주하는 상한 (약 5138년)
const SECONDS_LIMIT: u64 = 100_000_000_000;
/// 밀리초 단위로 간주하는 상한
const MILLIS_LIMIT: u64 = 100_000_000_000_000;
/// 마이크로초 단위로 간주하는 상한
const MICROS_LIMIT: u64 = 100_000_000_000_000_000;

/// 프로듀서 타임스탬프를 나노초로 정규화
///
/// 크기로 단위를 추정한다 (s / ms / µs / ns). 0은 "알 수 없음"으로 그대로 둔다.
/// 이미 나노초인 값에는 변화가 없다.
pub fn normalize_timestamp_nanos(raw: u64) -> u64 {
    match raw {
        0 => 0,
        r if r < SECONDS_LIMIT => r.saturating_mul(1_000_000_000),
        r if r < MILLIS_LIMIT => r.saturating_mul(1_000_000),
        r if r < MICROS_LIMIT => r.saturating_mul(1_000),
        r => r,
    }
}

/// 디코딩된 텔레메트리 레코드
///
/// `path`는 비어 있지 않다. `timestamp`가 0이면 프로듀서가 생략한 것이며
/// "알 수 없음"으로 취급한다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryRecord {
    /// 프로듀서 타임스탬프 원본 (단위 미정규화, 0 = 알 수 없음)
    pub timestamp: u64,
    /// 메트릭 패밀리/소스 식별 경로
    pub path: String,
    /// 행 목록 (수신 순서 유지)
    pub rows: Vec<RowEntry>,
    /// 프로듀서 노드 ID (envelope에 있을 때)
    pub node_id: Option<String>,
    /// 프로듀서 측 구독 ID (envelope에 있을 때)
    pub subscription_id: Option<String>,
}

impl TelemetryRecord {
    pub fn new(timestamp: u64, path: impl Into<String>, rows: Vec<RowEntry>) -> Self {
        Self {
            timestamp,
            path: path.into(),
            rows,
            node_id: None,
            subscription_id: None,
        }
    }

    /// 프로듀서가 타임스탬프를 제공했는지
    pub fn has_timestamp(&self) -> bool {
        self.timestamp != 0
    }
}
