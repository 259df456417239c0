//! 파이프라인 설정 구조체.
//!
//! 디바이스 엔드포인트, 싱크 URL, 추출 규칙, 백오프/재전송 정책을 정의한다.
//! 파일/환경변수 로드는 `telemon-app`이 담당하고, 여기서는 구조와 기본값, 검증만 다룬다.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CoreError;
use crate::models::telemetry::{FieldValue, SubscriptionEncoding, SubscriptionSpec};

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 구독할 디바이스 목록 (디바이스마다 독립 파이프라인)
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
    /// 시계열 싱크 설정
    #[serde(default)]
    pub sink: SinkConfig,
    /// 재연결 백오프 설정
    #[serde(default)]
    pub backoff: BackoffConfig,
    /// 전송 실패 재시도 정책
    #[serde(default)]
    pub delivery: DeliveryPolicyConfig,
    /// 경로별 추출 규칙 (위에서부터 첫 매칭 적용)
    #[serde(default = "default_rules")]
    pub rules: Vec<ExtractionRuleConfig>,
}

impl AppConfig {
    /// 기본 설정 (디바이스 없음, 로컬 InfluxDB, 인터페이스 통계 규칙)
    pub fn default_config() -> Self {
        Self {
            devices: Vec::new(),
            sink: SinkConfig::default(),
            backoff: BackoffConfig::default(),
            delivery: DeliveryPolicyConfig::default(),
            rules: default_rules(),
        }
    }

    /// 설정 검증. 실패는 생성 시점에 치명적이다.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.devices.is_empty() {
            return Err(CoreError::Config(
                "devices가 비어 있음: 최소 1개 디바이스 필요".to_string(),
            ));
        }

        let mut names = std::collections::HashSet::new();
        for device in &self.devices {
            device.validate()?;
            if !names.insert(device.name.as_str()) {
                return Err(CoreError::Validation {
                    field: "devices.name".to_string(),
                    message: format!("중복된 디바이스 이름: {}", device.name),
                });
            }
        }

        self.sink.validate()?;
        self.backoff.validate()?;

        for rule in &self.rules {
            rule.validate()?;
        }

        Ok(())
    }
}

// ============================================================
// 디바이스 설정
// ============================================================

/// 디바이스 텔레메트리 구독 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// 디바이스 이름 (로그/레이블 식별용)
    pub name: String,
    /// gRPC 엔드포인트 (예: "http://192.168.1.1:57400")
    pub endpoint: String,
    /// 디바이스에 설정된 구독 ID
    pub subscription_id: String,
    /// 요청 인코딩
    #[serde(default)]
    pub encoding: SubscriptionEncoding,
    /// 스트림 keep-alive
    #[serde(default = "default_true")]
    pub keep_alive: bool,
    /// 구독 자격증명 (gRPC 메타데이터)
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// 연결 타임아웃 (밀리초)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// 읽기 대기 단위 (밀리초). 이 간격마다 종료 신호를 다시 확인한다.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// 이 디바이스의 모든 메트릭에 붙는 고정 레이블
    #[serde(default)]
    pub static_labels: Vec<StaticLabel>,
}

impl DeviceConfig {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        subscription_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            subscription_id: subscription_id.into(),
            encoding: SubscriptionEncoding::default(),
            keep_alive: true,
            username: None,
            password: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            static_labels: Vec::new(),
        }
    }

    /// 구독 명세 생성
    pub fn subscription(&self) -> SubscriptionSpec {
        SubscriptionSpec {
            subscription_id: self.subscription_id.clone(),
            encoding: self.encoding,
            keep_alive: self.keep_alive,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        require_non_empty("devices.name", &self.name)?;
        require_non_empty("devices.endpoint", &self.endpoint)?;
        require_non_empty("devices.subscription_id", &self.subscription_id)?;

        if self.read_timeout_ms == 0 {
            return Err(CoreError::Validation {
                field: "devices.read_timeout_ms".to_string(),
                message: format!("{}: 0보다 커야 함", self.name),
            });
        }

        if self.username.is_some() != self.password.is_some() {
            return Err(CoreError::Validation {
                field: "devices.username".to_string(),
                message: format!("{}: username과 password는 함께 설정해야 함", self.name),
            });
        }

        Ok(())
    }
}

/// 고정 레이블 (예: device = "router1")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticLabel {
    pub name: String,
    pub value: String,
}

// ============================================================
// 싱크 설정
// ============================================================

/// 시계열 싱크 (InfluxDB 라인 프로토콜 HTTP 엔드포인트) 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// 쓰기 URL (예: "http://localhost:8086/write?db=network_metrics")
    #[serde(default = "default_sink_url")]
    pub url: String,
    /// 요청당 메트릭 수
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// 요청 타임아웃 (밀리초)
    #[serde(default = "default_sink_timeout_ms")]
    pub timeout_ms: u64,
    /// 정수 필드에 `i` 접미사 부여 (InfluxDB 정수 타입)
    #[serde(default)]
    pub integer_suffix: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            url: default_sink_url(),
            batch_size: default_batch_size(),
            timeout_ms: default_sink_timeout_ms(),
            integer_suffix: false,
        }
    }
}

impl SinkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        require_non_empty("sink.url", &self.url)?;
        url::Url::parse(&self.url).map_err(|e| CoreError::Validation {
            field: "sink.url".to_string(),
            message: format!("잘못된 URL '{}': {e}", self.url),
        })?;

        if self.batch_size == 0 {
            return Err(CoreError::Validation {
                field: "sink.batch_size".to_string(),
                message: "0보다 커야 함".to_string(),
            });
        }

        if self.timeout_ms == 0 {
            return Err(CoreError::Validation {
                field: "sink.timeout_ms".to_string(),
                message: "0보다 커야 함".to_string(),
            });
        }

        Ok(())
    }
}

// ============================================================
// 백오프 / 재전송 정책
// ============================================================

/// 재연결 exponential backoff 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// 첫 대기 시간 (밀리초)
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// 최대 대기 시간 (밀리초)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// 배수
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// 지터 비율 (0.0–1.0)
    #[serde(default = "default_jitter")]
    pub jitter: f64,
    /// 최대 재시도 횟수 (None = 무제한)
    #[serde(default)]
    pub max_retries: Option<u32>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            jitter: default_jitter(),
            max_retries: None,
        }
    }
}

impl BackoffConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.initial_delay_ms == 0 {
            return Err(CoreError::Validation {
                field: "backoff.initial_delay_ms".to_string(),
                message: "0보다 커야 함".to_string(),
            });
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(CoreError::Validation {
                field: "backoff.max_delay_ms".to_string(),
                message: format!(
                    "initial_delay_ms({})보다 작음: {}",
                    self.initial_delay_ms, self.max_delay_ms
                ),
            });
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(CoreError::Validation {
                field: "backoff.multiplier".to_string(),
                message: format!("1.0 이상이어야 함: {}", self.multiplier),
            });
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(CoreError::Validation {
                field: "backoff.jitter".to_string(),
                message: format!("0.0–1.0 범위여야 함: {}", self.jitter),
            });
        }
        Ok(())
    }
}

/// 싱크 전송 실패 시 드라이버의 재시도 정책
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPolicyConfig {
    /// 실패한 메트릭 재전송 횟수 (0 = 재시도 없이 버림)
    #[serde(default = "default_delivery_retries")]
    pub max_retries: u32,
    /// 재전송 전 대기 (밀리초)
    #[serde(default = "default_delivery_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for DeliveryPolicyConfig {
    fn default() -> Self {
        Self {
            max_retries: default_delivery_retries(),
            retry_delay_ms: default_delivery_retry_delay_ms(),
        }
    }
}

impl DeliveryPolicyConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

// ============================================================
// 추출 규칙
// ============================================================

/// 경로 매칭 조건
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathMatcherConfig {
    /// 경로에 문자열 포함
    Contains(String),
    /// 경로 접두사
    Prefix(String),
    /// 경로 정확히 일치
    Exact(String),
    /// 모든 경로
    Any,
}

/// 출력 이름 ← 원본 필드 매핑
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMappingConfig {
    /// 출력 레이블/필드 이름
    pub name: String,
    /// 행의 원본 필드 이름
    pub source: String,
    /// 원본 필드가 없을 때 쓸 값
    #[serde(default)]
    pub default: Option<FieldValue>,
}

impl FieldMappingConfig {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            default: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// 경로별 추출 규칙
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRuleConfig {
    /// 출력 measurement 이름
    pub name: String,
    /// 경로 매칭 조건
    pub path: PathMatcherConfig,
    /// 레이블 매핑
    #[serde(default)]
    pub labels: Vec<FieldMappingConfig>,
    /// 값 필드 매핑
    pub fields: Vec<FieldMappingConfig>,
}

impl ExtractionRuleConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        require_non_empty("rules.name", &self.name)?;
        if self.fields.is_empty() {
            return Err(CoreError::Validation {
                field: "rules.fields".to_string(),
                message: format!("{}: 최소 1개 값 필드 필요", self.name),
            });
        }
        for mapping in self.labels.iter().chain(self.fields.iter()) {
            require_non_empty("rules.*.name", &mapping.name)?;
            require_non_empty("rules.*.source", &mapping.source)?;
        }
        Ok(())
    }
}

/// 인터페이스 통계 기본 규칙
fn default_rules() -> Vec<ExtractionRuleConfig> {
    vec![ExtractionRuleConfig {
        name: "interface_stats".to_string(),
        path: PathMatcherConfig::Contains("interface".to_string()),
        labels: vec![FieldMappingConfig::new("interface_name", "interface-name")],
        fields: vec![
            FieldMappingConfig::new("ifInOctets", "in-octets"),
            FieldMappingConfig::new("ifOutOctets", "out-octets"),
            FieldMappingConfig::new("ifErrors", "input-errors"),
        ],
    }]
}

fn require_non_empty(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation {
            field: field.to_string(),
            message: "비어 있음".to_string(),
        });
    }
    Ok(())
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_read_timeout_ms() -> u64 {
    1_000
}

fn default_sink_url() -> String {
    "http://localhost:8086/write?db=network_metrics".to_string()
}

fn default_batch_size() -> usize {
    500
}

fn default_sink_timeout_ms() -> u64 {
    3_000
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> f64 {
    0.1
}

fn default_delivery_retries() -> u32 {
    1
}

fn default_delivery_retry_delay_ms() -> u64 {
    250
}
