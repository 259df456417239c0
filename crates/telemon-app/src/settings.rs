//! 설정 파일 로드.
//!
//! 파일(TOML/JSON/YAML, 확장자로 판별) 위에 `TELEMON__` 환경변수를 덮어쓴다.
//! 예: `TELEMON__SINK__URL`, `TELEMON__BACKOFF__MAX_RETRIES`

use std::path::Path;
use telemon_core::config::AppConfig;
use telemon_core::error::CoreError;

const ENV_PREFIX: &str = "TELEMON";
const ENV_SEPARATOR: &str = "__";

/// 설정 파일 + 프로세스 환경변수
pub fn load(path: &Path) -> Result<AppConfig, CoreError> {
    load_with_env(path, None)
}

/// 환경변수 원본을 지정해 로드 (`None`이면 프로세스 환경)
pub fn load_with_env(
    path: &Path,
    env: Option<config::Map<String, String>>,
) -> Result<AppConfig, CoreError> {
    if !path.exists() {
        return Err(CoreError::Config(format!(
            "설정 파일 없음: {}",
            path.display()
        )));
    }

    let environment = config::Environment::with_prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
        .source(env);

    let config: AppConfig = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(environment)
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))?;

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use telemon_core::config::PathMatcherConfig;
    use telemon_core::models::telemetry::{FieldValue, SubscriptionEncoding};

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const MINIMAL: &str = r#"
[[devices]]
name = "router1"
endpoint = "10.0.0.1:57400"
subscription_id = "interface-stats"
"#;

    #[test]
    fn minimal_file_uses_defaults() {
        let file = write_config(MINIMAL);
        let config = load_with_env(file.path(), Some(config::Map::new())).unwrap();

        assert_eq!(config.devices.len(), 1);
        let device = &config.devices[0];
        assert_eq!(device.name, "router1");
        assert_eq!(device.encoding, SubscriptionEncoding::Gpb);
        assert!(device.keep_alive);
        assert_eq!(config.sink.batch_size, 500);
        assert_eq!(config.backoff.max_retries, None);
        assert_eq!(config.rules[0].name, "interface_stats");
    }

    #[test]
    fn full_file_parses_rules_and_labels() {
        let file = write_config(
            r#"
[[devices]]
name = "core-1"
endpoint = "http://10.0.0.2:57400"
subscription_id = "health"
encoding = "gpb"
username = "admin"
password = "0123"
static_labels = [{ name = "site", value = "Seoul-DC1" }]

[sink]
url = "http://influx:8086/write?db=net"
batch_size = 100
integer_suffix = true

[backoff]
initial_delay_ms = 500
max_delay_ms = 30000
max_retries = 10

[[rules]]
name = "cpu"
path = { prefix = "system/cpu" }
labels = [{ name = "cpuName", source = "name" }]
fields = [
  { name = "utilization", source = "total-util" },
  { name = "loadAvg", source = "load", default = 1.5 },
]

[[rules]]
name = "catch_all"
path = "any"
fields = [{ name = "value", source = "value" }]
"#,
        );
        let config = load_with_env(file.path(), Some(config::Map::new())).unwrap();

        let device = &config.devices[0];
        assert_eq!(device.password.as_deref(), Some("0123"));
        assert_eq!(device.static_labels[0].value, "Seoul-DC1");
        assert_eq!(config.sink.batch_size, 100);
        assert!(config.sink.integer_suffix);
        assert_eq!(config.backoff.max_retries, Some(10));

        assert_eq!(config.rules.len(), 2);
        assert_eq!(
            config.rules[0].path,
            PathMatcherConfig::Prefix("system/cpu".to_string())
        );
        assert_eq!(config.rules[0].labels[0].name, "cpuName");
        assert_eq!(config.rules[0].fields[1].default, Some(FieldValue::Float(1.5)));
        assert_eq!(config.rules[1].path, PathMatcherConfig::Any);
    }

    #[test]
    fn environment_overrides_file() {
        let file = write_config(MINIMAL);
        let env = config::Map::from([
            ("TELEMON__SINK__BATCH_SIZE".to_string(), "42".to_string()),
            (
                "TELEMON__SINK__URL".to_string(),
                "http://override:8086/write".to_string(),
            ),
        ]);
        let config = load_with_env(file.path(), Some(env)).unwrap();

        assert_eq!(config.sink.batch_size, 42);
        assert_eq!(config.sink.url, "http://override:8086/write");
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = load(Path::new("/nonexistent/telemon.toml")).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let file = write_config(&format!("{MINIMAL}\n[sink]\nbatch_size = 0\n"));
        assert!(load_with_env(file.path(), Some(config::Map::new())).is_err());
    }

    #[test]
    fn no_devices_is_fatal() {
        let file = write_config("[sink]\nbatch_size = 10\n");
        let err = load_with_env(file.path(), Some(config::Map::new())).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }
}
