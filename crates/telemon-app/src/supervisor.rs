//! 디바이스별 파이프라인 구성 및 실행.
//!
//! 디바이스마다 커넥터/싱크를 따로 만들고 규칙 집합만 `Arc`로 공유한다.

use std::sync::Arc;
use telemon_core::config::AppConfig;
use telemon_core::error::CoreError;
use telemon_network::decoder::GpbDecoder;
use telemon_network::grpc::GrpcDialInConnector;
use telemon_network::influx_sink::HttpLineProtocolSink;
use telemon_pipeline::driver::{PipelineDriver, PipelineReport, PipelineSettings};
use telemon_pipeline::extractor::MetricExtractor;
use telemon_pipeline::rules::RuleSet;
use tokio::sync::watch;
use tracing::{error, info};

pub struct Supervisor {
    drivers: Vec<PipelineDriver>,
}

impl Supervisor {
    /// 검증된 설정으로 디바이스마다 드라이버 생성
    pub fn from_config(config: &AppConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let rules = Arc::new(RuleSet::from_config(&config.rules)?);

        let drivers = config
            .devices
            .iter()
            .map(|device| {
                let settings = PipelineSettings::new(device, &config.backoff, &config.delivery);
                let extractor = MetricExtractor::new(rules.clone()).with_static_labels(
                    device
                        .static_labels
                        .iter()
                        .map(|label| (label.name.clone(), label.value.clone())),
                );
                let sink = HttpLineProtocolSink::new(&config.sink)?;

                Ok(PipelineDriver::new(
                    settings,
                    Arc::new(GrpcDialInConnector::from_device(device)),
                    Arc::new(GpbDecoder::new()),
                    extractor,
                    Arc::new(sink),
                ))
            })
            .collect::<Result<Vec<_>, CoreError>>()?;

        Ok(Self { drivers })
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    /// 모든 파이프라인을 독립 태스크로 실행하고 전부 끝날 때까지 대기
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Vec<PipelineReport> {
        info!(pipelines = self.drivers.len(), "파이프라인 시작");

        let handles: Vec<_> = self
            .drivers
            .into_iter()
            .map(|driver| tokio::spawn(driver.run(shutdown.clone())))
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => error!("파이프라인 태스크 비정상 종료: {e}"),
            }
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemon_core::config::DeviceConfig;
    use telemon_pipeline::driver::TerminationReason;

    fn config_with_devices(names: &[&str]) -> AppConfig {
        let mut config = AppConfig::default_config();
        for (i, name) in names.iter().enumerate() {
            config.devices.push(DeviceConfig::new(
                *name,
                format!("127.0.0.1:{}", 57400 + i),
                "interface-stats",
            ));
        }
        config
    }

    #[test]
    fn one_driver_per_device() {
        let supervisor = Supervisor::from_config(&config_with_devices(&["r1", "r2", "r3"])).unwrap();
        assert_eq!(supervisor.len(), 3);
    }

    #[test]
    fn invalid_config_rejected() {
        assert!(Supervisor::from_config(&config_with_devices(&[])).is_err());

        let mut config = config_with_devices(&["r1"]);
        config.rules[0].fields.clear();
        assert!(Supervisor::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn shutdown_stops_every_pipeline() {
        let supervisor = Supervisor::from_config(&config_with_devices(&["r1", "r2"])).unwrap();
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let reports = supervisor.run(rx).await;

        assert_eq!(reports.len(), 2);
        assert!(reports
            .iter()
            .all(|r| r.reason == TerminationReason::Shutdown));
        let mut devices: Vec<&str> = reports.iter().map(|r| r.device.as_str()).collect();
        devices.sort();
        assert_eq!(devices, vec!["r1", "r2"]);
    }
}
