//! HTTP 라인 프로토콜 싱크.
//!
//! `MetricSink` 포트 구현. 메트릭을 `batch_size` 단위로 묶어 POST 한 번씩 전송하고
//! 결과를 메트릭별로 돌려준다. 재시도는 호출자(드라이버) 몫이다.

use async_trait::async_trait;
use telemon_core::config::SinkConfig;
use telemon_core::error::CoreError;
use telemon_core::models::metric::{DeliveryOutcome, Metric};
use telemon_core::ports::sink::MetricSink;
use tracing::{debug, warn};

use crate::line_protocol::{serialize_metric, LineOptions};

/// 실패 사유에 포함할 응답 본문 최대 길이
const MAX_REASON_BODY: usize = 200;

/// 라인 프로토콜 HTTP 싱크: `MetricSink` 포트 구현
pub struct HttpLineProtocolSink {
    client: reqwest::Client,
    url: String,
    batch_size: usize,
    options: LineOptions,
}

impl HttpLineProtocolSink {
    /// 싱크 설정으로 생성 (요청 타임아웃 = `timeout_ms`)
    pub fn new(config: &SinkConfig) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            batch_size: config.batch_size.max(1),
            options: LineOptions {
                integer_suffix: config.integer_suffix,
            },
        })
    }

    /// 배치 하나 전송. 204만 성공으로 본다.
    async fn post_batch(&self, body: String) -> Result<(), String> {
        let resp = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| format!("전송 실패: {e}"))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(());
        }

        let text = resp.text().await.unwrap_or_else(|e| {
            warn!("응답 본문 읽기 실패: {e}");
            String::new()
        });
        let text: String = text.chars().take(MAX_REASON_BODY).collect();
        Err(format!("HTTP {}: {}", status.as_u16(), text.trim()))
    }
}

#[async_trait]
impl MetricSink for HttpLineProtocolSink {
    async fn deliver(&self, metrics: &[Metric]) -> Vec<DeliveryOutcome> {
        let mut outcomes = Vec::with_capacity(metrics.len());

        for chunk in metrics.chunks(self.batch_size) {
            let lines: Vec<Option<String>> = chunk
                .iter()
                .map(|metric| serialize_metric(metric, self.options))
                .collect();
            let body = lines.iter().flatten().cloned().collect::<Vec<_>>();

            let batch_result = if body.is_empty() {
                Ok(())
            } else {
                let count = body.len();
                let result = self.post_batch(body.join("\n")).await;
                match &result {
                    Ok(()) => debug!(count, "배치 전송 완료"),
                    Err(reason) => warn!(stage = "deliver", count, reason = %reason, "배치 전송 실패"),
                }
                result
            };

            for (metric, line) in chunk.iter().zip(lines) {
                let outcome = match (&line, &batch_result) {
                    (None, _) => DeliveryOutcome::failed(metric.clone(), "no serializable fields"),
                    (Some(_), Ok(())) => DeliveryOutcome::delivered(metric.clone()),
                    (Some(_), Err(reason)) => DeliveryOutcome::failed(metric.clone(), reason.clone()),
                };
                outcomes.push(outcome);
            }
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use telemon_core::models::metric::MetricValue;

    fn metric(interface: &str, in_octets: i64) -> Metric {
        Metric {
            name: "interface_stats".to_string(),
            labels: BTreeMap::from([("interface_name".to_string(), interface.to_string())]),
            fields: vec![("ifInOctets".to_string(), MetricValue::Integer(in_octets))],
            timestamp: 1_700_000_000_000_000_000,
            timestamp_is_local: false,
        }
    }

    fn sink_for(server: &mockito::ServerGuard, batch_size: usize) -> HttpLineProtocolSink {
        let config = SinkConfig {
            url: format!("{}/write?db=test", server.url()),
            batch_size,
            ..SinkConfig::default()
        };
        HttpLineProtocolSink::new(&config).unwrap()
    }

    #[tokio::test]
    async fn deliver_success_204() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/write?db=test")
            .match_body(
                "interface_stats,interface_name=Gi0/1 ifInOctets=1 1700000000000000000\n\
                 interface_stats,interface_name=Gi0/2 ifInOctets=2 1700000000000000000",
            )
            .with_status(204)
            .create_async()
            .await;

        let sink = sink_for(&server, 500);
        let outcomes = sink.deliver(&[metric("Gi0/1", 1), metric("Gi0/2", 2)]).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(DeliveryOutcome::is_delivered));
        assert_eq!(outcomes[1].metric.label("interface_name"), Some("Gi0/2"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_fails_whole_batch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/write?db=test")
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;

        let sink = sink_for(&server, 500);
        let outcomes = sink
            .deliver(&[metric("a", 1), metric("b", 2), metric("c", 3)])
            .await;

        assert_eq!(outcomes.len(), 3);
        for outcome in &outcomes {
            assert_eq!(outcome.failure_reason(), Some("HTTP 500: internal error"));
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_204_success_is_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/write?db=test")
            .with_status(200)
            .create_async()
            .await;

        let sink = sink_for(&server, 500);
        let outcomes = sink.deliver(&[metric("a", 1)]).await;
        assert!(!outcomes[0].is_delivered());
    }

    #[tokio::test]
    async fn splits_into_batches() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/write?db=test")
            .with_status(204)
            .expect(3)
            .create_async()
            .await;

        let sink = sink_for(&server, 2);
        let metrics: Vec<Metric> = (0..5).map(|i| metric("Gi0/1", i)).collect();
        let outcomes = sink.deliver(&metrics).await;

        assert_eq!(outcomes.len(), 5);
        assert!(outcomes.iter().all(DeliveryOutcome::is_delivered));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn repeated_delivery_is_not_deduplicated() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/write?db=test")
            .with_status(204)
            .expect(2)
            .create_async()
            .await;

        let sink = sink_for(&server, 500);
        let batch = [metric("Gi0/1", 1)];
        sink.deliver(&batch).await;
        sink.deliver(&batch).await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unserializable_metric_fails_alone() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/write?db=test")
            .match_body("interface_stats,interface_name=ok ifInOctets=1 1700000000000000000")
            .with_status(204)
            .create_async()
            .await;

        let mut broken = metric("nan", 0);
        broken.fields = vec![("ifInOctets".to_string(), MetricValue::Float(f64::NAN))];

        let sink = sink_for(&server, 500);
        let outcomes = sink.deliver(&[broken, metric("ok", 1)]).await;

        assert_eq!(outcomes[0].failure_reason(), Some("no serializable fields"));
        assert!(outcomes[1].is_delivered());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn connection_error_marks_failed() {
        let config = SinkConfig {
            url: "http://127.0.0.1:1/write".to_string(),
            ..SinkConfig::default()
        };
        let sink = HttpLineProtocolSink::new(&config).unwrap();
        let outcomes = sink.deliver(&[metric("a", 1), metric("b", 2)]).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| !o.is_delivered()));
    }

    #[tokio::test]
    async fn empty_input_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/write?db=test")
            .expect(0)
            .create_async()
            .await;

        let sink = sink_for(&server, 500);
        assert!(sink.deliver(&[]).await.is_empty());
        mock.assert_async().await;
    }
}
