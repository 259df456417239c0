//! 파이프라인 드라이버.
//!
//! 디바이스 구독 하나에 대한 상태 머신:
//!
//! ```text
//! Idle → Connecting → Streaming → Backoff → (Connecting | Terminated)
//! ```
//!
//! - 첫 메시지를 받아야 `Streaming`으로 전이하며, 이때 백오프가 초기화된다.
//! - 디코딩/전송 실패는 로그만 남기고 스트림을 계속 처리한다.
//! - 연결 실패와 연결 끊김은 `Backoff`로, 종료 신호와 재시도 한도 소진은 `Terminated`로 간다.
//! - `run()`이 드라이버를 소비하므로 `Terminated` 이후 재시작할 수 없다.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use telemon_core::config::{BackoffConfig, DeliveryPolicyConfig, DeviceConfig};
use telemon_core::error::CoreError;
use telemon_core::models::metric::Metric;
use telemon_core::models::telemetry::{SubscriptionSpec, TelemetryMessage};
use telemon_core::ports::connector::{TelemetryConnector, TelemetryStream};
use telemon_core::ports::decoder::RecordDecoder;
use telemon_core::ports::sink::MetricSink;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::extractor::{ExtractionStats, MetricExtractor};
use crate::reader::{read_next, shutdown_requested, wait_for_shutdown, ReadOutcome};
use crate::stats::{PipelineStats, PipelineStatsSnapshot};

/// 드라이버 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Connecting,
    Streaming,
    Backoff,
    Terminated,
}

impl PipelineState {
    /// 허용된 전이인지
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Idle, Terminated)
                | (Connecting, Streaming)
                | (Connecting, Backoff)
                | (Connecting, Terminated)
                | (Streaming, Backoff)
                | (Streaming, Terminated)
                | (Backoff, Connecting)
                | (Backoff, Terminated)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Connecting => "connecting",
            PipelineState::Streaming => "streaming",
            PipelineState::Backoff => "backoff",
            PipelineState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// 종료 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// 종료 신호
    Shutdown,
    /// 재연결 한도 소진
    RetriesExhausted,
}

/// 파이프라인 한 개의 실행 설정
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// 로그/레이블용 디바이스 이름
    pub device: String,
    pub endpoint: String,
    pub subscription: SubscriptionSpec,
    /// 읽기 타임아웃 (종료 신호 재확인 주기)
    pub read_timeout: Duration,
    pub backoff: BackoffConfig,
    pub delivery: DeliveryPolicyConfig,
}

impl PipelineSettings {
    pub fn new(
        device: &DeviceConfig,
        backoff: &BackoffConfig,
        delivery: &DeliveryPolicyConfig,
    ) -> Self {
        Self {
            device: device.name.clone(),
            endpoint: device.endpoint.clone(),
            subscription: device.subscription(),
            read_timeout: device.read_timeout(),
            backoff: backoff.clone(),
            delivery: delivery.clone(),
        }
    }
}

/// 실행 결과
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub device: String,
    pub reason: TerminationReason,
    pub stats: PipelineStatsSnapshot,
    pub extraction: ExtractionStats,
}

/// 스트림 하나의 종료 원인
enum StreamEnd {
    Shutdown,
    Lost(CoreError),
}

/// 파이프라인 드라이버
pub struct PipelineDriver {
    settings: PipelineSettings,
    connector: Arc<dyn TelemetryConnector>,
    decoder: Arc<dyn RecordDecoder>,
    extractor: MetricExtractor,
    sink: Arc<dyn MetricSink>,
    backoff: Backoff,
    stats: Arc<PipelineStats>,
    state_tx: watch::Sender<PipelineState>,
}

impl PipelineDriver {
    pub fn new(
        settings: PipelineSettings,
        connector: Arc<dyn TelemetryConnector>,
        decoder: Arc<dyn RecordDecoder>,
        extractor: MetricExtractor,
        sink: Arc<dyn MetricSink>,
    ) -> Self {
        let backoff = Backoff::new(&settings.backoff);
        let (state_tx, _) = watch::channel(PipelineState::Idle);
        Self {
            settings,
            connector,
            decoder,
            extractor,
            sink,
            backoff,
            stats: Arc::new(PipelineStats::default()),
            state_tx,
        }
    }

    /// 상태 변화 구독
    pub fn subscribe_state(&self) -> watch::Receiver<PipelineState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        *self.state_tx.borrow()
    }

    /// 실행 중 카운터 (드라이버가 소비된 뒤에도 유효)
    pub fn stats(&self) -> Arc<PipelineStats> {
        self.stats.clone()
    }

    fn transition(&self, next: PipelineState) {
        let previous = self.state();
        if previous == next {
            return;
        }
        debug_assert!(
            previous.can_transition_to(next),
            "잘못된 전이: {previous} → {next}"
        );
        self.state_tx.send_replace(next);
        info!(device = %self.settings.device, from = %previous, to = %next, "상태 전이");
    }

    /// 종료될 때까지 실행
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> PipelineReport {
        info!(
            device = %self.settings.device,
            endpoint = %self.settings.endpoint,
            subscription = %self.settings.subscription.subscription_id,
            "파이프라인 시작"
        );
        self.transition(PipelineState::Connecting);

        loop {
            if shutdown_requested(&shutdown) {
                return self.terminate(TerminationReason::Shutdown);
            }

            let opened = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => {
                    return self.terminate(TerminationReason::Shutdown);
                }
                result = self.connector.open(&self.settings.endpoint, &self.settings.subscription) => result,
            };

            match opened {
                Ok(mut stream) => {
                    let end = self.consume(stream.as_mut(), &mut shutdown).await;
                    // 전송 자원은 Backoff/Terminated 전이 전에 해제
                    drop(stream);
                    match end {
                        StreamEnd::Shutdown => return self.terminate(TerminationReason::Shutdown),
                        StreamEnd::Lost(err) => warn!(
                            stage = "read",
                            device = %self.settings.device,
                            error = %err,
                            "스트림 끊김"
                        ),
                    }
                }
                Err(err) => warn!(
                    stage = "connect",
                    device = %self.settings.device,
                    endpoint = %self.settings.endpoint,
                    error = %err,
                    "연결 실패"
                ),
            }

            self.transition(PipelineState::Backoff);
            let Some(delay) = self.backoff.next_delay() else {
                warn!(
                    device = %self.settings.device,
                    attempts = self.backoff.attempts(),
                    "재연결 한도 소진"
                );
                return self.terminate(TerminationReason::RetriesExhausted);
            };

            info!(
                device = %self.settings.device,
                delay_ms = delay.as_millis() as u64,
                attempt = self.backoff.attempts(),
                "재연결 대기"
            );
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => {
                    return self.terminate(TerminationReason::Shutdown);
                }
                _ = tokio::time::sleep(delay) => {}
            }

            self.stats.record_reconnect();
            self.transition(PipelineState::Connecting);
        }
    }

    /// 스트림이 끊기거나 종료 신호가 올 때까지 메시지 처리
    async fn consume(
        &mut self,
        stream: &mut dyn TelemetryStream,
        shutdown: &mut watch::Receiver<bool>,
    ) -> StreamEnd {
        loop {
            match read_next(stream, shutdown, self.settings.read_timeout).await {
                ReadOutcome::Message(message) => {
                    if self.state() == PipelineState::Connecting {
                        self.transition(PipelineState::Streaming);
                        self.backoff.reset();
                    }
                    self.process(message, shutdown).await;
                }
                ReadOutcome::Idle => continue,
                ReadOutcome::EndOfStream(err) => return StreamEnd::Lost(err),
                ReadOutcome::Cancelled => return StreamEnd::Shutdown,
            }
        }
    }

    /// decode → extract → deliver
    async fn process(&self, message: TelemetryMessage, shutdown: &mut watch::Receiver<bool>) {
        self.stats.record_message();

        let record = match self.decoder.decode(&message) {
            Ok(record) => record,
            Err(err) => {
                self.stats.record_decode_error();
                warn!(
                    stage = "decode",
                    device = %self.settings.device,
                    arrival_index = message.arrival_index,
                    error = %err,
                    "메시지 건너뜀"
                );
                return;
            }
        };

        let metrics = self.extractor.extract(&record);
        if metrics.is_empty() {
            debug!(
                stage = "extract",
                device = %self.settings.device,
                path = %record.path,
                "추출된 메트릭 없음"
            );
            return;
        }
        self.stats.record_extracted(metrics.len());

        self.deliver(metrics, &record.path, shutdown).await;
    }

    /// 전송 정책에 따라 실패한 메트릭만 재전송
    async fn deliver(
        &self,
        metrics: Vec<Metric>,
        path: &str,
        shutdown: &mut watch::Receiver<bool>,
    ) {
        let policy = &self.settings.delivery;
        let mut pending = metrics;
        let mut attempt = 0u32;

        loop {
            let outcomes = self.sink.deliver(&pending).await;

            let mut failed = Vec::new();
            let mut last_reason = String::new();
            let mut delivered = 0usize;
            for outcome in outcomes {
                if let Some(reason) = outcome.failure_reason() {
                    last_reason = reason.to_string();
                    failed.push(outcome.metric);
                } else {
                    delivered += 1;
                }
            }
            self.stats.record_delivered(delivered);

            if failed.is_empty() {
                debug!(device = %self.settings.device, path, count = delivered, "전송 완료");
                return;
            }

            if attempt >= policy.max_retries || shutdown_requested(shutdown) {
                self.stats.record_failed(failed.len());
                warn!(
                    stage = "deliver",
                    device = %self.settings.device,
                    path,
                    count = failed.len(),
                    attempts = attempt + 1,
                    reason = %last_reason,
                    "전송 실패, 메트릭 버림"
                );
                return;
            }

            attempt += 1;
            debug!(
                stage = "deliver",
                device = %self.settings.device,
                path,
                count = failed.len(),
                attempt,
                reason = %last_reason,
                "실패한 메트릭 재전송 예정"
            );

            tokio::select! {
                biased;
                _ = wait_for_shutdown(shutdown) => {
                    self.stats.record_failed(failed.len());
                    warn!(
                        stage = "deliver",
                        device = %self.settings.device,
                        path,
                        count = failed.len(),
                        reason = %last_reason,
                        "종료 요청으로 재전송 취소"
                    );
                    return;
                }
                _ = tokio::time::sleep(policy.retry_delay()) => {}
            }
            pending = failed;
        }
    }

    fn terminate(&self, reason: TerminationReason) -> PipelineReport {
        self.transition(PipelineState::Terminated);

        let stats = self.stats.snapshot();
        let extraction = self.extractor.stats();
        info!(
            device = %self.settings.device,
            reason = ?reason,
            messages = stats.messages_received,
            decode_errors = stats.decode_errors,
            extracted = stats.metrics_extracted,
            delivered = stats.metrics_delivered,
            failed = stats.metrics_failed,
            reconnects = stats.reconnects,
            unmatched_records = extraction.records_unmatched,
            defaulted_values = extraction.values_defaulted,
            "파이프라인 종료"
        );

        PipelineReport {
            device: self.settings.device.clone(),
            reason,
            stats,
            extraction,
        }
    }
}
