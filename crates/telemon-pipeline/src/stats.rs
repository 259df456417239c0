//! 파이프라인 카운터.

use std::sync::atomic::{AtomicU64, Ordering};

/// 파이프라인 단위 카운터 (락 없음)
#[derive(Debug, Default)]
pub struct PipelineStats {
    messages_received: AtomicU64,
    decode_errors: AtomicU64,
    metrics_extracted: AtomicU64,
    metrics_delivered: AtomicU64,
    metrics_failed: AtomicU64,
    reconnects: AtomicU64,
}

impl PipelineStats {
    pub fn record_message(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_extracted(&self, count: usize) {
        self.metrics_extracted.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_delivered(&self, count: usize) {
        self.metrics_delivered.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// 재시도까지 실패해 버려진 메트릭
    pub fn record_failed(&self, count: usize) {
        self.metrics_failed.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            metrics_extracted: self.metrics_extracted.load(Ordering::Relaxed),
            metrics_delivered: self.metrics_delivered.load(Ordering::Relaxed),
            metrics_failed: self.metrics_failed.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

/// 카운터 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStatsSnapshot {
    pub messages_received: u64,
    pub decode_errors: u64,
    pub metrics_extracted: u64,
    pub metrics_delivered: u64,
    pub metrics_failed: u64,
    /// Backoff → Connecting 전이 횟수
    pub reconnects: u64,
}
