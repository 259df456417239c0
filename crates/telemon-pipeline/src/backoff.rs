//! 재연결 exponential backoff.
//!
//! 지터는 기준 지연에 더하기만 하므로 연속 지연은 최대값까지 감소하지 않는다.
//! 스트리밍 전이에 성공하면 `reset()`으로 처음 값부터 다시 시작한다.

use rand::Rng;
use std::time::Duration;
use telemon_core::config::BackoffConfig;

#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    jitter: f64,
    max_retries: Option<u32>,
    base: Duration,
    last: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(config: &BackoffConfig) -> Self {
        let initial = config.initial_delay().min(config.max_delay());
        Self {
            initial,
            max: config.max_delay(),
            multiplier: config.multiplier.max(1.0),
            jitter: config.jitter.clamp(0.0, 1.0),
            max_retries: config.max_retries,
            base: initial,
            last: Duration::ZERO,
            attempts: 0,
        }
    }

    /// 다음 대기 시간. 재시도 한도를 다 쓰면 `None`.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.max_retries.is_some_and(|max| self.attempts >= max) {
            return None;
        }
        self.attempts += 1;

        let span = self.base.as_secs_f64() * self.jitter;
        let extra = if span > 0.0 {
            rand::rng().random_range(0.0..=span)
        } else {
            0.0
        };

        let delay = (self.base + Duration::from_secs_f64(extra))
            .min(self.max)
            .max(self.last);
        self.last = delay;
        let next_nanos = (self.base.as_nanos() as f64 * self.multiplier).round();
        self.base = if next_nanos >= self.max.as_nanos() as f64 {
            self.max
        } else {
            Duration::from_nanos(next_nanos as u64)
        };

        Some(delay)
    }

    pub fn reset(&mut self) {
        self.base = self.initial;
        self.last = Duration::ZERO;
        self.attempts = 0;
    }

    /// 마지막 reset 이후 재시도 횟수
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
