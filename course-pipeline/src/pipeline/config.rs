use std::time::Duration;

use common::utils::{config::AppConfig, ingest_limits::IngestLimits};
use tokio_retry::strategy::ExponentialBackoff;

use crate::types::ErrorClass;

/// Attempt ceiling and per-class backoff shared by the map and reduce stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub transient_backoff_ms: u64,
    pub transient_max_delay_ms: u64,
    pub rate_limit_backoff_ms: u64,
    pub rate_limit_max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            transient_backoff_ms: 1_000,
            transient_max_delay_ms: 30_000,
            rate_limit_backoff_ms: 5_000,
            rate_limit_max_delay_ms: 60_000,
        }
    }
}

impl RetryPolicy {
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the `failed_attempt`-th attempt (1-based) failed with `class`.
    /// Doubles per attempt starting at twice the class base; rate limits use the larger base.
    pub fn delay_for(&self, class: ErrorClass, failed_attempt: u32) -> Duration {
        let (factor, cap) = match class {
            ErrorClass::RateLimited => (self.rate_limit_backoff_ms, self.rate_limit_max_delay_ms),
            ErrorClass::QuotaExceeded | ErrorClass::Timeout | ErrorClass::Unknown => {
                (self.transient_backoff_ms, self.transient_max_delay_ms)
            }
        };
        let cap = Duration::from_millis(cap);
        let step = usize::try_from(failed_attempt.saturating_sub(1)).unwrap_or(usize::MAX);

        ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(cap)
            .nth(step)
            .unwrap_or(cap)
    }
}

#[derive(Debug, Clone)]
pub struct CourseTuning {
    pub max_total_chars: usize,
    pub min_source_chars: usize,
    pub min_total_chars: usize,
    pub chunk_trigger_threshold: usize,
    pub chunk_target_size: usize,
    pub max_chunks: usize,
    pub min_summary_chars: usize,
    pub section_char_limit: usize,
    pub inter_chunk_delay_ms: u64,
    pub map_retry: RetryPolicy,
    pub reduce_retry: RetryPolicy,
}

impl Default for CourseTuning {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for CourseTuning {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_total_chars: config.max_total_chars,
            min_source_chars: config.min_source_chars,
            min_total_chars: config.min_total_chars,
            chunk_trigger_threshold: config.chunk_trigger_threshold,
            chunk_target_size: config.chunk_target_size,
            max_chunks: config.max_chunks,
            min_summary_chars: config.min_summary_chars,
            section_char_limit: config.section_char_limit,
            inter_chunk_delay_ms: config.inter_chunk_delay_ms,
            map_retry: RetryPolicy {
                max_attempts: config.map_max_attempts,
                transient_backoff_ms: config.transient_backoff_ms,
                transient_max_delay_ms: config.transient_max_delay_ms,
                rate_limit_backoff_ms: config.rate_limit_backoff_ms,
                rate_limit_max_delay_ms: config.rate_limit_max_delay_ms,
            },
            reduce_retry: RetryPolicy::single_attempt(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CourseConfig {
    pub limits: IngestLimits,
    pub tuning: CourseTuning,
}

impl From<&AppConfig> for CourseConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            limits: IngestLimits::from(config),
            tuning: CourseTuning::from(config),
        }
    }
}
