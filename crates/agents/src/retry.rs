//! Retrying kickoff for whole pipeline runs.
//!
//! Every attempt re-runs the pipeline from its first task. Nothing from a
//! failed attempt is carried into the next one.

use std::time::Duration;

use scribe_common::{Inputs, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::crew::{CrewOutput, Pipeline};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts in total, including the first one.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Wait before the given 1-based attempt. The first attempt starts
    /// immediately; attempt n waits `initial * multiplier^(n-2)`, capped.
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        if attempt < 2 {
            return None;
        }
        let exponent = (attempt - 2).min(i32::MAX as u32) as i32;
        let base = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let delay = if base.is_finite() {
            (base as u64).min(self.max_delay_ms)
        } else {
            self.max_delay_ms
        };
        Some(Duration::from_millis(delay))
    }
}

/// Kick off `pipeline`, retrying transient failures under `policy`.
///
/// Returns the first successful output unchanged. The error of the final
/// attempt is returned once attempts run out; non-transient errors are
/// returned right away.
pub async fn kickoff_with_retry(
    pipeline: &dyn Pipeline,
    inputs: &Inputs,
    policy: &RetryPolicy,
) -> Result<CrewOutput> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        if let Some(delay) = policy.delay_before(attempt) {
            tokio::time::sleep(delay).await;
        }

        match pipeline.kickoff(inputs).await {
            Ok(output) => {
                if attempt > 1 {
                    info!(pipeline = %pipeline.name(), attempt, "Pipeline succeeded after retry");
                }
                return Ok(output);
            }
            Err(e) => {
                if attempt >= max_attempts || !e.is_transient() {
                    return Err(e);
                }
                warn!(
                    pipeline = %pipeline.name(),
                    attempt,
                    max_attempts,
                    delay_ms = policy
                        .delay_before(attempt + 1)
                        .map(|d| d.as_millis() as u64)
                        .unwrap_or_default(),
                    error = %e,
                    "Retrying pipeline"
                );
                attempt += 1;
            }
        }
    }
}
