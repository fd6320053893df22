//! Poll cadence and transient-failure retry policy.
//!
//! Every polling loop in the orchestrator is bounded: a base interval
//! with jitter between observations, exponential backoff for transient
//! provider failures up to a fixed attempt count, and a maximum lifetime
//! after which the loop's subject is forced to `Failed` instead of
//! running unbounded.

use backoff::ExponentialBackoff;
use catering_config::PollConfig;
use catering_types::ProviderError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Bounds for one polling loop.
#[derive(Debug, Clone)]
pub struct PollPolicy {
	/// Base delay between polls.
	pub interval: Duration,
	/// Multiplier applied to retry delays after transient failures.
	pub backoff_multiplier: f64,
	/// Jitter fraction in [0, 1) applied to every delay.
	pub jitter: f64,
	/// Maximum lifetime of the whole loop.
	pub max_lifetime: Duration,
	/// Maximum transient-failure attempts per provider call.
	pub max_attempts: u32,
}

impl From<&PollConfig> for PollPolicy {
	fn from(config: &PollConfig) -> Self {
		Self {
			interval: config.interval(),
			backoff_multiplier: config.backoff_multiplier,
			jitter: config.jitter,
			max_lifetime: config.max_lifetime(),
			max_attempts: config.max_attempts,
		}
	}
}

impl PollPolicy {
	/// The base interval with jitter applied.
	pub fn jittered_interval(&self) -> Duration {
		if self.jitter <= 0.0 {
			return self.interval;
		}
		let spread = self.interval.as_secs_f64() * self.jitter;
		let offset = rand::thread_rng().gen_range(-spread..=spread);
		Duration::from_secs_f64((self.interval.as_secs_f64() + offset).max(0.0))
	}

	/// Backoff schedule for transient provider failures, capped by the
	/// caller's remaining time budget.
	fn retry_backoff(&self, budget: Duration) -> ExponentialBackoff {
		backoff::ExponentialBackoffBuilder::new()
			.with_initial_interval(self.interval)
			.with_multiplier(self.backoff_multiplier)
			.with_randomization_factor(self.jitter)
			.with_max_elapsed_time(Some(budget.min(self.max_lifetime)))
			.build()
	}
}

/// Runs a provider call, retrying transient failures with exponential
/// backoff up to the policy's attempt bound.
///
/// The retry window is additionally capped by `budget`, the caller's
/// remaining lifetime: retries spend the loop's deadline, they never
/// extend it. Permanent errors and unmapped statuses are returned
/// immediately; a transient error that outlives either bound is
/// returned as-is for the caller to escalate.
pub async fn retry_transient<T, F, Fut>(
	policy: &PollPolicy,
	budget: Duration,
	mut op: F,
) -> Result<T, ProviderError>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, ProviderError>>,
{
	let max_attempts = policy.max_attempts;
	let mut attempts = 0u32;
	backoff::future::retry(policy.retry_backoff(budget), || {
		attempts += 1;
		let attempt = attempts;
		let fut = op();
		async move {
			match fut.await {
				Ok(value) => Ok(value),
				Err(e) if e.is_transient() && attempt < max_attempts => {
					tracing::warn!(attempt, error = %e, "Transient provider error, retrying");
					Err(backoff::Error::transient(e))
				}
				Err(e) => Err(backoff::Error::permanent(e)),
			}
		}
	})
	.await
}
