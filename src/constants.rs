//! Default tunables for import and verification. All of these can be
//! overridden through `SyncConfig` / `VerificationConfig`.

/// Number of entities requested from the source per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Consecutive per-item or fetch failures tolerated before a run is aborted.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// Base backoff between fetch retries, multiplied by the attempt number.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Fraction of stored entities re-checked per verification pass.
pub const DEFAULT_SAMPLE_FRACTION: f64 = 0.01;

/// Overall accuracy (percent) required for a verification report to pass.
pub const DEFAULT_ACCURACY_PASS_THRESHOLD: f64 = 95.0;
