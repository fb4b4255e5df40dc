use std::path::PathBuf;
use std::time::Duration;

use psgc_core::intake::DEFAULT_MAX_UPLOAD_BYTES;

/// Default number of rows committed per transaction.
pub const DEFAULT_BATCH_SIZE: usize = 500;
/// Default age after which a non-terminal job is considered abandoned.
const DEFAULT_JOB_TTL_SECS: u64 = 3600;
/// Default age after which a finished but never-cleaned job is evicted.
const DEFAULT_TERMINAL_RETENTION_SECS: u64 = 86_400;
/// Default time between sweeps.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
/// Default number of jobs processed at once.
const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;
/// Default cap on row errors kept per job.
pub const DEFAULT_MAX_RECORDED_ERRORS: usize = 1000;

/// What a worker does when a data row fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowErrorPolicy {
    /// Record the row error and keep going.
    Skip,
    /// Fail the job at the first invalid row.
    Abort,
}

impl RowErrorPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Abort => "abort",
        }
    }

    /// Parse a policy name. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Some(Self::Skip),
            "abort" => Some(Self::Abort),
            _ => None,
        }
    }
}

/// Import pipeline configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Directory uploaded files are stored in until cleanup.
    pub upload_dir: PathBuf,
    /// Rows committed per transaction.
    pub batch_size: usize,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
    /// Non-terminal jobs idle for longer than this are swept.
    pub job_ttl: Duration,
    /// Terminal jobs older than this are swept even without cleanup.
    pub terminal_retention: Duration,
    /// Time between sweeps.
    pub sweep_interval: Duration,
    /// Upper bound on concurrently running import workers.
    pub max_concurrent_jobs: usize,
    pub row_error_policy: RowErrorPolicy,
    /// Row errors kept per job; the failed-row counter stays exact.
    pub max_recorded_errors: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            upload_dir: std::env::temp_dir().join("psgc-uploads"),
            batch_size: DEFAULT_BATCH_SIZE,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            job_ttl: Duration::from_secs(DEFAULT_JOB_TTL_SECS),
            terminal_retention: Duration::from_secs(DEFAULT_TERMINAL_RETENTION_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            row_error_policy: RowErrorPolicy::Skip,
            max_recorded_errors: DEFAULT_MAX_RECORDED_ERRORS,
        }
    }
}

impl ImportConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                  |
    /// |----------------------------------|--------------------------|
    /// | `IMPORT_UPLOAD_DIR`              | `$TMPDIR/psgc-uploads`   |
    /// | `IMPORT_BATCH_SIZE`              | `500`                    |
    /// | `IMPORT_MAX_UPLOAD_BYTES`        | `52428800`               |
    /// | `IMPORT_JOB_TTL_SECS`            | `3600`                   |
    /// | `IMPORT_TERMINAL_RETENTION_SECS` | `86400`                  |
    /// | `IMPORT_SWEEP_INTERVAL_SECS`     | `300`                    |
    /// | `IMPORT_MAX_CONCURRENT_JOBS`     | `4`                      |
    /// | `IMPORT_ROW_ERROR_POLICY`        | `skip`                   |
    /// | `IMPORT_MAX_RECORDED_ERRORS`     | `1000`                   |
    ///
    /// # Panics
    ///
    /// Panics on unparsable values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let upload_dir = std::env::var("IMPORT_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.upload_dir);

        let batch_size: usize = env_or("IMPORT_BATCH_SIZE", DEFAULT_BATCH_SIZE);
        assert!(batch_size > 0, "IMPORT_BATCH_SIZE must be greater than zero");

        let max_concurrent_jobs: usize = env_or("IMPORT_MAX_CONCURRENT_JOBS", DEFAULT_MAX_CONCURRENT_JOBS);
        assert!(
            max_concurrent_jobs > 0,
            "IMPORT_MAX_CONCURRENT_JOBS must be greater than zero"
        );

        let row_error_policy = match std::env::var("IMPORT_ROW_ERROR_POLICY") {
            Ok(v) => RowErrorPolicy::from_str(&v)
                .unwrap_or_else(|| panic!("IMPORT_ROW_ERROR_POLICY must be 'skip' or 'abort', got '{v}'")),
            Err(_) => defaults.row_error_policy,
        };

        Self {
            upload_dir,
            batch_size,
            max_upload_bytes: env_or("IMPORT_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            job_ttl: Duration::from_secs(env_or("IMPORT_JOB_TTL_SECS", DEFAULT_JOB_TTL_SECS)),
            terminal_retention: Duration::from_secs(env_or(
                "IMPORT_TERMINAL_RETENTION_SECS",
                DEFAULT_TERMINAL_RETENTION_SECS,
            )),
            sweep_interval: Duration::from_secs(env_or(
                "IMPORT_SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )),
            max_concurrent_jobs,
            row_error_policy,
            max_recorded_errors: env_or("IMPORT_MAX_RECORDED_ERRORS", DEFAULT_MAX_RECORDED_ERRORS),
        }
    }
}

/// Read and parse an env var, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid number: {e}")),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ImportConfig::default();
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.job_ttl, Duration::from_secs(3600));
        assert_eq!(config.row_error_policy, RowErrorPolicy::Skip);
        assert!(config.upload_dir.ends_with("psgc-uploads"));
    }

    #[test]
    fn policy_parsing_is_case_insensitive() {
        assert_eq!(RowErrorPolicy::from_str("ABORT"), Some(RowErrorPolicy::Abort));
        assert_eq!(RowErrorPolicy::from_str(" skip "), Some(RowErrorPolicy::Skip));
        assert_eq!(RowErrorPolicy::from_str("retry"), None);
    }

    #[test]
    fn policy_round_trip() {
        for policy in [RowErrorPolicy::Skip, RowErrorPolicy::Abort] {
            assert_eq!(RowErrorPolicy::from_str(policy.as_str()), Some(policy));
        }
    }
}
