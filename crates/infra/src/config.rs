use std::{fmt::Display, str::FromStr, time::Duration};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    /// Number of workers processing candidates within one pass. This bounds
    /// the number of simultaneous push gateway calls and store connections.
    pub worker_pool_size: usize,
    /// Capacity of the job queue feeding the workers
    pub worker_queue_capacity: usize,
    /// How often the dispatch pass is triggered
    pub dispatch_interval: Duration,
    /// How often the recurrence pass is triggered
    pub recurrence_interval: Duration,
    /// After this duration no new candidates are started by a dispatch pass.
    /// Kept below `dispatch_interval` so that a pass is normally done before
    /// the next trigger fires.
    pub dispatch_pass_timeout: Duration,
    /// After this duration no new candidates are started by a recurrence pass
    pub recurrence_pass_timeout: Duration,
    /// Upper bound for the whole pipeline of a single candidate. A candidate
    /// running longer is abandoned and counted as an error.
    pub candidate_timeout: Duration,
    /// Timeout of a single request to the push gateway or document mirror
    pub http_request_timeout: Duration,
    pub http_connect_timeout: Duration,
}

fn parse_env<T>(key: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
{
    match std::env::var(key) {
        Ok(value) => match value.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "The given {}: {} is not valid, falling back to the default value: {}.",
                    key, value, default
                );
                default
            }
        },
        Err(_) => default,
    }
}

impl Config {
    pub fn new() -> Self {
        let mut worker_pool_size = parse_env("WORKER_POOL_SIZE", 10usize);
        if worker_pool_size == 0 {
            warn!("WORKER_POOL_SIZE must be at least 1, falling back to 1.");
            worker_pool_size = 1;
        }
        let worker_queue_capacity = std::cmp::max(parse_env("WORKER_QUEUE_CAPACITY", 100usize), 1);

        Self {
            worker_pool_size,
            worker_queue_capacity,
            dispatch_interval: Duration::from_secs(parse_env("DISPATCH_INTERVAL_SECS", 60)),
            recurrence_interval: Duration::from_secs(parse_env(
                "RECURRENCE_INTERVAL_SECS",
                60 * 60 * 24,
            )),
            dispatch_pass_timeout: Duration::from_secs(parse_env("DISPATCH_PASS_TIMEOUT_SECS", 55)),
            recurrence_pass_timeout: Duration::from_secs(parse_env(
                "RECURRENCE_PASS_TIMEOUT_SECS",
                30 * 60,
            )),
            candidate_timeout: Duration::from_secs(parse_env("CANDIDATE_TIMEOUT_SECS", 30)),
            http_request_timeout: Duration::from_secs(parse_env("HTTP_REQUEST_TIMEOUT_SECS", 10)),
            http_connect_timeout: Duration::from_secs(parse_env("HTTP_CONNECT_TIMEOUT_SECS", 5)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
