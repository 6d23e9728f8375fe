//! Benchmark configuration
//!
//! Configuration is loaded from environment variables. Every field has a default
//! so a run only needs to override what differs from the reference deployment.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::engine::RetryPolicy;

/// Main benchmark configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Platform client configuration
    pub whisk: WhiskConfig,

    /// Benchmarked action
    pub action: ActionConfig,

    /// Request payload source
    pub payload: PayloadConfig,

    /// Which measurement to run
    pub mode: BenchMode,

    /// Burst mode configuration
    pub burst: BurstConfig,

    /// Rate sweep configuration
    pub rate_sweep: RateSweepConfig,

    /// Provisioned-concurrency sweep configuration
    pub provisioned: ProvisionedConfig,

    /// Result polling policy
    pub retry: RetryPolicy,

    /// Address for the Prometheus scrape endpoint (disabled when unset)
    pub metrics_addr: Option<SocketAddr>,
}

/// OpenWhisk connection settings
#[derive(Debug, Clone)]
pub struct WhiskConfig {
    /// API host, with or without scheme
    pub api_host: String,
    /// `user:key` credentials
    pub auth: Option<String>,
    /// Namespace ("_" for the default namespace)
    pub namespace: String,
    /// Accept self-signed certificates
    pub insecure: bool,
}

/// Action deployment settings
#[derive(Debug, Clone)]
pub struct ActionConfig {
    pub name: String,
    pub kind: String,
    pub image: String,
    /// Per-container concurrency limit
    pub concurrency: u32,
    /// Action timeout in milliseconds
    pub timeout_ms: u64,
    /// Create the action before running
    pub create: bool,
    /// Delete the action after running
    pub delete_after: bool,
}

/// Payload loading settings
#[derive(Debug, Clone)]
pub struct PayloadConfig {
    /// JSON file holding the request fields
    pub path: PathBuf,
    /// Override for the key service host inside the payload
    pub key_service_addr: Option<String>,
}

/// Measurement mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchMode {
    /// Fire one burst and repeat it until a clean round is seen
    Burst,
    /// Monotonic open-loop rate sweep
    RateSweep,
    /// Provisioned-concurrency sweep
    Provisioned,
}

impl BenchMode {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "burst" => Some(BenchMode::Burst),
            "rate-sweep" | "rate_sweep" | "rate" => Some(BenchMode::RateSweep),
            "provisioned" => Some(BenchMode::Provisioned),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BenchMode::Burst => "burst",
            BenchMode::RateSweep => "rate-sweep",
            BenchMode::Provisioned => "provisioned",
        }
    }
}

/// Burst mode settings
#[derive(Debug, Clone)]
pub struct BurstConfig {
    /// Invocations per burst
    pub size: usize,
    /// Give up after this many failed bursts
    pub max_attempts: usize,
}

/// Rate sweep settings
#[derive(Debug, Clone)]
pub struct RateSweepConfig {
    /// First target rate (requests/second)
    pub start_rate: u32,
    /// Last target rate, inclusive
    pub end_rate: u32,
    /// Rate increment between measurement steps
    pub step: u32,
    /// How long each rate is held
    pub duration: Duration,
    /// Burst increment used when warming up to the next rate
    pub warmup_step: u32,
}

/// Provisioned-concurrency sweep settings
#[derive(Debug, Clone)]
pub struct ProvisionedConfig {
    /// Highest provisioned level tested
    pub max_provisioned: usize,
    /// Idle time between levels
    pub cooldown: Duration,
    /// Test bursts per test concurrency
    pub repetitions: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            whisk: WhiskConfig::default(),
            action: ActionConfig::default(),
            payload: PayloadConfig::default(),
            mode: BenchMode::Burst,
            burst: BurstConfig::default(),
            rate_sweep: RateSweepConfig::default(),
            provisioned: ProvisionedConfig::default(),
            retry: RetryPolicy::default(),
            metrics_addr: None,
        }
    }
}

impl Default for WhiskConfig {
    fn default() -> Self {
        Self {
            api_host: "localhost:31001".to_string(),
            auth: None,
            namespace: "_".to_string(),
            insecure: false,
        }
    }
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            name: "crtw-tvm-mb-4".to_string(),
            kind: "blackbox".to_string(),
            image: "hugy718/wsk-blackbox-action:latest".to_string(),
            concurrency: 4,
            timeout_ms: 300_000, // 5 minutes
            create: false,
            delete_after: false,
        }
    }
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tvm_mb_req.json"),
            key_service_addr: None,
        }
    }
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            size: 128,
            max_attempts: 5,
        }
    }
}

impl Default for RateSweepConfig {
    fn default() -> Self {
        Self {
            start_rate: 20,
            end_rate: 200,
            step: 20,
            duration: Duration::from_secs(60),
            warmup_step: 4,
        }
    }
}

impl Default for ProvisionedConfig {
    fn default() -> Self {
        Self {
            max_provisioned: 4,
            cooldown: Duration::from_secs(10 * 60),
            repetitions: 3,
        }
    }
}

/// Parse a boolean flag the way operators write them
fn parse_flag(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

/// Parse a (possibly fractional) number of seconds
fn parse_secs(val: &str) -> Option<Duration> {
    Duration::try_from_secs_f64(val.parse::<f64>().ok()?).ok()
}

/// Parse a (possibly fractional) number of minutes
fn parse_minutes(val: &str) -> Option<Duration> {
    let mins = val.parse::<f64>().ok()?;
    Duration::try_from_secs_f64(mins * 60.0).ok()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Platform config
        if let Ok(host) = env::var("WHISK_APIHOST")
            && !host.is_empty()
        {
            config.whisk.api_host = host;
        }
        if let Ok(auth) = env::var("WHISK_AUTH")
            && !auth.is_empty()
        {
            config.whisk.auth = Some(auth);
        }
        if let Ok(ns) = env::var("WHISK_NAMESPACE")
            && !ns.is_empty()
        {
            config.whisk.namespace = ns;
        }
        if let Ok(val) = env::var("WHISK_INSECURE") {
            config.whisk.insecure = parse_flag(&val);
        }

        // Action config
        if let Ok(name) = env::var("ACTION_NAME")
            && !name.is_empty()
        {
            config.action.name = name;
        }
        if let Ok(kind) = env::var("ACTION_KIND") {
            config.action.kind = kind;
        }
        if let Ok(image) = env::var("ACTION_IMAGE") {
            config.action.image = image;
        }
        if let Ok(val) = env::var("ACTION_CONCURRENCY")
            && let Ok(v) = val.parse()
        {
            config.action.concurrency = v;
        }
        if let Ok(val) = env::var("ACTION_CREATE") {
            config.action.create = parse_flag(&val);
        }
        if let Ok(val) = env::var("ACTION_DELETE_AFTER") {
            config.action.delete_after = parse_flag(&val);
        }

        // Payload config
        if let Ok(path) = env::var("PAYLOAD_PATH")
            && !path.is_empty()
        {
            config.payload.path = PathBuf::from(path);
        }
        if let Ok(addr) = env::var("KEY_SERVICE_ADDRESS")
            && !addr.is_empty()
        {
            config.payload.key_service_addr = Some(addr);
        }

        // Mode
        if let Ok(val) = env::var("BENCH_MODE")
            && let Some(mode) = BenchMode::parse(&val)
        {
            config.mode = mode;
        }

        // Burst config
        if let Ok(val) = env::var("BURST_SIZE")
            && let Ok(v) = val.parse()
        {
            config.burst.size = v;
        }
        if let Ok(val) = env::var("BURST_MAX_ATTEMPTS")
            && let Ok(v) = val.parse()
        {
            config.burst.max_attempts = v;
        }

        // Rate sweep config
        if let Ok(val) = env::var("SWEEP_START_RATE")
            && let Ok(v) = val.parse()
        {
            config.rate_sweep.start_rate = v;
        }
        if let Ok(val) = env::var("SWEEP_END_RATE")
            && let Ok(v) = val.parse()
        {
            config.rate_sweep.end_rate = v;
        }
        if let Ok(val) = env::var("SWEEP_STEP")
            && let Ok(v) = val.parse()
        {
            config.rate_sweep.step = v;
        }
        if let Ok(val) = env::var("SWEEP_DURATION_MINS")
            && let Some(d) = parse_minutes(&val)
        {
            config.rate_sweep.duration = d;
        }
        if let Ok(val) = env::var("SWEEP_WARMUP_STEP")
            && let Ok(v) = val.parse()
        {
            config.rate_sweep.warmup_step = v;
        }

        // Provisioned config
        if let Ok(val) = env::var("PROVISIONED_MAX")
            && let Ok(v) = val.parse()
        {
            config.provisioned.max_provisioned = v;
        }
        if let Ok(val) = env::var("PROVISIONED_COOLDOWN_MINS")
            && let Some(d) = parse_minutes(&val)
        {
            config.provisioned.cooldown = d;
        }
        if let Ok(val) = env::var("PROVISIONED_REPETITIONS")
            && let Ok(v) = val.parse()
        {
            config.provisioned.repetitions = v;
        }

        // Retry policy
        if let Ok(val) = env::var("RETRY_BUDGET")
            && let Ok(v) = val.parse()
        {
            config.retry.max_retries = v;
        }
        if let Ok(val) = env::var("RETRY_DELAY_SECS")
            && let Some(delay) = parse_secs(&val)
        {
            config.retry.delay = delay;
        }

        // Metrics
        if let Ok(val) = env::var("METRICS_ADDR")
            && let Ok(addr) = val.parse()
        {
            config.metrics_addr = Some(addr);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.whisk.namespace, "_");
        assert_eq!(config.action.concurrency, 4);
        assert_eq!(config.mode, BenchMode::Burst);
        assert_eq!(config.retry.max_retries, 18);
        assert_eq!(config.retry.delay, Duration::from_secs(2));
        assert_eq!(config.provisioned.repetitions, 3);
        assert!(config.metrics_addr.is_none());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(BenchMode::parse("RATE-SWEEP"), Some(BenchMode::RateSweep));
        assert_eq!(BenchMode::parse("provisioned"), Some(BenchMode::Provisioned));
        assert_eq!(BenchMode::parse("closed-loop"), None);
        assert_eq!(BenchMode::Burst.name(), "burst");
    }

    #[test]
    fn test_parse_minutes() {
        assert_eq!(parse_minutes("0.1"), Some(Duration::from_secs(6)));
        assert_eq!(parse_minutes("-1"), None);
        assert_eq!(parse_minutes("soon"), None);
        // Finite but beyond what a Duration can hold
        assert_eq!(parse_minutes("1e300"), None);
        assert_eq!(parse_minutes("inf"), None);
    }

    #[test]
    fn test_parse_secs() {
        assert_eq!(parse_secs("2"), Some(Duration::from_secs(2)));
        assert_eq!(parse_secs("0.5"), Some(Duration::from_millis(500)));
        assert_eq!(parse_secs("-3"), None);
        assert_eq!(parse_secs("1e300"), None);
        assert_eq!(parse_secs("NaN"), None);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("no"));
    }
}
