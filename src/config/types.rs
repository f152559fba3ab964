use serde::Deserialize;

/// Default starting rate (requests per second)
pub const DEFAULT_INITIAL_RATE: f64 = 10.0;

/// Default ceiling for the rate (requests per second)
pub const DEFAULT_MAX_RATE: f64 = 20.0;

/// Default floor for the rate (requests per second)
pub const DEFAULT_MIN_RATE: f64 = 1.0;

/// Default fraction of the current rate added or removed per adjustment
pub const DEFAULT_ADJUSTMENT_FACTOR: f64 = 0.1;

/// Responses slower than this back the rate off (milliseconds)
pub const DEFAULT_SLOW_THRESHOLD_MS: u64 = 5000;

/// Responses faster than this speed the rate up (milliseconds)
pub const DEFAULT_FAST_THRESHOLD_MS: u64 = 200;

/// Main configuration structure for the adaptive fetcher
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub rate: RateConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Rate controller tuning
///
/// Fixed for the lifetime of a controller. Tests inject tight thresholds
/// through this struct instead of waiting on real slow servers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RateConfig {
    /// Rate the limiter starts with (requests per second)
    pub initial_rate: f64,

    /// Upper bound for the rate
    pub max_rate: f64,

    /// Lower bound for the rate
    pub min_rate: f64,

    /// Multiplicative step applied on a slow or fast response
    pub adjustment_factor: f64,

    /// Latency above which the rate is decreased (milliseconds)
    pub slow_threshold_ms: u64,

    /// Latency below which the rate is increased (milliseconds)
    pub fast_threshold_ms: u64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            initial_rate: DEFAULT_INITIAL_RATE,
            max_rate: DEFAULT_MAX_RATE,
            min_rate: DEFAULT_MIN_RATE,
            adjustment_factor: DEFAULT_ADJUSTMENT_FACTOR,
            slow_threshold_ms: DEFAULT_SLOW_THRESHOLD_MS,
            fast_threshold_ms: DEFAULT_FAST_THRESHOLD_MS,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct UserAgentConfig {
    /// Product name sent in the User-Agent header
    pub name: String,

    /// Product version sent in the User-Agent header
    pub version: String,

    /// URL with information about the fetcher
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `Name/Version` or `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!("{}/{} (+{})", self.name, self.version, contact),
            None => format!("{}/{}", self.name, self.version),
        }
    }
}

/// HTTP fetch configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct FetchConfig {
    /// Target URL; the command line may supply or override it
    pub url: Option<String>,

    /// Total request timeout (seconds)
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    pub connect_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}
