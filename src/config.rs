use std::env;
use std::str::FromStr;

pub const DEFAULT_CODECHEF_URL: &str =
    "https://www.codechef.com/api/list/contests/all?sort_by=START&sorting_order=asc&offset=0";
pub const DEFAULT_CODEFORCES_URL: &str = "https://codeforces.com/api/contest.list";
pub const DEFAULT_DEVFOLIO_URL: &str =
    "https://devfolio.co/_next/data/JtO3J0dzXt3nDh-j8-16z/hackathons.json";
pub const DEFAULT_UNSTOP_URL: &str =
    "https://unstop.com/api/public/opportunity/search-result?opportunity=hackathons&oppstatus=open";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub rate_limit: RateLimitConfig,
    pub countdown: CountdownConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Single origin allowed by CORS. Read from env var `FRONTEND_URL`.
    pub frontend_url: String,
    /// Emit logs as JSON lines (`LOG_FORMAT=json`).
    pub json_logs: bool,
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub codechef_url: String,
    pub codeforces_url: String,
    /// Next.js data route of the Devfolio hackathons page. The build id in the
    /// path changes on every Devfolio deploy, so this is expected to be overridden.
    pub devfolio_url: String,
    /// Unstop search endpoint without the `page` parameter.
    pub unstop_url: String,
    pub timeout_seconds: u64,
    pub user_agent: String,
    /// Hard cap on Unstop pages read per request, whatever `last_page` claims.
    pub unstop_max_pages: u32,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Allowed requests per second (per IP) for /api endpoints
    pub api_per_second: u32,
    /// Burst size for /api endpoints
    pub api_burst: u32,
}

#[derive(Debug, Clone)]
pub struct CountdownConfig {
    /// Interval between two recomputations of a live countdown.
    pub tick_millis: u64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env_string("HOST", &defaults.server.host),
                port: match env::var("PORT") {
                    Ok(v) => v
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                    Err(_) => defaults.server.port,
                },
                frontend_url: env_string("FRONTEND_URL", &defaults.server.frontend_url),
                json_logs: matches!(
                    env::var("LOG_FORMAT").map(|v| v.to_lowercase()).as_deref(),
                    Ok("json")
                ),
            },
            upstream: UpstreamConfig {
                codechef_url: env_string("CODECHEF_API_URL", DEFAULT_CODECHEF_URL),
                codeforces_url: env_string("CODEFORCES_API_URL", DEFAULT_CODEFORCES_URL),
                devfolio_url: env_string("DEVFOLIO_API_URL", DEFAULT_DEVFOLIO_URL),
                unstop_url: env_string("UNSTOP_API_URL", DEFAULT_UNSTOP_URL),
                timeout_seconds: env_or(
                    "UPSTREAM_TIMEOUT_SECONDS",
                    defaults.upstream.timeout_seconds,
                ),
                user_agent: env_string("UPSTREAM_USER_AGENT", &defaults.upstream.user_agent),
                unstop_max_pages: env_or("UNSTOP_MAX_PAGES", defaults.upstream.unstop_max_pages)
                    .max(1),
            },
            rate_limit: RateLimitConfig {
                api_per_second: env_or("RATE_LIMIT_API_PER_SECOND", defaults.rate_limit.api_per_second)
                    .max(1),
                api_burst: env_or("RATE_LIMIT_API_BURST", defaults.rate_limit.api_burst).max(1),
            },
            countdown: CountdownConfig {
                tick_millis: env_or("COUNTDOWN_TICK_MILLIS", defaults.countdown.tick_millis)
                    .max(1),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                frontend_url: "http://localhost:3000".to_string(),
                json_logs: false,
            },
            upstream: UpstreamConfig {
                codechef_url: DEFAULT_CODECHEF_URL.to_string(),
                codeforces_url: DEFAULT_CODEFORCES_URL.to_string(),
                devfolio_url: DEFAULT_DEVFOLIO_URL.to_string(),
                unstop_url: DEFAULT_UNSTOP_URL.to_string(),
                timeout_seconds: 20,
                user_agent: concat!("hackfeed/", env!("CARGO_PKG_VERSION")).to_string(),
                unstop_max_pages: 25,
            },
            rate_limit: RateLimitConfig {
                api_per_second: 5,
                api_burst: 30,
            },
            countdown: CountdownConfig { tick_millis: 1000 },
        }
    }
}
