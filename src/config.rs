use crate::extractor::StrategyKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: u32,
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_concurrent() -> u32 {
    10
}

fn default_allowed_origin() -> String {
    "https://threadsvid.com".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_download_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_concurrent: default_max_concurrent(),
            allowed_origin: default_allowed_origin(),
            static_dir: default_static_dir(),
            download_timeout_secs: default_download_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    #[serde(default = "default_true")]
    pub headless: bool,
    /// How long the session may sit without traffic before Chrome is
    /// considered gone.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_viewport_width() -> u32 {
    1920
}

fn default_viewport_height() -> u32 {
    1080
}

fn default_true() -> bool {
    true
}

fn default_idle_timeout() -> u64 {
    24 * 60 * 60
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            proxy: None,
            user_agent: default_user_agent(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            headless: true,
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

/// Per-phase deadlines, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_navigation_ms")]
    pub navigation_ms: u64,
    #[serde(default = "default_navigation_ms")]
    pub load_wait_ms: u64,
    #[serde(default = "default_element_wait_ms")]
    pub element_wait_ms: u64,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_element_settle_ms")]
    pub element_settle_ms: u64,
    #[serde(default = "default_classify_ms")]
    pub classify_probe_ms: u64,
    #[serde(default = "default_element_wait_ms")]
    pub dom_strategy_ms: u64,
    #[serde(default = "default_markup_ms")]
    pub markup_strategy_ms: u64,
}

fn default_navigation_ms() -> u64 {
    15_000
}

fn default_element_wait_ms() -> u64 {
    5_000
}

fn default_settle_ms() -> u64 {
    1_000
}

fn default_element_settle_ms() -> u64 {
    500
}

fn default_classify_ms() -> u64 {
    3_000
}

fn default_markup_ms() -> u64 {
    2_000
}

impl TimeoutConfig {
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn load_wait(&self) -> Duration {
        Duration::from_millis(self.load_wait_ms)
    }

    pub fn element_wait(&self) -> Duration {
        Duration::from_millis(self.element_wait_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn element_settle(&self) -> Duration {
        Duration::from_millis(self.element_settle_ms)
    }

    pub fn classify_probe(&self) -> Duration {
        Duration::from_millis(self.classify_probe_ms)
    }

    pub fn dom_strategy(&self) -> Duration {
        Duration::from_millis(self.dom_strategy_ms)
    }

    pub fn markup_strategy(&self) -> Duration {
        Duration::from_millis(self.markup_strategy_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            navigation_ms: default_navigation_ms(),
            load_wait_ms: default_navigation_ms(),
            element_wait_ms: default_element_wait_ms(),
            settle_ms: default_settle_ms(),
            element_settle_ms: default_element_settle_ms(),
            classify_probe_ms: default_classify_ms(),
            dom_strategy_ms: default_element_wait_ms(),
            markup_strategy_ms: default_markup_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Active strategy chain, in priority order.
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategyKind>,
}

fn default_strategies() -> Vec<StrategyKind> {
    StrategyKind::DEFAULT_ORDER.to_vec()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            browser: BrowserConfig::default(),
            timeouts: TimeoutConfig::default(),
            strategies: default_strategies(),
        }
    }
}

impl Config {
    /// Environment variables win over the file: `PORT`, `CHROME_PATH`,
    /// `HTTP_PROXY`.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(path) = lookup("CHROME_PATH").filter(|p| !p.is_empty()) {
            self.browser.chrome_path = Some(PathBuf::from(path));
        }
        if let Some(proxy) = lookup("HTTP_PROXY").filter(|p| !p.is_empty()) {
            self.browser.proxy = Some(proxy);
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("tget")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.yml")
}

pub fn get_config() -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = load_config_from(&config_path())?;
    config.apply_env();
    Ok(config)
}

pub fn load_config_from(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

pub fn save_config(config: &Config, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_yaml::to_string(config)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Write the default configuration to `path`. An existing file is kept
/// unless `force` is set; the return value says whether anything was written.
pub fn init_config(path: &Path, force: bool) -> Result<bool, Box<dyn std::error::Error>> {
    if path.exists() && !force {
        return Ok(false);
    }
    save_config(&Config::default(), path)?;
    Ok(true)
}
