use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub extraction: ExtractionConfig,
    pub monitor: MonitorConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub user_agent: String,
    pub navigation_timeout_ms: u64,
    pub settle_delay_ms: u64,
    pub chrome_path: Option<String>,
    pub headless: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            navigation_timeout_ms: 30_000,
            settle_delay_ms: 2_000,
            chrome_path: None,
            headless: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Parsed prices above this are treated as misparses (concatenated SKU digits, order totals).
    pub price_ceiling: f64,
    pub body_wait_timeout_ms: u64,
    pub scoring: ScoringConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            price_ceiling: 10_000.0,
            body_wait_timeout_ms: 10_000,
            scoring: ScoringConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordWeight {
    pub keyword: String,
    pub weight: i32,
}

impl KeywordWeight {
    pub fn new(keyword: &str, weight: i32) -> Self {
        Self {
            keyword: keyword.to_string(),
            weight,
        }
    }
}

/// Tunables for the likelihood scorer. The defaults are empirical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub short_text_threshold: usize,
    pub positive_keywords: Vec<KeywordWeight>,
    pub negative_keywords: Vec<KeywordWeight>,
    pub clean_format_bonus: i32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            short_text_threshold: 50,
            positive_keywords: vec![
                KeywordWeight::new("price", 5),
                KeywordWeight::new("current", 4),
                KeywordWeight::new("now", 4),
                KeywordWeight::new("sale", 3),
                KeywordWeight::new("final", 3),
                KeywordWeight::new("retail", 2),
                KeywordWeight::new("amount", 2),
            ],
            negative_keywords: vec![
                KeywordWeight::new("strike", -5),
                KeywordWeight::new("was", -5),
                KeywordWeight::new("list", -5),
                KeywordWeight::new("original", -5),
                KeywordWeight::new("msrp", -5),
                KeywordWeight::new("compare", -3),
                KeywordWeight::new("shipping", -3),
                KeywordWeight::new("tax", -3),
            ],
            clean_format_bonus: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub retry_attempts: usize,
    pub retry_delay_ms: u64,
    pub inter_product_delay_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 2,
            retry_delay_ms: 5_000,
            inter_product_delay_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("PRICEDROP").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        if config.scraper.chrome_path.is_none() {
            config.scraper.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scraper.user_agent.trim().is_empty() {
            return Err(ConfigError::Message("Scraper user_agent must not be empty".into()));
        }

        if !(15_000..=30_000).contains(&self.scraper.navigation_timeout_ms) {
            return Err(ConfigError::Message(
                "Scraper navigation_timeout_ms must be between 15000 and 30000".into(),
            ));
        }

        if !self.extraction.price_ceiling.is_finite() || self.extraction.price_ceiling <= 0.0 {
            return Err(ConfigError::Message("Extraction price_ceiling must be greater than 0".into()));
        }

        if self.extraction.body_wait_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Extraction body_wait_timeout_ms must be greater than 0".into(),
            ));
        }

        let scoring = &self.extraction.scoring;
        if scoring.short_text_threshold == 0 {
            return Err(ConfigError::Message(
                "Scoring short_text_threshold must be greater than 0".into(),
            ));
        }

        if scoring.positive_keywords.iter().any(|k| k.weight <= 0) {
            return Err(ConfigError::Message("Positive keyword weights must be greater than 0".into()));
        }

        if scoring.negative_keywords.iter().any(|k| k.weight >= 0) {
            return Err(ConfigError::Message("Negative keyword weights must be less than 0".into()));
        }

        Ok(())
    }
}
