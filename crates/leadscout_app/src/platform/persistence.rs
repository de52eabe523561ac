use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use leadscout_engine::{HttpSettings, RetryPolicy, RunOptions, ScrapeSettings, SheetTarget};
use leadscout_logging::{redact, scout_info, scout_warn};
use serde::{Deserialize, Serialize};

const SETTINGS_FILENAME: &str = "settings.ron";
const DEFAULT_WORKSHEET: &str = "Sheet1";

/// Everything `leadscout` persists between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub youtube_api_keys: Vec<String>,
    pub sheet_id: String,
    pub worksheet_name: String,
    pub service_account_file: Option<PathBuf>,
    pub tuning: Tuning,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            youtube_api_keys: Vec::new(),
            sheet_id: String::new(),
            worksheet_name: DEFAULT_WORKSHEET.to_string(),
            service_account_file: None,
            tuning: Tuning::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub results_per_page: usize,
    pub detail_batch_size: usize,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub max_pages_per_keyword: Option<usize>,
    pub max_leads_per_keyword: Option<usize>,
    /// ISO country codes; empty accepts every country.
    pub allowed_countries: Vec<String>,
    pub require_email: bool,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        let options = RunOptions::default();
        let http = HttpSettings::default();
        Self {
            results_per_page: options.results_per_page,
            detail_batch_size: options.detail_batch_size,
            max_attempts: options.retry.max_attempts,
            backoff_base_ms: options.retry.base_delay.as_millis() as u64,
            max_pages_per_keyword: None,
            max_leads_per_keyword: None,
            allowed_countries: Vec::new(),
            require_email: false,
            connect_timeout_secs: http.connect_timeout.as_secs(),
            request_timeout_secs: http.request_timeout.as_secs(),
        }
    }
}

impl AppSettings {
    /// Adds a key unless it is blank or already present. Returns whether it was added.
    pub fn add_api_key(&mut self, key: &str) -> bool {
        let key = key.trim();
        if key.is_empty() || self.youtube_api_keys.iter().any(|k| k == key) {
            return false;
        }
        self.youtube_api_keys.push(key.to_string());
        true
    }

    pub fn scrape_settings(&self) -> ScrapeSettings {
        let retry = RetryPolicy {
            max_attempts: self.tuning.max_attempts.max(1),
            base_delay: Duration::from_millis(self.tuning.backoff_base_ms),
            ..RetryPolicy::default()
        };
        ScrapeSettings {
            api_keys: self.youtube_api_keys.clone(),
            sheet: SheetTarget {
                spreadsheet_id: self.sheet_id.trim().to_string(),
                worksheet: self.worksheet_name.trim().to_string(),
            },
            service_account_path: self.service_account_file.clone().unwrap_or_default(),
            options: RunOptions {
                results_per_page: self.tuning.results_per_page,
                detail_batch_size: self.tuning.detail_batch_size,
                retry,
                max_pages_per_keyword: self.tuning.max_pages_per_keyword,
                max_leads_per_keyword: self.tuning.max_leads_per_keyword,
            },
        }
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            connect_timeout: Duration::from_secs(self.tuning.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.tuning.request_timeout_secs),
        }
    }

    /// Human-readable dump with API keys redacted.
    pub fn describe(&self) -> String {
        let keys: Vec<String> = self.youtube_api_keys.iter().map(|k| redact(k)).collect();
        let service_account = self
            .service_account_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not set)".to_string());
        let countries = if self.tuning.allowed_countries.is_empty() {
            "any".to_string()
        } else {
            self.tuning.allowed_countries.join(", ")
        };
        format!(
            "YouTube API keys : {} [{}]\n\
             Sheet id         : {}\n\
             Worksheet        : {}\n\
             Service account  : {}\n\
             Page size        : {}\n\
             Detail batch     : {}\n\
             Max attempts     : {}\n\
             Backoff base     : {} ms\n\
             Pages/keyword    : {}\n\
             Leads/keyword    : {}\n\
             Countries        : {}\n\
             Require email    : {}",
            keys.len(),
            keys.join(", "),
            if self.sheet_id.is_empty() { "(not set)" } else { self.sheet_id.as_str() },
            self.worksheet_name,
            service_account,
            self.tuning.results_per_page,
            self.tuning.detail_batch_size,
            self.tuning.max_attempts,
            self.tuning.backoff_base_ms,
            limit_text(self.tuning.max_pages_per_keyword),
            limit_text(self.tuning.max_leads_per_keyword),
            countries,
            self.tuning.require_email,
        )
    }
}

fn limit_text(limit: Option<usize>) -> String {
    limit.map_or_else(|| "unlimited".to_string(), |n| n.to_string())
}

/// `settings.ron` inside the platform config directory.
pub(crate) fn default_settings_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "leadscout", "leadscout")
        .context("no home directory to place settings in")?;
    Ok(dirs.config_dir().join(SETTINGS_FILENAME))
}

/// Strict load: a missing file yields defaults, a corrupt one is an error.
pub(crate) fn load_settings(path: &Path) -> Result<AppSettings> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            scout_info!("No settings at {:?}; using defaults", path);
            return Ok(AppSettings::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read settings from {path:?}"))
        }
    };
    ron::from_str(&content).with_context(|| format!("failed to parse settings from {path:?}"))
}

/// Lenient load for display: a corrupt file is logged and replaced by defaults.
pub(crate) fn load_settings_or_default(path: &Path) -> AppSettings {
    match load_settings(path) {
        Ok(settings) => settings,
        Err(err) => {
            scout_warn!("{:#}; using defaults", err);
            AppSettings::default()
        }
    }
}

/// Writes through a temp file and rename so a crash never leaves a half-written file.
pub(crate) fn save_settings(path: &Path, settings: &AppSettings) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {dir:?}"))?;
    }
    let pretty = ron::ser::PrettyConfig::new();
    let content =
        ron::ser::to_string_pretty(settings, pretty).context("failed to serialize settings")?;

    let tmp = path.with_extension("ron.tmp");
    fs::write(&tmp, content).with_context(|| format!("failed to write {tmp:?}"))?;
    fs::rename(&tmp, path).with_context(|| format!("failed to replace {path:?}"))?;
    scout_info!("Saved settings to {:?}", path);
    Ok(())
}
