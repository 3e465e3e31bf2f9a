use crate::error::AppError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const APP_NAME: &str = "billing-dash";
pub const ENV_PREFIX: &str = "BILLING_DASH";

fn app_home_dir() -> Result<PathBuf, AppError> {
    if let Ok(custom) = std::env::var("BILLING_DASH_HOME") {
        return Ok(PathBuf::from(custom));
    }

    if let Some(dirs) = ProjectDirs::from("com", "scalable", APP_NAME) {
        let candidate = dirs.data_local_dir().to_path_buf();
        if fs::create_dir_all(&candidate).is_ok() {
            return Ok(candidate);
        }
    }

    let cwd = std::env::current_dir()?;
    Ok(cwd.join(".billing-dash"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub billing_url: String,
    pub analytics_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    pub window_capacity: usize,
    pub sample_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub trend_days: u32,
    pub page_size: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            billing_url: "http://localhost:8080/api".into(),
            analytics_url: "http://localhost:8081/api".into(),
            customer_id: None,
            window_capacity: 20,
            sample_interval_ms: 2000,
            request_timeout_secs: 30,
            trend_days: 30,
            page_size: 10,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        parse_service_url("billing_url", &self.billing_url)?;
        parse_service_url("analytics_url", &self.analytics_url)?;
        if self.window_capacity == 0 {
            return Err(AppError::Config("window_capacity must be at least 1".into()));
        }
        if self.sample_interval_ms == 0 {
            return Err(AppError::Config(
                "sample_interval_ms must be at least 1".into(),
            ));
        }
        if self.page_size == 0 {
            return Err(AppError::Config("page_size must be at least 1".into()));
        }
        Ok(())
    }

    pub fn billing_base(&self) -> Result<Url, AppError> {
        parse_service_url("billing_url", &self.billing_url)
    }

    pub fn analytics_base(&self) -> Result<Url, AppError> {
        parse_service_url("analytics_url", &self.analytics_url)
    }

    pub fn capacity(&self) -> Result<NonZeroUsize, AppError> {
        NonZeroUsize::new(self.window_capacity)
            .ok_or_else(|| AppError::Config("window_capacity must be at least 1".into()))
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

fn parse_service_url(field: &str, raw: &str) -> Result<Url, AppError> {
    let url = Url::parse(raw)
        .map_err(|e| AppError::Config(format!("{field} '{raw}' is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Config(format!(
            "{field} must use http or https, got '{}'",
            url.scheme()
        )));
    }
    Ok(url)
}

pub fn config_dir() -> Result<PathBuf, AppError> {
    Ok(app_home_dir()?.join("config"))
}

pub fn config_path() -> Result<PathBuf, AppError> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn ensure_dirs() -> Result<(), AppError> {
    fs::create_dir_all(config_dir()?)?;
    Ok(())
}

fn normalize_config(config: &mut AppConfig) -> bool {
    let mut changed = false;

    for url in [&mut config.billing_url, &mut config.analytics_url] {
        let trimmed = url.trim().trim_end_matches('/').to_string();
        if trimmed != *url {
            *url = trimmed;
            changed = true;
        }
    }

    if let Some(customer) = config.customer_id.take() {
        let trimmed = customer.trim();
        if trimmed != customer {
            changed = true;
        }
        if trimmed.is_empty() {
            changed = true;
        } else {
            config.customer_id = Some(trimmed.to_string());
        }
    }

    changed
}

/// Built-in defaults, then the config file, then `BILLING_DASH_*` variables.
pub fn load_config() -> Result<AppConfig, AppError> {
    load_config_from(&config_path()?)
}

fn load_config_from(path: &Path) -> Result<AppConfig, AppError> {
    let settings = ::config::Config::builder()
        .add_source(::config::Config::try_from(&AppConfig::default())?)
        .add_source(
            ::config::File::from(path)
                .format(::config::FileFormat::Toml)
                .required(false),
        )
        .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()?;

    let mut parsed: AppConfig = settings.try_deserialize()?;
    if normalize_config(&mut parsed) {
        tracing::debug!(path = %path.display(), "normalized configuration values");
    }
    parsed.validate()?;
    Ok(parsed)
}

pub fn save_config(config: &AppConfig) -> Result<(), AppError> {
    ensure_dirs()?;
    let path = config_path()?;
    let raw = toml::to_string_pretty(config)?;
    fs::write(path, raw)?;
    Ok(())
}

pub fn ensure_initialized() -> Result<(), AppError> {
    ensure_dirs()?;
    let cfg_path = config_path()?;
    if !Path::new(&cfg_path).exists() {
        save_config(&AppConfig::default())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        let cfg = AppConfig::default();
        cfg.validate().expect("defaults validate");
        assert_eq!(cfg.capacity().expect("capacity").get(), 20);
        assert_eq!(cfg.sample_interval(), Duration::from_secs(2));
    }

    #[test]
    fn validate_rejects_zero_capacity_and_bad_urls() {
        let cfg = AppConfig {
            window_capacity: 0,
            ..AppConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = AppConfig {
            billing_url: "ftp://example.com".into(),
            ..AppConfig::default()
        };
        let err = cfg.validate().expect_err("ftp rejected");
        assert!(err.to_string().contains("billing_url"));

        let cfg = AppConfig {
            analytics_url: "not a url".into(),
            ..AppConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn normalize_config_trims_urls_and_customer() {
        let mut cfg = AppConfig {
            billing_url: " http://billing:8080/api/ ".into(),
            customer_id: Some("  ".into()),
            ..AppConfig::default()
        };
        assert!(normalize_config(&mut cfg));
        assert_eq!(cfg.billing_url, "http://billing:8080/api");
        assert!(cfg.customer_id.is_none());
        assert!(!normalize_config(&mut cfg));
    }

    #[test]
    fn file_values_override_defaults() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            "window_capacity = 5\ncustomer_id = \"c-7\"\nanalytics_url = \"https://stats.example.com/api/\"\n",
        )
        .expect("write config");

        let cfg = load_config_from(&path).expect("load");
        assert_eq!(cfg.window_capacity, 5);
        assert_eq!(cfg.customer_id.as_deref(), Some("c-7"));
        assert_eq!(cfg.analytics_url, "https://stats.example.com/api");
        assert_eq!(cfg.billing_url, AppConfig::default().billing_url);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().expect("tempdir");
        let cfg = load_config_from(&tmp.path().join("absent.toml")).expect("load");
        assert_eq!(cfg.page_size, 10);
        assert_eq!(cfg.trend_days, 30);
    }
}
