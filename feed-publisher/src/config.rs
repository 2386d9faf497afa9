use crate::renderer::StyleSettings;
use crate::types::{FetchConfig, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Everything one run needs, built once and handed to each component.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub app_root: PathBuf,
    pub feeds_file: PathBuf,
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
    pub recent_hours: u32,
    pub template_dir: PathBuf,
    /// Explicit template path; takes precedence over `template_dir`.
    pub template_file: Option<PathBuf>,
    pub css_file: PathBuf,
    pub style: StyleSettings,
    pub fetch: FetchConfig,
    pub remote_folder: String,
    pub rmapi_path: PathBuf,
    pub bridge_timeout: Duration,
    pub upload_timeout: Duration,
    pub engine_path: PathBuf,
    pub engine_timeout: Option<Duration>,
    /// Problems found while reading the environment, reported once logging is up.
    pub warnings: Vec<String>,
}

impl PublisherConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();
        let number = |key: &str, default: u64, warnings: &mut Vec<String>| -> u64 {
            match lookup(key) {
                Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                    warnings.push(format!("{}={:?} is not a number, using {}", key, raw, default));
                    default
                }),
                None => default,
            }
        };
        let small = |key: &str, default: u32, warnings: &mut Vec<String>| -> u32 {
            let value = number(key, u64::from(default), warnings);
            u32::try_from(value).unwrap_or_else(|_| {
                warnings.push(format!("{}={} is out of range, using {}", key, value, default));
                default
            })
        };

        let recent_hours = small("RECENT_HOURS", 24, &mut warnings);
        let max_image_width = small("MAX_IMAGE_WIDTH", 400, &mut warnings);
        let font_size = small("PDF_FONT_SIZE", 13, &mut warnings);
        let request_timeout = number("REQUEST_TIMEOUT", 30, &mut warnings);
        let engine_timeout = lookup("PDF_ENGINE_TIMEOUT").map(|_| number("PDF_ENGINE_TIMEOUT", 0, &mut warnings));

        let app_root = lookup("APP_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let path_or = |key: &str, default: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(default);

        let template_dir = path_or("TEMPLATE_DIR", app_root.join("templates"));
        let css_file = path_or("CSS_FILE", app_root.join("templates").join("style.css"));

        Self {
            feeds_file: path_or("FEEDS_FILE", app_root.join("feeds.txt")),
            output_dir: path_or("OUTPUT_DIR", app_root.join("output")),
            log_dir: path_or("LOG_DIR", app_root.join("logs")),
            recent_hours,
            template_file: lookup("TEMPLATE_FILE").map(PathBuf::from),
            template_dir,
            css_file,
            style: StyleSettings {
                page_size: lookup("PDF_PAGE_SIZE").unwrap_or_else(|| "A4".to_string()),
                margin: lookup("PDF_MARGIN").unwrap_or_else(|| "0.375in".to_string()),
                font_size,
                max_image_width,
            },
            fetch: FetchConfig {
                timeout_seconds: request_timeout,
                ..FetchConfig::default()
            },
            remote_folder: lookup("REMARKABLE_FOLDER").unwrap_or_else(|| "AtomFeeds".to_string()),
            rmapi_path: path_or("RMAPI_PATH", PathBuf::from("rmapi")),
            bridge_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(120),
            engine_path: path_or("PDF_ENGINE_PATH", PathBuf::from("weasyprint")),
            engine_timeout: engine_timeout.filter(|secs| *secs > 0).map(Duration::from_secs),
            app_root,
            warnings,
        }
    }

    /// Template the renderer should load.
    pub fn template_path(&self) -> PathBuf {
        self.template_file
            .clone()
            .unwrap_or_else(|| self.template_dir.join(crate::renderer::TEMPLATE_NAME))
    }

    /// Create the output and log directories, and locate the template
    /// directory if the configured one is missing.
    pub fn setup_directories(&mut self) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;

        if !self.template_dir.exists() {
            warn!("Template directory not found at {}", self.template_dir.display());
            let candidates = [
                self.app_root.join("templates"),
                PathBuf::from("/usr/src/app/templates"),
                PathBuf::from("/templates"),
            ];
            if let Some(found) = candidates.iter().find(|p| p.exists()) {
                info!("Found templates at: {}", found.display());
                self.relocate_templates(found);
            }
        }
        Ok(())
    }

    fn relocate_templates(&mut self, dir: &Path) {
        self.template_dir = dir.to_path_buf();
        self.css_file = dir.join("style.css");
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> PublisherConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PublisherConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_are_relative_to_app_root() {
        let config = config_with(&[("APP_ROOT", "/srv/app")]);
        assert_eq!(config.feeds_file, PathBuf::from("/srv/app/feeds.txt"));
        assert_eq!(config.output_dir, PathBuf::from("/srv/app/output"));
        assert_eq!(config.log_dir, PathBuf::from("/srv/app/logs"));
        assert_eq!(config.css_file, PathBuf::from("/srv/app/templates/style.css"));
        assert_eq!(config.template_path(), PathBuf::from("/srv/app/templates/article.html"));
        assert_eq!(config.recent_hours, 24);
        assert_eq!(config.remote_folder, "AtomFeeds");
        assert_eq!(config.rmapi_path, PathBuf::from("rmapi"));
        assert_eq!(config.engine_timeout, None);
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = config_with(&[
            ("RECENT_HOURS", "48"),
            ("OUTPUT_DIR", "/tmp/pdfs"),
            ("REMARKABLE_FOLDER", "News"),
            ("PDF_FONT_SIZE", "15"),
            ("TEMPLATE_FILE", "/etc/custom.html"),
            ("PDF_ENGINE_TIMEOUT", "90"),
        ]);
        assert_eq!(config.recent_hours, 48);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/pdfs"));
        assert_eq!(config.remote_folder, "News");
        assert_eq!(config.style.font_size, 15);
        assert_eq!(config.template_path(), PathBuf::from("/etc/custom.html"));
        assert_eq!(config.engine_timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn bad_numbers_fall_back_with_warning() {
        let config = config_with(&[("RECENT_HOURS", "a day")]);
        assert_eq!(config.recent_hours, 24);
        assert_eq!(config.warnings.len(), 1);
        assert!(config.warnings[0].contains("RECENT_HOURS"));
    }

    #[test]
    fn stylesheet_default_ignores_template_dir() {
        let config = config_with(&[("APP_ROOT", "/srv/app"), ("TEMPLATE_DIR", "/opt/templates")]);
        assert_eq!(config.template_path(), PathBuf::from("/opt/templates/article.html"));
        assert_eq!(config.css_file, PathBuf::from("/srv/app/templates/style.css"));
    }

    #[test]
    fn out_of_range_numbers_fall_back_with_warning() {
        let config = config_with(&[("RECENT_HOURS", "4294967296"), ("PDF_FONT_SIZE", "12")]);
        assert_eq!(config.recent_hours, 24);
        assert_eq!(config.style.font_size, 12);
        assert_eq!(config.warnings.len(), 1);
        assert!(config.warnings[0].contains("out of range"));

        let config = config_with(&[("RECENT_HOURS", "4294967295")]);
        assert_eq!(config.recent_hours, u32::MAX);
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn setup_creates_directories_and_finds_templates() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("templates")).unwrap();
        let app_root = root.path().to_string_lossy().to_string();
        let missing = root.path().join("nowhere").to_string_lossy().to_string();

        let mut config = config_with(&[("APP_ROOT", &app_root), ("TEMPLATE_DIR", &missing)]);
        config.setup_directories().unwrap();

        assert!(root.path().join("output").is_dir());
        assert!(root.path().join("logs").is_dir());
        assert_eq!(config.template_dir, root.path().join("templates"));
        assert_eq!(config.css_file, root.path().join("templates").join("style.css"));
    }
}
