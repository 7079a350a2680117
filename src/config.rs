//! Site configuration.
//!
//! A small JSON file (the same `config.json` the sync tooling writes) tells the
//! fixer which wiki the text belongs to. Environment variables, optionally
//! from a `.env` file, override it.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::wikitext::errors::{FixError, Result};
use crate::wikitext::urls::WikiSite;

pub const ENV_API_URL: &str = "MWS_API_URL";
pub const ENV_FIX_TYPOGRAPHY: &str = "MWS_FIX_TYPOGRAPHY";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MwsConfig {
    /// API endpoint, e.g. `https://wiki.example.org/w/api.php`.
    pub api_url: Option<String>,
    pub user_agent: Option<String>,
    pub skin_css: Option<Vec<String>>,
    /// Run the typographic normalizer after link canonicalization.
    pub fix_typography: Option<bool>,
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(FixError::invalid_arg(format!("{} must be true/false, got {:?}", key, other))),
    }
}

impl MwsConfig {
    /// Read a config file. Unknown keys are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| FixError::io_err(format!("cannot read config {}", path.display()), e))?;
        serde_json::from_str(&raw)
            .map_err(|e| FixError::config(format!("invalid config {}", path.display()), Some(e)))
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_url = Some(url);
        }
        if let Some(flag) = lookup(ENV_FIX_TYPOGRAPHY) {
            self.fix_typography = Some(parse_flag(ENV_FIX_TYPOGRAPHY, &flag)?);
        }
        Ok(self)
    }

    /// Load `path` if given, then apply `.env` and environment overrides.
    pub fn from_sources(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn fix_typography(&self) -> bool {
        self.fix_typography.unwrap_or(true)
    }

    /// The wiki this configuration points at.
    pub fn site(&self) -> Result<WikiSite> {
        let Some(api_url) = self.api_url.as_deref() else {
            return Err(FixError::config::<serde_json::Error>(
                format!("no api_url configured (set it in the config file or {})", ENV_API_URL),
                None,
            ));
        };
        WikiSite::from_endpoint(api_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parses_sync_tool_config() {
        let raw = r#"{
            "api_url": "https://wiki.example.org/w/api.php",
            "username": null,
            "repo_root": "/srv/wiki",
            "skin_css": ["a.css"],
            "something_new": 1
        }"#;
        let config: MwsConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.api_url.as_deref(), Some("https://wiki.example.org/w/api.php"));
        assert_eq!(config.skin_css, Some(vec!["a.css".to_string()]));
        assert!(config.fix_typography());
    }

    #[test]
    fn site_from_config() {
        let config = MwsConfig {
            api_url: Some("https://wiki.example.org/w/api.php".to_string()),
            ..Default::default()
        };
        let site = config.site().unwrap();
        assert_eq!(site.origin, "https://wiki.example.org");
        assert_eq!(site.base_dir, "/w/");
    }

    #[test]
    fn missing_api_url_is_a_config_error() {
        let err = MwsConfig::default().site().unwrap_err();
        assert_eq!(err.kind(), "Config");
    }

    #[test]
    fn environment_overrides_file() {
        let config = MwsConfig {
            api_url: Some("https://old.example.org/api.php".to_string()),
            fix_typography: Some(true),
            ..Default::default()
        }
        .with_overrides(lookup(&[(ENV_API_URL, "https://new.example.org/api.php"), (ENV_FIX_TYPOGRAPHY, "no")]))
        .unwrap();
        assert_eq!(config.api_url.as_deref(), Some("https://new.example.org/api.php"));
        assert!(!config.fix_typography());
    }

    #[test]
    fn bad_flag_is_rejected() {
        let err = MwsConfig::default()
            .with_overrides(lookup(&[(ENV_FIX_TYPOGRAPHY, "maybe")]))
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
    }

    #[test]
    fn load_reports_missing_file() {
        let err = MwsConfig::load(Path::new("/nonexistent/mws/config.json")).unwrap_err();
        assert_eq!(err.kind(), "Io");
    }
}
