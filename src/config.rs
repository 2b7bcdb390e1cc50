//! Runtime settings: built-in defaults, then an optional TOML file, then
//! `CLAW_*` environment overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::driver::http::AgentProfile;
use crate::error::ConfigError;
use crate::harvest::HARD_REVIEW_CAP;
use crate::model::SourceId;
use crate::sources::{ProfiledSource, SourceOptions, SourceProfile, builtin_profile};

const ENV_PATH: &str = "CLAW_CONFIG";
const DEFAULT_PATH: &str = "claw.toml";

const ENV_NAV_TIMEOUT: &str = "CLAW_NAV_TIMEOUT_MS";
const ENV_POLITE_DELAY: &str = "CLAW_POLITE_DELAY_MS";
const ENV_MAX_REVIEWS: &str = "CLAW_MAX_REVIEWS";
const ENV_RESPECT_ROBOTS: &str = "CLAW_RESPECT_ROBOTS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub nav_timeout_ms: u64,
    pub polite_delay_ms: u64,
    /// A source stops once it holds more than this many reviews.
    pub max_reviews: usize,
    pub respect_robots: bool,
    pub user_agent: AgentProfile,
    pub fallback_to_product_page: bool,
    /// Profile overrides keyed by lower-case source key (`g2`, `capterra`, ...).
    pub sources: BTreeMap<String, SourceProfile>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            nav_timeout_ms: 60_000,
            polite_delay_ms: 2_000,
            max_reviews: HARD_REVIEW_CAP,
            respect_robots: true,
            user_agent: AgentProfile::Desktop,
            fallback_to_product_page: false,
            sources: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Resolves the config file (`explicit`, else `$CLAW_CONFIG`, else
    /// `./claw.toml` when present) and applies env overrides on top.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(ENV_PATH).ok().map(PathBuf::from))
            .or_else(|| {
                let p = PathBuf::from(DEFAULT_PATH);
                p.exists().then_some(p)
            });

        let mut settings = match path {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        settings.apply_env(|k| std::env::var(k).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), overrides = settings.sources.len(), "config loaded");
        Ok(settings)
    }

    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Overlays `CLAW_*` variables looked up through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = var(ENV_NAV_TIMEOUT) {
            self.nav_timeout_ms = parse_env(ENV_NAV_TIMEOUT, &v)?;
        }
        if let Some(v) = var(ENV_POLITE_DELAY) {
            self.polite_delay_ms = parse_env(ENV_POLITE_DELAY, &v)?;
        }
        if let Some(v) = var(ENV_MAX_REVIEWS) {
            self.max_reviews = parse_env(ENV_MAX_REVIEWS, &v)?;
        }
        if let Some(v) = var(ENV_RESPECT_ROBOTS) {
            self.respect_robots = match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::Env {
                        var: ENV_RESPECT_ROBOTS,
                        value: v,
                    });
                }
            };
        }
        Ok(())
    }

    pub fn nav_timeout(&self) -> Duration {
        Duration::from_millis(self.nav_timeout_ms)
    }

    pub fn polite_delay(&self) -> Duration {
        Duration::from_millis(self.polite_delay_ms)
    }

    pub fn source_options(&self) -> SourceOptions {
        SourceOptions {
            polite_delay: self.polite_delay(),
            fallback_to_product_page: self.fallback_to_product_page,
        }
    }

    /// The configured override for `id`, or its built-in profile.
    pub fn profile(&self, id: SourceId) -> SourceProfile {
        self.sources
            .get(id.key())
            .cloned()
            .unwrap_or_else(|| builtin_profile(id))
    }

    pub fn build_source(&self, id: SourceId) -> Result<ProfiledSource, ConfigError> {
        Ok(ProfiledSource::from_profile(id, &self.profile(id), self.source_options())?)
    }
}

fn parse_env<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var,
        value: value.to_string(),
    })
}
