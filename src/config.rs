//! Editor configuration (course API endpoint + image limits) from TOML.
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:5000/api"
//! timeout_secs = 30
//! course_view_template = "/courses/{id}"
//!
//! [image]
//! max_bytes = 5242880
//! accepted_types = ["image/jpeg", "image/png", "image/gif", "image/webp"]
//!
//! [sessions]
//! idle_ttl_secs = 1800
//! sweep_interval_secs = 60
//! ```
//!
//! Env: EDITOR_CONFIG_PATH points at the file; COURSE_API_BASE_URL overrides `api.base_url`.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::editor::EditorSettings;
use crate::image::ImageRules;

#[derive(Clone, Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
  pub api: ApiConfig,
  pub image: ImageRules,
  pub sessions: SessionConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
  pub base_url: String,
  pub timeout_secs: u64,
  pub course_view_template: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:5000/api".into(),
      timeout_secs: 30,
      course_view_template: "/courses/{id}".into(),
    }
  }
}

/// Idle draft sessions are closed by a periodic sweep.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
  pub idle_ttl_secs: u64,
  pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self { idle_ttl_secs: 30 * 60, sweep_interval_secs: 60 }
  }
}

impl SessionConfig {
  pub fn idle_ttl(&self) -> Duration {
    Duration::from_secs(self.idle_ttl_secs)
  }

  pub fn sweep_interval(&self) -> Duration {
    Duration::from_secs(self.sweep_interval_secs.max(1))
  }
}

impl EditorConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.api.timeout_secs.max(1))
  }

  pub fn editor_settings(&self) -> EditorSettings {
    EditorSettings { image: self.image.clone(), course_view_template: self.api.course_view_template.clone() }
  }

  pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(s)
  }
}

/// Load from EDITOR_CONFIG_PATH if set, falling back to defaults on any IO/parse error.
pub fn load_editor_config_from_env() -> EditorConfig {
  let mut cfg = match std::env::var("EDITOR_CONFIG_PATH") {
    Ok(path) => match std::fs::read_to_string(&path) {
      Ok(s) => match EditorConfig::from_toml(&s) {
        Ok(cfg) => {
          info!(target: "course_editor", %path, "Loaded editor config (TOML)");
          cfg
        }
        Err(e) => {
          error!(target: "course_editor", %path, error = %e, "Failed to parse TOML config; using defaults");
          EditorConfig::default()
        }
      },
      Err(e) => {
        error!(target: "course_editor", %path, error = %e, "Failed to read TOML config file; using defaults");
        EditorConfig::default()
      }
    },
    Err(_) => EditorConfig::default(),
  };

  if let Ok(url) = std::env::var("COURSE_API_BASE_URL") {
    if !url.trim().is_empty() {
      cfg.api.base_url = url;
    }
  }
  cfg
}
