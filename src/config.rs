use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub search: SearchConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub exports: ExportsConfig,
  #[serde(default)]
  pub tax: TaxConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the procurement server, e.g. "https://erp.example.com/api"
  pub url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
  /// Quiet period before typed text becomes the active search
  #[serde(default = "default_debounce_ms")]
  pub debounce_ms: u64,
  /// Page size sent as `limit`; unset lets the server decide
  pub page_size: Option<u32>,
}

fn default_debounce_ms() -> u64 {
  300
}

impl Default for SearchConfig {
  fn default() -> Self {
    Self {
      debounce_ms: default_debounce_ms(),
      page_size: None,
    }
  }
}

impl SearchConfig {
  pub fn debounce(&self) -> Duration {
    Duration::from_millis(self.debounce_ms)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  /// Seconds a query result counts as fresh. Fresh results are not refetched
  /// when a view mounts. Zero always refetches.
  #[serde(default)]
  pub stale_secs: u64,
}

impl CacheConfig {
  pub fn stale_time(&self) -> Duration {
    Duration::from_secs(self.stale_secs)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportsConfig {
  pub download_dir: Option<PathBuf>,
  pub preview_dir: Option<PathBuf>,
}

impl ExportsConfig {
  /// Where downloaded PDFs go: configured dir, else the user's download dir,
  /// else the home dir.
  pub fn download_dir(&self) -> Result<PathBuf> {
    if let Some(dir) = &self.download_dir {
      return Ok(dir.clone());
    }
    dirs::download_dir()
      .or_else(dirs::home_dir)
      .ok_or_else(|| eyre!("Could not determine download directory"))
  }

  /// Where preview PDFs go: configured dir, else the cache dir.
  pub fn preview_dir(&self) -> Result<PathBuf> {
    if let Some(dir) = &self.preview_dir {
      return Ok(dir.clone());
    }
    dirs::cache_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".cache")))
      .map(|p| p.join("procura").join("previews"))
      .ok_or_else(|| eyre!("Could not determine cache directory"))
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxConfig {
  /// Flat tax rate applied to the subtotal when editing items (0.2 = 20%).
  /// Unset keeps tax at zero.
  pub rate: Option<f64>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./procura.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/procura/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/procura/config.yaml\n\
                 with at least:\n\n  api:\n    url: https://erp.example.com/api"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("procura.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("procura").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  /// Get the API token from the environment.
  ///
  /// Checks PROCURA_API_TOKEN. A missing token is not an error: some
  /// deployments sit behind a gateway that handles auth.
  pub fn get_api_token() -> Option<String> {
    std::env::var("PROCURA_API_TOKEN")
      .ok()
      .filter(|t| !t.trim().is_empty())
  }
}
