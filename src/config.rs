use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::Path;
use url::Url;

/// Fetch-interception strategy.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
  /// Serve the stored response immediately and refresh it from the network
  /// in the background for subsequent requests.
  #[default]
  StaleWhileRevalidate,
  /// Serve the stored response if present without consulting the network;
  /// on a miss, fetch without writing back. The store only fills at
  /// install time in this mode.
  CacheFirst,
}

/// What a failed manifest entry does to the rest of the install.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum InstallPolicy {
  /// Per-URL: each failure is recorded and the remaining entries still
  /// get cached.
  #[default]
  BestEffort,
  /// All-or-nothing batch add: the first failure aborts the whole
  /// install. Brittle with cross-origin or byte-range manifest entries;
  /// kept for parity with the legacy batch behavior.
  Strict,
}

/// Configuration for a cache worker generation.
///
/// The generation identifier is `{app_name}-cache-{cache_version}`; bumping
/// `cache_version` invalidates every previously stored cache on the next
/// activation.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
  /// Application name, the stable prefix of cache names.
  pub app_name: String,
  /// Generation tag (e.g. "v2.0.3").
  pub cache_version: String,
  /// Origin the application shell is served from; relative manifest
  /// entries are resolved against it.
  pub base_url: String,
  /// URLs fetched and stored eagerly at install time.
  #[serde(default)]
  pub precache: Vec<String>,
  #[serde(default)]
  pub strategy: Strategy,
  #[serde(default)]
  pub install_policy: InstallPolicy,
  /// File extensions the worker never intercepts (byte-range media that
  /// the generic cache-write path cannot safely replay).
  #[serde(default = "default_excluded_extensions")]
  pub excluded_extensions: Vec<String>,
  /// Hosts the worker never intercepts (opaque cross-origin services,
  /// e.g. font CDNs).
  #[serde(default = "default_excluded_hosts")]
  pub excluded_hosts: Vec<String>,
}

fn default_excluded_extensions() -> Vec<String> {
  ["mp4", "webm", "m4v", "ogv"]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_excluded_hosts() -> Vec<String> {
  vec!["fonts.gstatic.com".to_string()]
}

impl WorkerConfig {
  pub fn new(
    app_name: impl Into<String>,
    cache_version: impl Into<String>,
    base_url: impl Into<String>,
  ) -> Self {
    Self {
      app_name: app_name.into(),
      cache_version: cache_version.into(),
      base_url: base_url.into(),
      precache: Vec::new(),
      strategy: Strategy::default(),
      install_policy: InstallPolicy::default(),
      excluded_extensions: default_excluded_extensions(),
      excluded_hosts: default_excluded_hosts(),
    }
  }

  /// Name of the cache for this generation.
  pub fn cache_name(&self) -> String {
    format!("{}-cache-{}", self.app_name, self.cache_version)
  }

  /// Resolve a manifest entry against the application origin.
  ///
  /// Absolute entries (CDN libraries, font stylesheets) pass through
  /// unchanged; relative ones ("./", "/index.html") join the base URL.
  pub fn manifest_url(&self, raw: &str) -> Result<Url> {
    let base = Url::parse(&self.base_url)
      .map_err(|e| eyre!("Invalid base URL {}: {}", self.base_url, e))?;
    base
      .join(raw)
      .map_err(|e| eyre!("Invalid manifest entry {}: {}", raw, e))
  }

  /// Whether the worker declines to intercept requests for this URL.
  pub fn is_excluded(&self, url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    if self
      .excluded_extensions
      .iter()
      .any(|ext| path.ends_with(&format!(".{}", ext.to_ascii_lowercase())))
    {
      return true;
    }

    match url.host_str() {
      Some(host) => self
        .excluded_hosts
        .iter()
        .any(|h| h.eq_ignore_ascii_case(host)),
      None => false,
    }
  }

  /// Load configuration from a YAML file.
  pub fn load(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: WorkerConfig = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }
}
