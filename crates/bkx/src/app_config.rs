//! 🔧 App Configuration, the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." said every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! 🔒 Service credentials are expected to arrive through the environment
//! (`BKX_SOURCE__SERVICE_KEY`, `BKX_DESTINATION__SERVICE_KEY`), not the TOML file.
//! They *can* live in the file. They *shouldn't*. We don't judge. We do redact.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 🚰 Where the objects live today.
    pub source: ProjectConfig,
    /// 🕳️ Where the objects should live tomorrow.
    pub destination: ProjectConfig,
    /// 🪣 Buckets to migrate, in this exact order.
    #[serde(default = "default_buckets")]
    pub buckets: Vec<String>,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub staging: StagingConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// 🪣 The buckets every tenant project ships with.
pub const DEFAULT_BUCKETS: [&str; 5] = ["invoices", "mc-photos", "agreements", "savings", "cam"];

fn default_buckets() -> Vec<String> {
    DEFAULT_BUCKETS.iter().map(|b| b.to_string()).collect()
}

/// 📡 One hosted project: a base URL and the service credential that unlocks it.
#[derive(Deserialize, Clone)]
pub struct ProjectConfig {
    /// 📡 Project base URL, scheme included. `https://<ref>.example.co`, not just `<ref>`.
    pub url: String,
    /// 🔒 Service credential. Goes out as both `apikey` and `Authorization: Bearer`.
    #[serde(default)]
    pub service_key: Option<String>,
}

// 🎭 hand-rolled Debug so `{:#?}` on the config never prints a service key into the logs
impl std::fmt::Debug for ProjectConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectConfig")
            .field("url", &self.url)
            .field(
                "service_key",
                &self.service_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl ProjectConfig {
    /// 🔒 The credential, if it's actually there. Blank strings don't count.
    pub fn credential(&self) -> Option<&str> {
        self.service_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// 🔑 Both credentials, validated present. You only get one of these by passing the checks.
#[derive(Clone)]
pub struct ServiceCredentials {
    pub source: String,
    pub destination: String,
}

impl AppConfig {
    /// 🔒 Precondition check: both projects need a service credential before anything moves.
    ///
    /// 💀 Bails naming every missing variable at once, so nobody has to fix them one rerun at a time.
    pub fn credentials(&self) -> Result<ServiceCredentials> {
        let missing: Vec<&str> = [
            ("BKX_SOURCE__SERVICE_KEY", self.source.credential()),
            ("BKX_DESTINATION__SERVICE_KEY", self.destination.credential()),
        ]
        .into_iter()
        .filter(|(_, key)| key.is_none())
        .map(|(var, _)| var)
        .collect();

        match (self.source.credential(), self.destination.credential()) {
            (Some(source), Some(destination)) => Ok(ServiceCredentials {
                source: source.to_string(),
                destination: destination.to_string(),
            }),
            _ => anyhow::bail!(
                "💀 Missing service credential(s): {}. Export them before running; \
                 use the project's service key, not the anon/public one. Nothing was touched.",
                missing.join(", ")
            ),
        }
    }
}

/// 📋 How the lister walks a bucket.
#[derive(Debug, Deserialize, Clone)]
pub struct ListingConfig {
    /// 📦 Entries requested per listing call.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// 🔄 Ask for the next page when a folder fills a whole page. `false` = one page per folder, full stop.
    #[serde(default = "default_true")]
    pub follow_pagination: bool,
}

fn default_page_size() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            follow_pagination: true,
        }
    }
}

/// 📁 Where objects take a nap between download and upload.
#[derive(Debug, Deserialize, Clone)]
pub struct StagingConfig {
    #[serde(default = "default_staging_root")]
    pub root: PathBuf,
    /// 🔍 Keep the staging tree around when something failed, so an operator can poke at it.
    #[serde(default)]
    pub retain_on_failure: bool,
}

fn default_staging_root() -> PathBuf {
    std::env::temp_dir().join("bkx-staging")
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            root: default_staging_root(),
            retain_on_failure: false,
        }
    }
}

/// 🧵 Runtime knobs: how many workers, how deep the queue, how patient the HTTP client.
#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    /// 🧵 Concurrent transfer workers per bucket. 1 = strictly sequential, listing order.
    #[serde(default = "default_transfer_parallelism", alias = "workers")]
    pub transfer_parallelism: usize,
    /// 📬 Bounded channel depth between the feeder and the workers.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// ⏱️ Whole-request timeout. Big blobs need big patience.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_transfer_parallelism() -> usize {
    1
}

fn default_queue_capacity() -> usize {
    16
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    300
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            transfer_parallelism: default_transfer_parallelism(),
            queue_capacity: default_queue_capacity(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// 🚀 Load the config, from a file, from env vars, or from the sheer power of hoping.
///
/// 🔧 Merges environment variables (`BKX_*`, nested keys split on `__`) with an optional
/// TOML file. TOML wins on conflicts.
///
/// 📐 If `config_file_name` is None → env vars only. If Some → env vars + TOML file, merged.
pub fn load_config(config_file_name: Option<&Path>) -> Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("BKX_").split("__"));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (BKX_*). \
             The file exists in our hearts, but apparently not in a shape serde recognizes.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (BKX_*). \
                 No file was provided, this one's all on the environment. Classic."
            .to_string(),
    };

    config.extract().context(context_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_test_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("bkx.toml");
        fs::write(&path, contents)
            .expect("💀 Failed to write test config. The filesystem said 'new phone who dis'.");
        path
    }

    fn project(url: &str, key: Option<&str>) -> ProjectConfig {
        ProjectConfig {
            url: url.to_string(),
            service_key: key.map(String::from),
        }
    }

    #[test]
    fn the_one_where_the_whole_file_parses() {
        let dir = tempfile::tempdir().expect("💀 no tempdir, no test");
        let path = write_test_config(
            &dir,
            r#"
            buckets = ["invoices", "mc-photos", "cam"]

            [source]
            url = "https://old.example.co"
            service_key = "old-key"

            [destination]
            url = "https://new.example.co"
            service_key = "new-key"

            [listing]
            page_size = 250
            follow_pagination = false

            [staging]
            root = "/tmp/somewhere"
            retain_on_failure = true

            [runtime]
            transfer_parallelism = 4
            queue_capacity = 32
            "#,
        );

        let config = load_config(Some(path.as_path())).expect("💀 config should parse");

        assert_eq!(config.buckets, vec!["invoices", "mc-photos", "cam"]);
        assert_eq!(config.listing.page_size, 250);
        assert!(!config.listing.follow_pagination);
        assert_eq!(config.staging.root, PathBuf::from("/tmp/somewhere"));
        assert!(config.staging.retain_on_failure);
        assert_eq!(config.runtime.transfer_parallelism, 4);
        assert_eq!(config.runtime.queue_capacity, 32);
        // -- ⏱️ untouched knobs keep their defaults
        assert_eq!(config.runtime.request_timeout_secs, 300);
    }

    #[test]
    fn the_one_where_defaults_show_up_uninvited_but_helpful() {
        let dir = tempfile::tempdir().expect("💀 no tempdir, no test");
        let path = write_test_config(
            &dir,
            r#"
            [source]
            url = "https://old.example.co"

            [destination]
            url = "https://new.example.co"
            "#,
        );

        let config: AppConfig = Figment::new()
            .merge(Toml::file(path.as_path()))
            .extract()
            .expect("💀 defaults should fill the gaps");

        assert_eq!(config.buckets, DEFAULT_BUCKETS);
        assert_eq!(config.listing.page_size, 1000);
        assert!(config.listing.follow_pagination);
        assert_eq!(config.runtime.transfer_parallelism, 1);
        assert_eq!(config.runtime.queue_capacity, 16);
        assert!(!config.staging.retain_on_failure);
        assert!(config.staging.root.ends_with("bkx-staging"));
    }

    #[test]
    fn the_one_where_credentials_are_present_and_accounted_for() {
        let config = AppConfig {
            source: project("https://old", Some("old-key")),
            destination: project("https://new", Some("  new-key  ")),
            buckets: vec![],
            listing: ListingConfig::default(),
            staging: StagingConfig::default(),
            runtime: RuntimeConfig::default(),
        };

        let creds = config.credentials().expect("💀 both keys are right there");
        assert_eq!(creds.source, "old-key");
        assert_eq!(creds.destination, "new-key");
    }

    #[test]
    fn the_one_where_a_blank_key_is_no_key_at_all() {
        let config = AppConfig {
            source: project("https://old", None),
            destination: project("https://new", Some("   ")),
            buckets: vec![],
            listing: ListingConfig::default(),
            staging: StagingConfig::default(),
            runtime: RuntimeConfig::default(),
        };

        let err = config.credentials().err().expect("💀 should have bailed");
        let msg = err.to_string();
        assert!(msg.contains("BKX_SOURCE__SERVICE_KEY"));
        assert!(msg.contains("BKX_DESTINATION__SERVICE_KEY"));
    }

    #[test]
    fn the_one_where_debug_output_keeps_secrets_secret() {
        let rendered = format!("{:?}", project("https://old", Some("super-secret")));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
