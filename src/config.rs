// Tool Configuration
// Defaults, overridden by an optional JSON file, overridden by RSA_TOOL_* env vars

use std::path::Path;

use anyhow::Context;
use config::Config;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RsaConfig {
    // minimum modulus bits for keygen
    pub nbits: u64,

    // Miller-Rabin rounds
    pub iters: u64,

    // blocks per parallel batch in the file codec
    pub batch_blocks: usize,

    // worker threads for block processing
    pub threads: usize,
}

impl Default for RsaConfig {
    fn default() -> Self {
        Self {
            nbits: 1024,
            iters: 50,
            batch_blocks: 64,
            threads: (num_cpus::get() >> 1).max(1),
        }
    }
}

impl RsaConfig {
    pub const ENV_PREFIX: &'static str = "RSA_TOOL";

    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let default_config =
            Config::try_from(&RsaConfig::default()).context("cannot serialize default config")?;

        let mut builder = Config::builder().add_source(default_config);

        if let Some(f) = file {
            builder = builder.add_source(config::File::from(f));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(Self::ENV_PREFIX)
                    .prefix_separator("_")
                    .try_parsing(true)
                    .separator("__"),
            )
            .build()
            .context("cannot load configuration")?;

        let mut rsa_config: RsaConfig = config
            .try_deserialize()
            .context("invalid configuration values")?;

        rsa_config.threads = rsa_config.threads.max(1);
        rsa_config.batch_blocks = rsa_config.batch_blocks.max(1);

        log::trace!("{:?}", rsa_config);

        Ok(rsa_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RsaConfig::default();
        assert_eq!(config.nbits, 1024);
        assert_eq!(config.iters, 50);
        assert!(config.threads >= 1);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("rsa_tool_config_{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "nbits": 2048, "batch_blocks": 0 }"#).unwrap();

        let config = RsaConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.nbits, 2048);
        assert_eq!(config.iters, 50);
        assert_eq!(config.batch_blocks, 1);
    }

    #[test]
    fn test_env_overrides_defaults() {
        // no other test loads `threads`
        std::env::set_var("RSA_TOOL_THREADS", "3");
        let config = RsaConfig::load(None);
        std::env::remove_var("RSA_TOOL_THREADS");

        let config = config.unwrap();
        assert_eq!(config.threads, 3);
        assert_eq!(config.batch_blocks, 64);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("rsa_tool_config_does_not_exist.json");
        assert!(RsaConfig::load(Some(&path)).is_err());
    }
}
