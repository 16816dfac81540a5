mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./cachemux.toml",
        "~/.config/cachemux/config.toml",
        "/etc/cachemux/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if let Some(root) = &config.cache.root {
        if !root.exists() {
            tracing::warn!("Cache root does not exist: {:?}", root);
        }
    }

    if let Some(mp4box) = &config.tools.mp4box {
        if !mp4box.exists() {
            anyhow::bail!("Configured MP4Box path does not exist: {:?}", mp4box);
        }
    }

    if let Some(converter) = &config.subtitles.converter {
        if !converter.exists() {
            tracing::warn!("Subtitle converter does not exist: {:?}", converter);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
        assert!(config.subtitles.enabled);
        assert_eq!(config.output.name_clash, NameClashPolicy::Rename);
    }

    #[test]
    fn parses_full_config() {
        let toml = r#"
            [cache]
            root = "/tmp/cache"

            [output]
            overwrite = true
            name_clash = "overwrite"
            collect_unmerged = true

            [subtitles]
            enabled = false
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.root.as_deref().unwrap().to_str(), Some("/tmp/cache"));
        assert!(config.output.overwrite);
        assert_eq!(config.output.name_clash, NameClashPolicy::Overwrite);
        assert!(config.output.collect_unmerged);
        assert!(!config.subtitles.enabled);
    }

    #[test]
    fn missing_mp4box_path_rejected() {
        let config: Config = toml::from_str(
            r#"
            [tools]
            mp4box = "/no/such/mp4box"
        "#,
        )
        .unwrap();
        assert!(validate_config(&config).is_err());
    }
}
