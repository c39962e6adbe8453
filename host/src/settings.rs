//! Configuration resolution.
//!
//! Priority order: an explicit `--config-file` path, then
//! `$CARDUTIL_CONFIG/cardutil.json`, then the built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use mciipm::Config;

pub const CONFIG_ENV_VAR: &str = "CARDUTIL_CONFIG";
pub const CONFIG_FILENAME: &str = "cardutil.json";

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    BuiltIn,
}

/// Resolve the configuration for a tool run.
pub fn load_config(cli_path: Option<&Path>) -> Result<(Config, ConfigSource), String> {
    if let Some(path) = cli_path {
        info!("using config at {}", path.display());
        return Ok((read_config(path)?, ConfigSource::File(path.to_path_buf())));
    }

    if let Some(dir) = std::env::var_os(CONFIG_ENV_VAR) {
        let path = PathBuf::from(dir).join(CONFIG_FILENAME);
        debug!("checking {} from ${CONFIG_ENV_VAR}", path.display());
        if path.is_file() {
            info!("using config at {}", path.display());
            return Ok((read_config(&path)?, ConfigSource::File(path)));
        }
    }

    Ok((Config::default(), ConfigSource::BuiltIn))
}

fn read_config(path: &Path) -> Result<Config, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read config file {}: {e}", path.display()))?;
    serde_json::from_str(&text)
        .map_err(|e| format!("malformed config file {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let missing = Path::new("/definitely/not/here/cardutil.json");
        assert!(load_config(Some(missing)).is_err());
    }

    #[test]
    fn test_explicit_file_wins() {
        let dir = std::env::temp_dir().join("cardutil-settings-test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("override.json");
        fs::write(&path, r#"{"output_data_elements": ["MTI"]}"#).unwrap();

        let (config, source) = load_config(Some(&path)).unwrap();
        assert_eq!(config.output_data_elements, vec!["MTI"]);
        assert_eq!(source, ConfigSource::File(path.clone()));

        fs::remove_file(path).ok();
    }
}
