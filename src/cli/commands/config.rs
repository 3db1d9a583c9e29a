//! Configuration command.

use std::path::Path;

use crate::config::{self, Config, ConfigError};

/// Print the effective configuration, or write it with `init`
pub fn cmd_config(path: Option<&Path>, config: &Config, init: bool) -> anyhow::Result<()> {
    if init {
        let written = match path {
            Some(path) => {
                config::save_to(config, path)?;
                path.to_path_buf()
            }
            None => config::save(config)?,
        };
        println!("Wrote {}", written.display());
        return Ok(());
    }

    if let Some(path) = path.map(Path::to_path_buf).or_else(config::config_path) {
        println!("# {}", path.display());
    }
    let text = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    print!("{}", text);
    Ok(())
}
