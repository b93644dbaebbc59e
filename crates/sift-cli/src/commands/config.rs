//! Config command - show or write the configuration.

use sift_core::Config;
use std::path::PathBuf;

/// Run the config command.
pub fn run(
    config: Config,
    explicit_path: Option<PathBuf>,
    show_path: bool,
    init: bool,
) -> anyhow::Result<()> {
    let path = match explicit_path {
        Some(path) => path,
        None => Config::default_config_path()?,
    };

    if show_path {
        println!("{}", path.display());
        return Ok(());
    }

    if init {
        if path.exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }
        config.save_to(&path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
