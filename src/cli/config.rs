//! `qgate config`: show the effective configuration.

use std::path::Path;

use crate::config::Config;
use crate::error::Error;

/// Print the configuration the gate would use for `project_root`, as TOML.
pub fn show(project_root: &Path, config: &Config) -> Result<(), Error> {
    let project_file = Config::project_path(project_root);
    let global_file = Config::global_dir().join("config.toml");

    let source = if project_file.exists() {
        project_file.display().to_string()
    } else if global_file.exists() {
        global_file.display().to_string()
    } else {
        "built-in defaults".to_string()
    };

    println!("# Effective qgate configuration (from {})", source);
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}
