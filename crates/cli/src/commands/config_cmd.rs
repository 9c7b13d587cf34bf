//! `cocochat config`: configuration file management.

use std::path::Path;

use cocochat_config::AppConfig;

/// Write the starter config to `path`, refusing to clobber unless `force`.
pub fn init(path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !force {
        println!("Config already exists at {}", path.display());
        println!("Use --force to overwrite it.");
        return Ok(());
    }

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    println!("Wrote default config to {}", path.display());
    println!("Set COCOCHAT_API_KEY (or OPENAI_API_KEY) before running `cocochat chat`.");
    Ok(())
}

pub fn show(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let toml_str = toml::to_string_pretty(&config.redacted())?;
    println!("{toml_str}");
    Ok(())
}

pub fn path(path: &Path) {
    println!("{}", path.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        init(&path, false).unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.agent.max_rounds, 8);
    }

    #[test]
    fn init_keeps_existing_file_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "environment = \"production\"\n").unwrap();

        init(&path, false).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "environment = \"production\"\n"
        );

        init(&path, true).unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert!(config.is_local());
    }
}
