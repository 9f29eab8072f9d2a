use super::config::{default_config_path, DaoConfig};
use std::path::PathBuf;

/// Write a commented default configuration file
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn execute(
    config_path: Option<PathBuf>,
    rpc_url: String,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path.unwrap_or_else(default_config_path);

    if path.exists() && !force {
        return Err(format!(
            "Config file already exists at '{}'. Use --force to overwrite.",
            path.display()
        )
        .into());
    }

    DaoConfig::create_default(&path, &rpc_url)?;

    println!("📝 Created {}", path.display());
    println!("   Set the contract addresses under [contracts] before running other commands.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        execute(Some(path.clone()), "http://node:8545".to_string(), false).unwrap();

        let config = DaoConfig::load(&path).unwrap();
        assert_eq!(config.network.rpc_url, "http://node:8545");
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "keep me").unwrap();

        let err = execute(Some(path.clone()), "http://node:8545".to_string(), false).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");

        execute(Some(path.clone()), "http://node:8545".to_string(), true).unwrap();
        assert!(DaoConfig::load(&path).is_ok());
    }
}
