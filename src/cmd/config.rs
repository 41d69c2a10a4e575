use std::path::Path;

use anyhow::Result;

use qiyi::config::config_path;
use qiyi::ResolverConfig;

pub fn cmd_config(config: &ResolverConfig, explicit: Option<&Path>) -> Result<()> {
    let path = explicit.map_or_else(config_path, Path::to_path_buf);
    let state = if path.exists() { "" } else { " (not found, defaults)" };

    println!("# {}{state}", path.display());
    println!("# signer: {}", config.signer_script_path().display());
    print!("{}", config.to_toml()?);
    Ok(())
}
