use std::{collections::BTreeMap, path::PathBuf};

use eyre::OptionExt;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

/// Name of the configuration file inside [`config_dir`]
pub const CONFIG_FILE: &str = "eac.toml";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Where generated requests and keys are written
    pub output_dir: PathBuf,
    /// Alias of the request signer certificate used for outer signatures
    pub rsc_alias: Option<String>,
    /// PKCS#8 files loaded into the key service, by alias
    pub keys: BTreeMap<String, PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            rsc_alias: None,
            keys: BTreeMap::new(),
        }
    }
}

/// Returns the base config directory, `$EAC_CONFIG_DIR` or `~/.eac`. It also
/// creates the directory if it doesn't exist yet.
pub fn config_dir() -> eyre::Result<PathBuf> {
    let dir = match std::env::var_os("EAC_CONFIG_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => std::env::home_dir()
            .ok_or_eyre("home directory not found")?
            .join(".eac"),
    };
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?
    }
    Ok(dir)
}

pub fn load_config() -> eyre::Result<Config> {
    Ok(figment(config_dir()?.join(CONFIG_FILE)).extract()?)
}

fn figment(file: PathBuf) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed("EAC_").ignore(&["config_dir"]))
}
