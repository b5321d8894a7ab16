use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use mediaviewer_db::shortcut_id::validate_node_id;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub listen_address: SocketAddr,
    pub default_homeserver_url: Option<String>,
    pub force_default_homeserver: bool,
    pub node_id: Option<u16>,
    pub trust_forward_headers: bool,
    pub frontend_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let listen_address = var("BMV_LISTEN_ADDRESS")
            .unwrap_or_else(|| "0.0.0.0:29333".into())
            .parse()
            .context("invalid BMV_LISTEN_ADDRESS")?;

        let node_id = match var("BMV_NODE_ID") {
            Some(raw) => {
                let id: u64 = raw.parse().context("invalid BMV_NODE_ID")?;
                Some(validate_node_id(id)?)
            }
            None => None,
        };

        let config = Self {
            database_path: var("BMV_DATABASE_PATH")
                .unwrap_or_else(|| "mediaviewer.db".into())
                .into(),
            listen_address,
            default_homeserver_url: var("BMV_DEFAULT_HOMESERVER_URL"),
            force_default_homeserver: parse_bool(
                "BMV_FORCE_DEFAULT_HOMESERVER",
                var("BMV_FORCE_DEFAULT_HOMESERVER"),
            )?,
            node_id,
            trust_forward_headers: parse_bool(
                "BMV_TRUST_FORWARD_HEADERS",
                var("BMV_TRUST_FORWARD_HEADERS"),
            )?,
            frontend_dir: var("BMV_FRONTEND_DIR")
                .unwrap_or_else(|| "./frontend".into())
                .into(),
        };

        if config.force_default_homeserver && config.default_homeserver_url.is_none() {
            bail!("BMV_FORCE_DEFAULT_HOMESERVER is set but BMV_DEFAULT_HOMESERVER_URL is not");
        }
        Ok(config)
    }
}

fn parse_bool(key: &str, value: Option<String>) -> Result<bool> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.as_str() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => bail!("invalid {key}: {other:?} is not a boolean"),
    }
}
