//! Layered client configuration: built-in defaults, an optional TOML file,
//! `TODO_CLIENT_*` environment variables, then command-line overrides.

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use todo_client_core::ClientConfig;

pub const ENV_PREFIX: &str = "TODO_CLIENT";
const DEFAULT_FILE: &str = "todo-client";

/// Values given on the command line; they win over every other source.
#[derive(Debug, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub google_client_id: Option<String>,
}

pub fn load(file: Option<&Path>, overrides: Overrides) -> Result<ClientConfig> {
    dotenvy::dotenv().ok();

    let defaults = Config::try_from(&ClientConfig::default())
        .context("could not encode default configuration")?;
    let file_source = match file {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_FILE).required(false),
    };

    let config = Config::builder()
        .add_source(defaults)
        .add_source(file_source)
        .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .set_override_option("api_url", overrides.api_url)?
        .set_override_option("google_client_id", overrides.google_client_id)?
        .build()
        .context("could not load configuration")?;

    let settings: ClientConfig = config
        .try_deserialize()
        .context("invalid configuration")?;
    Ok(settings)
}
