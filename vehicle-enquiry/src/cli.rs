use std::{path::PathBuf, time::Duration};

use clap::Args;

use crate::{
    client::{ApiKey, ClientConfig, DEFAULT_ENDPOINT},
    error::RegistryError,
};

/// Where and how to reach the registry.
#[derive(Debug, Args)]
pub struct ConnectionArgs {
    /// Registry API key.
    #[arg(long, env = "DVLA_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Registry enquiry endpoint.
    #[arg(long, env = "DVLA_API_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Give up on a request after this many seconds. No timeout by default.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

impl ConnectionArgs {
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] if the API key is empty.
    pub fn client_config(&self) -> Result<ClientConfig, RegistryError> {
        Ok(ClientConfig {
            endpoint: self.endpoint.clone(),
            api_key: ApiKey::new(self.api_key.clone())?,
            timeout: self.timeout.map(Duration::from_secs),
        })
    }
}

#[derive(Debug, Args)]
pub struct LoggingArgs {
    /// Print debug logging to stderr.
    #[arg(long)]
    pub debug: bool,

    /// Also append logs to this file.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl LoggingArgs {
    /// # Errors
    ///
    /// See [`crate::logging::init`].
    pub fn init(&self) -> Result<(), crate::logging::LoggingError> {
        crate::logging::init(self.debug, self.log_file.as_deref())
    }
}
