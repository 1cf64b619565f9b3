use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use lhremote_cdp::{DEFAULT_CDP_HOST, DEFAULT_CDP_PORT, Endpoint};
use lhremote_core::{DatabaseLocator, Orchestrator};
use std::path::PathBuf;

pub mod commands;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Pretty => "pretty",
            OutputFormat::Json => "json",
        }
    }
}

/// Where the launcher listens and where account databases live
#[derive(Args, Clone, Debug)]
pub struct ConnectionArgs {
    /// Launcher debug port
    #[arg(long, global = true, env = "LHREMOTE_CDP_PORT", default_value_t = DEFAULT_CDP_PORT)]
    pub cdp_port: u16,

    /// Launcher debug host
    #[arg(long, global = true, env = "LHREMOTE_CDP_HOST", default_value = DEFAULT_CDP_HOST)]
    pub cdp_host: String,

    /// Allow a non-loopback --cdp-host
    #[arg(long, global = true, env = "LHREMOTE_ALLOW_REMOTE")]
    pub allow_remote: bool,

    /// Application data directory holding account databases
    #[arg(long, global = true, env = "LHREMOTE_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

impl ConnectionArgs {
    pub fn endpoint(&self) -> Result<Endpoint> {
        Ok(Endpoint::new(
            self.cdp_host.clone(),
            self.cdp_port,
            self.allow_remote,
        )?)
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => DatabaseLocator::default_data_dir()
                .context("Could not determine the application data directory; pass --data-dir"),
        }
    }

    pub fn orchestrator(&self) -> Result<Orchestrator> {
        Ok(Orchestrator::new(self.endpoint()?, self.data_dir()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(host: &str, allow_remote: bool) -> ConnectionArgs {
        ConnectionArgs {
            cdp_port: 9222,
            cdp_host: host.to_string(),
            allow_remote,
            data_dir: Some(PathBuf::from("/tmp/lh")),
        }
    }

    #[test]
    fn test_remote_host_requires_opt_in() {
        assert!(args("127.0.0.1", false).endpoint().is_ok());
        assert!(args("localhost", false).endpoint().is_ok());

        let err = args("192.168.1.20", false).endpoint().unwrap_err();
        assert!(err.to_string().contains("--allow-remote"));

        let endpoint = args("192.168.1.20", true).endpoint().unwrap();
        assert_eq!(endpoint.host(), "192.168.1.20");
    }

    #[test]
    fn test_explicit_data_dir() {
        assert_eq!(
            args("127.0.0.1", false).data_dir().unwrap(),
            PathBuf::from("/tmp/lh")
        );
    }
}
