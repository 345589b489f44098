//! Settings resolution.
//!
//! # Precedence
//! ```text
//! config_path : CLI > built-in default
//! host        : CLI (non-empty) > cloud.serverName
//! port        : CLI (nonzero)   > cloud.port
//! proto, tty  : CLI > built-in default
//! uuid        : cloud.uuid only, never the command line
//! ```
//!
//! The device identity (`uuid`) must come from the trusted config file, so
//! there is deliberately no flag for it.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use clap::{ArgAction, CommandFactory, Parser, ValueEnum};
use thiserror::Error;

use crate::config::backend::{ConfigBackend, ConfigError};

/// Default location of the gateway configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/knot/gatewayConfig.json";

/// Section holding the cloud connection values.
pub const CLOUD_SECTION: &str = "cloud";

/// Command-line arguments.
///
/// `-h` is taken by `--host`, so clap's help flag is replaced by `-H/--help`.
#[derive(Debug, Parser)]
#[command(name = "knotd", about = "KNoT gateway daemon", disable_help_flag = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Cloud server host name
    #[arg(short = 'h', long = "host", value_name = "HOST")]
    pub host: Option<String>,

    /// Remote port
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Protocol used to communicate with the cloud server
    #[arg(short = 'P', long = "proto", value_enum, default_value_t = Proto::Ws)]
    pub proto: Proto,

    /// TTY device path, e.g. /dev/ttyUSB0
    #[arg(short = 't', long = "tty", value_name = "DEVICE")]
    pub tty: Option<String>,

    /// Disable running in background
    #[arg(short = 'n', long = "nodetach")]
    pub nodetach: bool,

    /// Disable running as nobody
    #[arg(short = 'b', long = "disable-nobody")]
    pub disable_nobody: bool,

    /// Show help options
    #[arg(short = 'H', long = "help", action = ArgAction::SetTrue)]
    pub help: bool,
}

impl Cli {
    /// Usage text printed for `--help`.
    pub fn usage() -> String {
        Cli::command().render_help().to_string()
    }
}

/// Transport used to reach the cloud server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Proto {
    Ws,
    Http,
}

impl fmt::Display for Proto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Proto::Ws => write!(f, "ws"),
            Proto::Http => write!(f, "http"),
        }
    }
}

/// Effective runtime configuration.
///
/// Only [`resolve`] builds one; everything else sees it through shared
/// references.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    config_path: PathBuf,
    host: String,
    port: u16,
    proto: Proto,
    tty: Option<String>,
    uuid: String,
    detach: bool,
    run_as_nobody: bool,
}

impl Settings {
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn proto(&self) -> Proto {
        self.proto
    }

    pub fn tty(&self) -> Option<&str> {
        self.tty.as_deref()
    }

    /// Device identity, read from the config file only.
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Whether to detach from the controlling terminal before the loop.
    pub fn detach(&self) -> bool {
        self.detach
    }

    /// Whether to switch to the unprivileged `nobody` identity.
    pub fn run_as_nobody(&self) -> bool {
        self.run_as_nobody
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("config_path", &self.config_path)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("proto", &self.proto)
            .field("tty", &self.tty)
            .field("uuid", &"<redacted>")
            .field("detach", &self.detach)
            .field("run_as_nobody", &self.run_as_nobody)
            .finish()
    }
}

/// Result of a successful resolution.
#[derive(Debug)]
pub enum Resolution {
    Settings(Settings),
    /// `--help` was given; carries the usage text.
    Help(String),
}

/// Error type for settings resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid arguments: {0}")]
    Arguments(#[from] clap::Error),

    #[error("missing KNoT configuration file")]
    MissingConfigPath,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{} has no cloud.{key}", path.display())]
    MissingField { path: PathBuf, key: &'static str },

    #[error("{} has an invalid cloud.port: {value}", path.display())]
    InvalidPort { path: PathBuf, value: i64 },
}

/// Merge command line, config file and defaults into [`Settings`].
///
/// `args` includes the program name, as with [`std::env::args_os`].
pub fn resolve<I, T, B>(args: I, backend: &B) -> Result<Resolution, ResolveError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    B: ConfigBackend + ?Sized,
{
    let cli = Cli::try_parse_from(args)?;
    if cli.help {
        return Ok(Resolution::Help(Cli::usage()));
    }

    if cli.config.as_os_str().is_empty() {
        return Err(ResolveError::MissingConfigPath);
    }
    let path = cli.config.as_path();

    let uuid = backend
        .read_string(path, CLOUD_SECTION, "uuid")?
        .ok_or_else(|| missing(path, "uuid"))?;

    let host = match cli.host.filter(|host| !host.is_empty()) {
        Some(host) => host,
        None => backend
            .read_string(path, CLOUD_SECTION, "serverName")?
            .ok_or_else(|| missing(path, "serverName"))?,
    };

    let port = match cli.port.filter(|port| *port != 0) {
        Some(port) => port,
        None => {
            let value = backend
                .read_int(path, CLOUD_SECTION, "port")?
                .ok_or_else(|| missing(path, "port"))?;
            u16::try_from(value)
                .ok()
                .filter(|port| *port != 0)
                .ok_or_else(|| ResolveError::InvalidPort {
                    path: path.to_path_buf(),
                    value,
                })?
        }
    };

    Ok(Resolution::Settings(Settings {
        config_path: cli.config,
        host,
        port,
        proto: cli.proto,
        tty: cli.tty,
        uuid,
        detach: !cli.nodetach,
        run_as_nobody: !cli.disable_nobody,
    }))
}

fn missing(path: &Path, key: &'static str) -> ResolveError {
    ResolveError::MissingField {
        path: path.to_path_buf(),
        key,
    }
}
