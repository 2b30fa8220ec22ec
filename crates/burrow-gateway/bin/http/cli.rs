use anyhow::{bail, Context};
use burrow_gateway::net::parse_cidr;
use clap::builder::BoolishValueParser;
use clap::Parser;
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const SERVER_ADDRESS_ENV: &str = "SERVER_ADDRESS";
pub const GRPC_ADDRESS_ENV: &str = "GRPC_ADDRESS";
pub const BASE_URL_ENV: &str = "BASE_URL";
pub const FILE_STORAGE_PATH_ENV: &str = "FILE_STORAGE_PATH";
pub const DATABASE_DSN_ENV: &str = "DATABASE_DSN";
pub const TOKEN_SECRET_ENV: &str = "TOKEN_SECRET";
pub const TRUSTED_SUBNET_ENV: &str = "TRUSTED_SUBNET";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const LOG_JSON_ENV: &str = "LOG_JSON";
pub const ENABLE_HTTPS_ENV: &str = "ENABLE_HTTPS";
pub const CERT_PATH_ENV: &str = "CERT_PATH";
pub const CERT_KEY_PATH_ENV: &str = "CERT_KEY_PATH";
pub const CONFIG_ENV: &str = "CONFIG";

pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8080";
pub const DEFAULT_GRPC_ADDRESS: &str = "127.0.0.1:8081";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Parser)]
#[command(name = "burrow-gateway")]
pub struct Cli {
    #[arg(short = 'a', long, env = SERVER_ADDRESS_ENV)]
    pub server_address: Option<SocketAddr>,

    #[arg(short = 'g', long, env = GRPC_ADDRESS_ENV)]
    pub grpc_address: Option<SocketAddr>,

    /// Prefix of every short URL handed out.
    #[arg(short = 'b', long, env = BASE_URL_ENV)]
    pub base_url: Option<String>,

    #[arg(short = 'f', long, env = FILE_STORAGE_PATH_ENV)]
    pub file_storage_path: Option<PathBuf>,

    /// Postgres connection string. Takes precedence over the file path.
    #[arg(short = 'd', long, env = DATABASE_DSN_ENV)]
    pub database_dsn: Option<String>,

    #[arg(short = 'k', long, env = TOKEN_SECRET_ENV)]
    pub token_secret: Option<String>,

    /// CIDR range allowed to read `/api/internal/stats`.
    #[arg(short = 't', long, env = TRUSTED_SUBNET_ENV)]
    pub trusted_subnet: Option<String>,

    #[arg(short = 'l', long, env = LOG_LEVEL_ENV)]
    pub log_level: Option<String>,

    #[arg(long, env = LOG_JSON_ENV)]
    pub log_json: bool,

    /// Serve both listeners over TLS. Needs a certificate and its key.
    #[arg(short = 's', long, env = ENABLE_HTTPS_ENV, value_parser = BoolishValueParser::new())]
    pub enable_https: bool,

    /// PEM certificate chain.
    #[arg(long, env = CERT_PATH_ENV)]
    pub cert_path: Option<PathBuf>,

    /// PEM private key matching `cert_path`.
    #[arg(long, env = CERT_KEY_PATH_ENV)]
    pub cert_key_path: Option<PathBuf>,

    /// JSON file filling in anything not given as a flag or variable.
    #[arg(short = 'c', long = "config", env = CONFIG_ENV)]
    pub config: Option<PathBuf>,
}

/// Settings read from the `--config` JSON file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server_address: Option<SocketAddr>,
    pub grpc_address: Option<SocketAddr>,
    pub base_url: Option<String>,
    pub file_storage_path: Option<PathBuf>,
    pub database_dsn: Option<String>,
    pub token_secret: Option<String>,
    pub trusted_subnet: Option<String>,
    pub log_level: Option<String>,
    pub enable_https: Option<bool>,
    pub cert_path: Option<PathBuf>,
    pub cert_key_path: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    File(PathBuf),
    Postgres(String),
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Memory => write!(f, "in-memory"),
            StorageBackend::File(path) => write!(f, "file ({})", path.display()),
            StorageBackend::Postgres(_) => write!(f, "postgres"),
        }
    }
}

/// Certificate and key served by both listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Fully resolved gateway configuration.
#[derive(Debug)]
pub struct Config {
    pub server_address: SocketAddr,
    pub grpc_address: SocketAddr,
    pub base_url: String,
    pub backend: StorageBackend,
    pub token_secret: Option<String>,
    pub trusted_subnet: Option<String>,
    pub log_level: String,
    pub log_json: bool,
    pub tls: Option<TlsPaths>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

impl Cli {
    /// Loads the config file, if any, and merges it under flags and env.
    pub fn resolve(self) -> anyhow::Result<Config> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Config::merge(self, file)
    }
}

impl Config {
    pub fn merge(cli: Cli, file: FileConfig) -> anyhow::Result<Self> {
        let server_address = match cli.server_address.or(file.server_address) {
            Some(addr) => addr,
            None => DEFAULT_SERVER_ADDRESS.parse()?,
        };

        let grpc_address = match cli.grpc_address.or(file.grpc_address) {
            Some(addr) => addr,
            None => DEFAULT_GRPC_ADDRESS.parse()?,
        };
        if grpc_address == server_address {
            bail!("http and grpc listeners cannot share {server_address}");
        }

        let base_url = non_empty(cli.base_url)
            .or(non_empty(file.base_url))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let database_dsn = non_empty(cli.database_dsn).or(non_empty(file.database_dsn));
        let file_storage_path = cli
            .file_storage_path
            .or(file.file_storage_path)
            .filter(|path| !path.as_os_str().is_empty());
        let backend = match (database_dsn, file_storage_path) {
            (Some(dsn), _) => StorageBackend::Postgres(dsn),
            (None, Some(path)) => StorageBackend::File(path),
            (None, None) => StorageBackend::Memory,
        };

        let trusted_subnet = non_empty(cli.trusted_subnet).or(non_empty(file.trusted_subnet));
        if let Some(subnet) = &trusted_subnet {
            if parse_cidr(subnet).is_none() {
                bail!("trusted subnet '{subnet}' is not valid CIDR notation");
            }
        }

        let enable_https = cli.enable_https || file.enable_https.unwrap_or(false);
        let tls = if enable_https {
            let cert = cli.cert_path.or(file.cert_path);
            let key = cli.cert_key_path.or(file.cert_key_path);
            match (cert, key) {
                (Some(cert), Some(key)) => Some(TlsPaths { cert, key }),
                _ => bail!("https needs both a certificate path and a key path"),
            }
        } else {
            None
        };

        Ok(Self {
            server_address,
            grpc_address,
            base_url: base_url.trim_end_matches('/').to_string(),
            backend,
            token_secret: non_empty(cli.token_secret).or(non_empty(file.token_secret)),
            trusted_subnet,
            log_level: non_empty(cli.log_level)
                .or(non_empty(file.log_level))
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_json: cli.log_json,
            tls,
        })
    }
}
