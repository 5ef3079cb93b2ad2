use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "socialserver", about = "A social networking backend")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub accounts: AccountsConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// Sessions idle for longer than this are discarded on next use.
    pub session_idle_hours: u64,
    pub min_password_len: usize,
    pub max_password_len: usize,
    pub revoke_sessions_on_password_change: bool,
    /// Argon2 memory cost in KiB.
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AccountsConfig {
    pub require_admin_approval: bool,
    pub require_invite_code: bool,
    pub invite_codes_per_user: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9801,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_idle_hours: 720,
            min_password_len: 8,
            max_password_len: 256,
            revoke_sessions_on_password_change: true,
            hash_memory_kib: 19 * 1024,
            hash_iterations: 2,
        }
    }
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            require_admin_approval: false,
            require_invite_code: false,
            invite_codes_per_user: 5,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli)?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("socialserver.db"));
        }

        if config.auth.min_password_len > config.auth.max_password_len {
            anyhow::bail!("auth.min_password_len must not exceed auth.max_password_len");
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
        match &cli.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::home_dir()
                .map(|home| home.join(".socialserver"))
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory")),
        }
    }

    /// Database location; `load` always fills this in.
    pub fn db_path(&self) -> Option<&PathBuf> {
        self.database.path.as_ref()
    }
}
