use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// GLORY community server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "glory-server", version, about = "GLORY community server")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "GLORY_PORT", default_value = "3000")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "GLORY_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./glory.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "GLORY_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Data directory for persistent state (DB, JWT signing key)
    #[arg(long, env = "GLORY_DATA_DIR", default_value = "./data")]
    pub data_dir: String,

    /// Directory for uploaded files (avatars, post media, voice messages)
    #[arg(long, env = "GLORY_UPLOADS_DIR", default_value = "./uploads")]
    pub uploads_dir: String,

    /// Maximum upload size in megabytes
    #[arg(long, env = "GLORY_MAX_UPLOAD_MB", default_value = "20")]
    pub max_upload_mb: u32,

    /// Email of the primary admin account seeded on first boot
    #[arg(long, env = "GLORY_ADMIN_EMAIL", default_value = "admin@glory.com")]
    pub admin_email: String,

    /// Password for the primary admin account (first boot only)
    #[arg(long, env = "GLORY_ADMIN_PASSWORD", default_value = "glory2025")]
    pub admin_password: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            bind_address: "0.0.0.0".to_string(),
            config: "./glory.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            uploads_dir: "./uploads".to_string(),
            max_upload_mb: 20,
            admin_email: "admin@glory.com".to_string(),
            admin_password: "glory2025".to_string(),
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (GLORY_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("GLORY_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# GLORY Community Server Configuration
# Place this file at ./glory.toml or specify with --config <path>
# All settings can be overridden via environment variables (GLORY_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 3000)
# port = 3000

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for SQLite database and JWT signing key
# data_dir = "./data"

# Directory for uploaded files (avatars, post media, voice messages)
# uploads_dir = "./uploads"

# Maximum upload size in megabytes (default: 20)
# max_upload_mb = 20

# Primary admin account seeded on first boot
# admin_email = "admin@glory.com"
# admin_password = "glory2025"
"#
    .to_string()
}
