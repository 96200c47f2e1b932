use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use glory_server::auth::{self, accounts};
use glory_server::config::{generate_config_template, Config};
use glory_server::{db, live, routes, state, ws};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "glory_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "glory_server=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!("GLORY server v{} starting", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite database
    let db = db::init_db(&config.data_dir)?;

    // Load or generate JWT signing key (256-bit random, stored in data_dir)
    let jwt_secret = auth::jwt::load_or_generate_jwt_secret(&config.data_dir)?;

    // Seed the primary admin account on first boot
    if accounts::seed_admin(&db, &config.admin_email, &config.admin_password)? {
        tracing::info!(email = %config.admin_email, "Created primary admin account");
    }

    // Uploaded media lives outside data_dir so it can be served statically
    std::fs::create_dir_all(&config.uploads_dir)?;

    let connections = ws::new_connection_registry();
    let app_state = state::AppState {
        db,
        jwt_secret,
        live: live::LiveState::new(connections.clone()),
        connections,
        rooms: ws::new_room_registry(),
        uploads_dir: PathBuf::from(&config.uploads_dir),
    };

    let max_upload_bytes = config.max_upload_mb as usize * 1024 * 1024;
    let app = routes::build_router(app_state, max_upload_bytes);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
