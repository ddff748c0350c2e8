use std::{error::Error, sync::Arc};

use dotenvy::dotenv;

use stockroom::{
    config::{AuthMode, Config, MovementTypePolicy},
    create_router,
    database::{Database, MemoryStore, PgStore},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    let config = Config::from_env()?;

    let db: Database = match &config.database_url {
        Some(url) => Arc::new(PgStore::connect(url).await?),
        None => {
            log::warn!("DATABASE_URL not set; records are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    if config.auth_mode == AuthMode::Legacy {
        log::warn!("AUTH_MODE=legacy: requests without credentials act as the system user");
    }
    if config.movement_types == MovementTypePolicy::Legacy {
        log::warn!("MOVEMENT_TYPES=legacy: unrecognized movement types are applied as exits");
    }

    let addr = config.bind_address();
    let app = create_router(AppState::new(db, config));

    log::info!("Stockroom server starting on http://{}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
