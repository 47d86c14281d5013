//! Praxis admin server binary.
//!
//! ## Purpose
//! Resolves configuration from the environment, loads the prescription
//! records, and serves the REST API built in `api-rest`.
//!
//! # Environment Variables
//! - `PRAXIS_REST_ADDR`: server address (default: "0.0.0.0:3000")
//! - `PRAXIS_DATA_FILE`: JSON prescription dataset (default: built-in demo data)
//! - `PRAXIS_PRACTICE_NAME`: letterhead practice name

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use praxis_core::{
    dataset_path_from_env_value, practice_name_from_env_value, CoreConfig, PracticeService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("praxis_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("PRAXIS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("-- Starting praxis REST API on {}", addr);

    let dataset_path = dataset_path_from_env_value(std::env::var("PRAXIS_DATA_FILE").ok());
    if let Some(path) = dataset_path.as_deref() {
        if !path.is_file() {
            anyhow::bail!(
                "Prescription dataset file does not exist: {}",
                path.display()
            );
        }
    }

    let cfg = Arc::new(CoreConfig::new(
        dataset_path,
        practice_name_from_env_value(std::env::var("PRAXIS_PRACTICE_NAME").ok()),
    )?);

    let service = Arc::new(PracticeService::new(cfg)?);
    let app = api_rest::router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
