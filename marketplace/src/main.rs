// marketplace/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use marketplace::config::{AppConfig, LogFormat, StorageBackend};
use marketplace::state::AppState;
use marketplace::store::{MemoryStore, PgStore, Stores};
use marketplace::web::configure_app_routes;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE); // Log when spans close, showing duration

  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}

async fn build_stores(config: &AppConfig) -> anyhow::Result<Stores> {
  match config.storage {
    StorageBackend::Memory => {
      tracing::warn!("Using the in-memory store. Data is lost on restart.");
      Ok(Stores::from_backend(Arc::new(MemoryStore::new())))
    }
    StorageBackend::Postgres => {
      let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required for the postgres backend")?;
      let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(url)
        .await
        .context("Failed to connect to the database")?;
      tracing::info!("Successfully connected to the database.");

      if config.run_migrations {
        sqlx::migrate!("./migrations")
          .run(&pool)
          .await
          .context("Failed to run database migrations")?;
        tracing::info!("Database migrations applied.");
      }
      Ok(Stores::from_backend(Arc::new(PgStore::new(pool))))
    }
  }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  // LOG_FORMAT has to be known before the subscriber exists.
  dotenvy::dotenv().ok();
  let log_format = match std::env::var("LOG_FORMAT").as_deref() {
    Ok("json") => LogFormat::Json,
    _ => LogFormat::Pretty,
  };
  init_tracing(log_format);
  tracing::info!("Starting marketplace server...");

  let config = AppConfig::from_env().map_err(|e| {
    tracing::error!(error = %e, "Failed to load application configuration.");
    anyhow::anyhow!("configuration error: {}", e)
  })?;

  let stores = build_stores(&config).await?;
  let server_address = format!("{}:{}", config.server_host, config.server_port);
  let app_state = AppState::new(config, stores);

  tracing::info!("Binding server to {}...", server_address);
  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind {}", server_address))?
  .run()
  .await?;

  Ok(())
}
