// tests/common/db.rs

//! One PostgreSQL container per test binary, one freshly migrated database per test.

use once_cell::sync::Lazy;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgConnection, PgPool};
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

struct SharedServer {
  _container: ContainerAsync<Postgres>,
  base_url: String,
}

static SERVER: Lazy<OnceCell<SharedServer>> = Lazy::new(OnceCell::new);

async fn start_server() -> SharedServer {
  let container = Postgres::default()
    .with_user("marketplace_test")
    .with_password("marketplace_test")
    .with_db_name("marketplace_test")
    .start()
    .await
    .expect("Failed to start PostgreSQL container");
  let port = container
    .get_host_port_ipv4(5432)
    .await
    .expect("Failed to get container port");
  let host = std::env::var("TESTCONTAINERS_HOST_OVERRIDE").unwrap_or_else(|_| "localhost".to_string());

  SharedServer {
    _container: container,
    base_url: format!("postgresql://marketplace_test:marketplace_test@{}:{}", host, port),
  }
}

/// Pool on a new database with `migrations/` applied.
pub async fn fresh_pool() -> PgPool {
  let server = SERVER.get_or_init(start_server).await;
  let name = format!("marketplace_{}", Uuid::new_v4().simple());

  let mut admin = PgConnection::connect(&format!("{}/postgres", server.base_url))
    .await
    .expect("Failed to connect to the admin database");
  sqlx::query(&format!("CREATE DATABASE \"{}\"", name))
    .execute(&mut admin)
    .await
    .expect("Failed to create test database");
  admin.close().await.ok();

  let pool = PgPoolOptions::new()
    .max_connections(4)
    .connect(&format!("{}/{}", server.base_url, name))
    .await
    .expect("Failed to connect to test database");
  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");
  pool
}
