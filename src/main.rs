mod config;
mod entity;
mod error;
mod identity;
mod plugins;
mod prelude;
mod state;
mod sv;
mod utils;

use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{
  config::Config,
  plugins::{App, server},
  prelude::*,
  state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "rewards=debug,tower_http=debug,axum=trace,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  info!("Starting rewards v{}", env!("CARGO_PKG_VERSION"));

  let config = Config::from_env()?;
  if config.admin_uids.is_empty() {
    warn!("ADMIN_UIDS is empty, admin endpoints are unreachable");
  }

  let identity = identity::init(&config)?;
  let app = Arc::new(AppState::new(config, identity.clone()).await?);

  App::new().register(server::Plugin).run(app).await?;

  tokio::signal::ctrl_c().await?;
  info!("Shutting down");

  identity.shutdown().await;
  Ok(())
}
