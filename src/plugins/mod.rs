pub mod server;

use anyhow::Context;

use crate::{prelude::*, state::AppState};

/// A long-running part of the service started against the shared state.
#[async_trait::async_trait]
pub trait Plugin: Send + Sync {
  fn name(&self) -> &'static str {
    std::any::type_name::<Self>()
  }

  /// Sets the plugin up and spawns its tasks; must not block.
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct App {
  plugins: Vec<Box<dyn Plugin>>,
}

impl App {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register<P: Plugin + 'static>(mut self, plugin: P) -> Self {
    self.plugins.push(Box::new(plugin));
    self
  }

  /// Starts the plugins in registration order, stopping at the first one
  /// that fails.
  pub async fn run(self, app: Arc<AppState>) -> anyhow::Result<()> {
    for plugin in self.plugins {
      let name = plugin.name();
      info!("init `{name}`");

      plugin
        .start(app.clone())
        .await
        .with_context(|| format!("failed to start `{name}`"))?;
    }
    Ok(())
  }
}
