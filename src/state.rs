use sea_orm::ConnectOptions;

use crate::{config::Config, identity::IdentityVerifier, prelude::*, sv};

pub struct Services<'a> {
  pub user: sv::User<'a>,
  pub coupon: sv::Coupon<'a>,
  pub promotion: sv::Promotion<'a>,
  pub affiliate: sv::Affiliate<'a>,
  pub referral: sv::Referral<'a>,
  pub events: sv::Events<'a>,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub config: Config,
  pub identity: Arc<dyn IdentityVerifier>,
}

impl AppState {
  pub async fn new(
    config: Config,
    identity: Arc<dyn IdentityVerifier>,
  ) -> anyhow::Result<Self> {
    let mut opts = ConnectOptions::new(&config.database_url);
    opts.sqlx_logging(false);

    let db = Database::connect(opts).await?;
    migration::Migrator::up(&db, None).await?;

    info!("Database ready at {}", config.database_url);
    Ok(Self::from_parts(db, config, identity))
  }

  pub fn from_parts(
    db: DatabaseConnection,
    config: Config,
    identity: Arc<dyn IdentityVerifier>,
  ) -> Self {
    Self { db, config, identity }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      user: sv::User::new(&self.db),
      coupon: sv::Coupon::new(&self.db),
      promotion: sv::Promotion::new(&self.db),
      affiliate: sv::Affiliate::new(&self.db),
      referral: sv::Referral::new(&self.db),
      events: sv::Events::new(&self.db),
    }
  }
}
