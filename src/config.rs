use std::env;

use crate::{prelude::*, utils};

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub port: u16,
  /// Shared secret used to check identity tokens.
  pub identity_secret: String,
  /// Identity-provider uids that are granted the admin role.
  pub admin_uids: HashSet<String>,
  /// Flat commission credited to an affiliate per referred signup, in cents.
  pub signup_commission: i64,
  pub rate_per_second: u64,
  pub rate_burst: u32,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: "sqlite:rewards.db?mode=rwc".into(),
      port: 3000,
      identity_secret: String::new(),
      admin_uids: HashSet::new(),
      signup_commission: utils::CENTS,
      rate_per_second: 2,
      rate_burst: 100,
    }
  }
}

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    let defaults = Self::default();

    let identity_secret = env::var("IDENTITY_SECRET")
      .map_err(|_| anyhow::anyhow!("IDENTITY_SECRET not set"))?;

    let admin_uids = env::var("ADMIN_UIDS")
      .unwrap_or_default()
      .split(',')
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(String::from)
      .collect();

    let signup_commission = match env::var("AFFILIATE_SIGNUP_COMMISSION") {
      Ok(raw) => {
        let value: Decimal = raw.trim().parse().map_err(|err| {
          anyhow::anyhow!("Invalid AFFILIATE_SIGNUP_COMMISSION `{raw}`: {err}")
        })?;
        utils::to_cents(value)?
      }
      Err(_) => defaults.signup_commission,
    };

    Ok(Self {
      database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
      port: parse_or("PORT", defaults.port),
      identity_secret,
      admin_uids,
      signup_commission,
      rate_per_second: parse_or("RATE_LIMIT_PER_SECOND", defaults.rate_per_second),
      rate_burst: parse_or("RATE_LIMIT_BURST", defaults.rate_burst),
    })
  }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
  env::var(key).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
