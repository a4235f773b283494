//! Identity-provider token verification.
//!
//! The provider is reached only through [`IdentityVerifier`], built once in
//! `main` by [`init`] and handed to request handlers through the app state.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{config::Config, prelude::*};

type HmacSha256 = Hmac<Sha256>;

/// Verified facts about the bearer of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub uid: String,
  pub email: String,
  /// Expiry as a unix timestamp (seconds).
  pub exp: i64,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
  async fn verify(&self, token: &str) -> Result<Claims>;

  async fn shutdown(&self) {}
}

/// Checks tokens of the form `base64url(claims json).hex(hmac-sha256)`,
/// signed by the identity gateway with a shared secret.
pub struct HmacVerifier {
  secret: Vec<u8>,
}

impl HmacVerifier {
  pub fn new(secret: impl AsRef<[u8]>) -> Self {
    Self { secret: secret.as_ref().to_vec() }
  }

  fn mac(&self) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(&self.secret)
      .map_err(|err| Error::Internal(format!("hmac key: {err}")))
  }

  /// Issues a token the way the identity gateway does.
  #[cfg(test)]
  pub fn sign(&self, claims: &Claims) -> Result<String> {
    let body = json::to_vec(claims)
      .map_err(|err| Error::Internal(format!("claims: {err}")))?;
    let payload = URL_SAFE_NO_PAD.encode(body);

    let mut mac = self.mac()?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(format!("{payload}.{signature}"))
  }
}

#[async_trait]
impl IdentityVerifier for HmacVerifier {
  async fn verify(&self, token: &str) -> Result<Claims> {
    let invalid = || Error::Unauthorized("Invalid identity token".into());

    let (payload, signature) = token.trim().split_once('.').ok_or_else(invalid)?;
    let signature = hex::decode(signature).map_err(|_| invalid())?;

    let mut mac = self.mac()?;
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature).map_err(|_| invalid())?;

    let body = URL_SAFE_NO_PAD.decode(payload).map_err(|_| invalid())?;
    let claims: Claims = json::from_slice(&body).map_err(|_| invalid())?;

    if claims.uid.is_empty() || claims.email.is_empty() {
      return Err(invalid());
    }
    if claims.exp <= Utc::now().timestamp() {
      return Err(Error::Unauthorized("Identity token expired".into()));
    }

    Ok(claims)
  }

  async fn shutdown(&self) {
    debug!("identity verifier released");
  }
}

/// Builds the process-wide verifier. Called once at start-up.
pub fn init(config: &Config) -> anyhow::Result<Arc<dyn IdentityVerifier>> {
  if config.identity_secret.len() < 16 {
    anyhow::bail!("IDENTITY_SECRET must be at least 16 bytes");
  }

  info!("Identity verifier initialised");
  Ok(Arc::new(HmacVerifier::new(&config.identity_secret)))
}
