use std::{convert::Infallible, net::SocketAddr};

use axum::{
  extract::{ConnectInfo, FromRequestParts},
  http::{HeaderMap, header, request::Parts},
};

use crate::{
  entity::user, prelude::*, state::AppState, sv::event::RequestMeta,
};

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
  headers
    .get(name)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
}

fn request_meta(parts: &Parts) -> RequestMeta {
  let forwarded = header_str(&parts.headers, "x-forwarded-for")
    .and_then(|v| v.split(',').next())
    .map(|ip| ip.trim().to_string());
  let peer = parts
    .extensions
    .get::<ConnectInfo<SocketAddr>>()
    .map(|ConnectInfo(addr)| addr.ip().to_string());

  RequestMeta {
    ip_address: forwarded.or(peer),
    user_agent: header_str(&parts.headers, header::USER_AGENT.as_str())
      .map(String::from),
    session_id: header_str(&parts.headers, "x-session-id").map(String::from),
  }
}

pub fn bearer(headers: &HeaderMap) -> Result<&str> {
  let value = header_str(headers, header::AUTHORIZATION.as_str())
    .ok_or_else(|| Error::Unauthorized("Missing Authorization header".into()))?;

  value
    .strip_prefix("Bearer ")
    .map(str::trim)
    .filter(|token| !token.is_empty())
    .ok_or_else(|| {
      Error::Unauthorized("Invalid Authorization header format".into())
    })
}

/// Audit context of the current request.
pub struct Meta(pub RequestMeta);

impl<S: Send + Sync> FromRequestParts<S> for Meta {
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    _: &S,
  ) -> Result<Self, Self::Rejection> {
    Ok(Meta(request_meta(parts)))
  }
}

/// The authenticated local user.
pub struct Caller(pub user::Model);

impl FromRequestParts<Arc<AppState>> for Caller {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    app: &Arc<AppState>,
  ) -> Result<Self> {
    let claims = app.identity.verify(bearer(&parts.headers)?).await?;
    let meta = request_meta(parts);

    let user =
      app.sv().user.resolve(&claims, &app.config.admin_uids, &meta).await?;
    Ok(Caller(user))
  }
}

/// An authenticated user holding the admin role.
pub struct Admin(pub user::Model);

impl FromRequestParts<Arc<AppState>> for Admin {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    app: &Arc<AppState>,
  ) -> Result<Self> {
    let Caller(user) = Caller::from_request_parts(parts, app).await?;

    if !user.is_admin() {
      warn!("User {} denied admin access", user.id);
      return Err(Error::Forbidden);
    }
    Ok(Admin(user))
  }
}
