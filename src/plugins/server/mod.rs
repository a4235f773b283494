mod extract;
mod handlers;
mod response;
mod view;

use std::net::SocketAddr;

use anyhow::Context;
use async_trait::async_trait;
use axum::{
  Router,
  routing::{get, post},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use crate::{prelude::*, state::AppState};

/// All routes, without the transport middleware added in [`Plugin::start`].
pub fn router(app: Arc<AppState>) -> Router {
  use handlers::*;

  Router::new()
    .route("/health", get(health))
    .route("/auth/login/", post(login))
    .route("/auth/me/", get(me))
    .route("/coupons/validate/", post(validate_coupon))
    .route(
      "/affiliate/profile/",
      get(affiliate_profile).patch(update_affiliate_profile),
    )
    .route("/referrals/register/", post(register_referral))
    .route("/promotions/", get(promotions).post(create_promotion))
    .route(
      "/promotions/{id}/",
      get(promotion).patch(update_promotion).delete(delete_promotion),
    )
    .route("/coupons/", get(coupons).post(create_coupon))
    .route(
      "/coupons/{id}/",
      get(coupon).patch(update_coupon).delete(delete_coupon),
    )
    .route("/coupons/{id}/redeem/", post(redeem_coupon))
    .route("/admin/affiliate-profiles/", get(affiliates))
    .route(
      "/admin/affiliate-profiles/{id}/",
      get(affiliate).patch(update_affiliate).delete(delete_affiliate),
    )
    .route("/admin/referrals/", get(referrals))
    .route(
      "/admin/referrals/{id}/",
      get(referral).patch(update_referral).delete(delete_referral),
    )
    .route("/admin/events/", get(events))
    .with_state(app)
}

pub struct Plugin;

#[async_trait]
impl super::Plugin for Plugin {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let governor_conf = Arc::new(
      GovernorConfigBuilder::default()
        .per_second(app.config.rate_per_second)
        .burst_size(app.config.rate_burst)
        .finish()
        .context("Failed to build rate limiter config")?,
    );

    let governor_limiter = governor_conf.limiter().clone();

    tokio::spawn(async move {
      loop {
        tokio::time::sleep(Duration::from_secs(60)).await;
        governor_limiter.retain_recent();
      }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], app.config.port));

    let service = router(app)
      .layer(
        ServiceBuilder::new()
          .layer(TraceLayer::new_for_http())
          .layer(GovernorLayer::new(governor_conf))
          .layer(
            CorsLayer::new()
              .allow_origin(Any)
              .allow_methods(Any)
              .allow_headers(Any),
          ),
      )
      .into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind(addr)
      .await
      .with_context(|| format!("Failed to bind {addr}"))?;

    info!("HTTP server listening on {addr}");

    tokio::spawn(async move {
      if let Err(err) = axum::serve(listener, service).await {
        error!("HTTP server stopped: {err}");
      }
    });

    Ok(())
  }
}
