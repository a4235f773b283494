use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use json::{Value, json};
use serde::Deserialize;

use super::{
  extract::{Admin, Caller, Meta},
  view::{
    AffiliateView, PromotionView, ReferralView, UserView, ValidationView, many,
  },
};
use crate::{
  entity::{
    EventType, ReferralStatus, coupon_code, coupon_redemption, tracked_event,
  },
  prelude::*,
  state::AppState,
  sv::{
    affiliate::{AdminProfilePatch, ProfilePatch},
    promotion::{
      CouponPatch, NewCoupon, NewPromotion, PromotionPatch, normalize_code,
    },
    referral::ReferralPatch,
  },
};

type App = State<Arc<AppState>>;

pub const EVENTS_DEFAULT_LIMIT: u64 = 100;
pub const EVENTS_MAX_LIMIT: u64 = 1000;

pub async fn health() -> Json<Value> {
  Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
pub struct LoginReq {
  pub id_token: String,
}

pub async fn login(
  State(app): App,
  Meta(meta): Meta,
  Json(req): Json<LoginReq>,
) -> Result<Json<UserView>> {
  let claims = app.identity.verify(&req.id_token).await?;
  let sv = app.sv();

  let user = sv.user.resolve(&claims, &app.config.admin_uids, &meta).await?;
  sv.events
    .record(
      EventType::UserLogin,
      Some(user.id),
      &meta,
      json!({ "uid": user.uid }),
    )
    .await;

  Ok(Json(user.into()))
}

pub async fn me(Caller(user): Caller) -> Json<UserView> {
  Json(user.into())
}

#[derive(Deserialize)]
pub struct ValidateReq {
  pub code: String,
}

pub async fn validate_coupon(
  State(app): App,
  Caller(user): Caller,
  Meta(meta): Meta,
  Json(req): Json<ValidateReq>,
) -> Result<Json<ValidationView>> {
  normalize_code(&req.code)?;

  let validation = app.sv().coupon.validate(&req.code, user.id, &meta).await?;
  Ok(Json(validation.into()))
}

pub async fn affiliate_profile(
  State(app): App,
  Caller(user): Caller,
  Meta(meta): Meta,
) -> Result<(StatusCode, Json<AffiliateView>)> {
  let (profile, created) = app.sv().affiliate.profile(user.id, &meta).await?;
  let status = if created { StatusCode::CREATED } else { StatusCode::OK };
  Ok((status, Json(profile.into())))
}

pub async fn update_affiliate_profile(
  State(app): App,
  Caller(user): Caller,
  Meta(meta): Meta,
  Json(patch): Json<ProfilePatch>,
) -> Result<Json<AffiliateView>> {
  let profile = app.sv().affiliate.update_own(user.id, patch, &meta).await?;
  Ok(Json(profile.into()))
}

#[derive(Deserialize)]
pub struct RegisterReq {
  pub referral_code: String,
}

pub async fn register_referral(
  State(app): App,
  Caller(user): Caller,
  Meta(meta): Meta,
  Json(req): Json<RegisterReq>,
) -> Result<(StatusCode, Json<ReferralView>)> {
  let commission = app.config.signup_commission;
  let referral = app
    .sv()
    .referral
    .register(user.id, &req.referral_code, commission, &meta)
    .await?;

  Ok((StatusCode::CREATED, Json(referral.into())))
}

pub async fn promotions(
  State(app): App,
  _: Admin,
) -> Result<Json<Vec<PromotionView>>> {
  Ok(Json(many(app.sv().promotion.all().await?)))
}

pub async fn create_promotion(
  State(app): App,
  _: Admin,
  Json(new): Json<NewPromotion>,
) -> Result<(StatusCode, Json<PromotionView>)> {
  let promotion = app.sv().promotion.create(new).await?;
  Ok((StatusCode::CREATED, Json(promotion.into())))
}

pub async fn promotion(
  State(app): App,
  _: Admin,
  Path(id): Path<i32>,
) -> Result<Json<PromotionView>> {
  Ok(Json(app.sv().promotion.by_id(id).await?.into()))
}

pub async fn update_promotion(
  State(app): App,
  _: Admin,
  Path(id): Path<i32>,
  Json(patch): Json<PromotionPatch>,
) -> Result<Json<PromotionView>> {
  Ok(Json(app.sv().promotion.update(id, patch).await?.into()))
}

pub async fn delete_promotion(
  State(app): App,
  _: Admin,
  Path(id): Path<i32>,
) -> Result<StatusCode> {
  app.sv().promotion.delete(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct CouponFilter {
  pub promotion_id: Option<i32>,
}

pub async fn coupons(
  State(app): App,
  _: Admin,
  Query(filter): Query<CouponFilter>,
) -> Result<Json<Vec<coupon_code::Model>>> {
  Ok(Json(app.sv().promotion.coupons(filter.promotion_id).await?))
}

pub async fn create_coupon(
  State(app): App,
  _: Admin,
  Json(new): Json<NewCoupon>,
) -> Result<(StatusCode, Json<coupon_code::Model>)> {
  let coupon = app.sv().promotion.create_coupon(new).await?;
  Ok((StatusCode::CREATED, Json(coupon)))
}

pub async fn coupon(
  State(app): App,
  _: Admin,
  Path(id): Path<i32>,
) -> Result<Json<coupon_code::Model>> {
  Ok(Json(app.sv().promotion.coupon(id).await?))
}

pub async fn update_coupon(
  State(app): App,
  _: Admin,
  Path(id): Path<i32>,
  Json(patch): Json<CouponPatch>,
) -> Result<Json<coupon_code::Model>> {
  Ok(Json(app.sv().promotion.update_coupon(id, patch).await?))
}

pub async fn delete_coupon(
  State(app): App,
  _: Admin,
  Path(id): Path<i32>,
) -> Result<StatusCode> {
  app.sv().promotion.delete_coupon(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct RedeemReq {
  pub user_id: i32,
}

/// Checkout hook: consumes one use of the coupon on behalf of a user.
pub async fn redeem_coupon(
  State(app): App,
  _: Admin,
  Meta(meta): Meta,
  Path(id): Path<i32>,
  Json(req): Json<RedeemReq>,
) -> Result<(StatusCode, Json<coupon_redemption::Model>)> {
  let sv = app.sv();
  let user = sv.user.by_id(req.user_id).await?;

  let redemption = sv.coupon.redeem(id, user.id, &meta).await?;
  Ok((StatusCode::CREATED, Json(redemption)))
}

pub async fn affiliates(
  State(app): App,
  _: Admin,
) -> Result<Json<Vec<AffiliateView>>> {
  Ok(Json(many(app.sv().affiliate.all().await?)))
}

pub async fn affiliate(
  State(app): App,
  _: Admin,
  Path(id): Path<i32>,
) -> Result<Json<AffiliateView>> {
  Ok(Json(app.sv().affiliate.by_id(id).await?.into()))
}

pub async fn update_affiliate(
  State(app): App,
  _: Admin,
  Path(id): Path<i32>,
  Json(patch): Json<AdminProfilePatch>,
) -> Result<Json<AffiliateView>> {
  Ok(Json(app.sv().affiliate.update(id, patch).await?.into()))
}

pub async fn delete_affiliate(
  State(app): App,
  _: Admin,
  Path(id): Path<i32>,
) -> Result<StatusCode> {
  app.sv().affiliate.delete(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ReferralFilter {
  pub status: Option<ReferralStatus>,
  pub code: Option<String>,
}

pub async fn referrals(
  State(app): App,
  _: Admin,
  Query(filter): Query<ReferralFilter>,
) -> Result<Json<Vec<ReferralView>>> {
  let referrals =
    app.sv().referral.all(filter.status, filter.code.as_deref()).await?;
  Ok(Json(many(referrals)))
}

pub async fn referral(
  State(app): App,
  _: Admin,
  Path(id): Path<i32>,
) -> Result<Json<ReferralView>> {
  Ok(Json(app.sv().referral.by_id(id).await?.into()))
}

pub async fn update_referral(
  State(app): App,
  _: Admin,
  Path(id): Path<i32>,
  Json(patch): Json<ReferralPatch>,
) -> Result<Json<ReferralView>> {
  Ok(Json(app.sv().referral.update(id, patch).await?.into()))
}

pub async fn delete_referral(
  State(app): App,
  _: Admin,
  Path(id): Path<i32>,
) -> Result<StatusCode> {
  app.sv().referral.delete(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct EventFilter {
  pub event_type: Option<EventType>,
  pub user_id: Option<i32>,
  pub limit: Option<u64>,
}

pub async fn events(
  State(app): App,
  _: Admin,
  Query(filter): Query<EventFilter>,
) -> Result<Json<Vec<tracked_event::Model>>> {
  let limit =
    filter.limit.unwrap_or(EVENTS_DEFAULT_LIMIT).clamp(1, EVENTS_MAX_LIMIT);
  let events =
    app.sv().events.list(filter.event_type, filter.user_id, limit).await?;
  Ok(Json(events))
}
