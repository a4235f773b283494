use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::prelude::*;

#[derive(Serialize)]
struct ErrorBody {
  error: String,
  code: &'static str,
}

impl Error {
  fn status(&self) -> (StatusCode, &'static str) {
    match self {
      Error::Referral(rejection) => (StatusCode::BAD_REQUEST, rejection.code()),
      Error::InvalidArgs(_) => (StatusCode::BAD_REQUEST, "invalid_arguments"),
      Error::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
      Error::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
      Error::UserNotFound
      | Error::PromotionNotFound
      | Error::CouponNotFound
      | Error::AffiliateNotFound
      | Error::ReferralNotFound => (StatusCode::NOT_FOUND, "not_found"),
      Error::UsageLimitExceeded => (StatusCode::CONFLICT, "usage_limit_exceeded"),
      Error::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
      Error::Db(_) | Error::Internal(_) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
      }
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let (status, code) = self.status();

    if status.is_server_error() {
      error!("Request failed: {self}");
    }

    let body = ErrorBody { error: self.user_message(), code };
    (status, Json(body)).into_response()
  }
}
