pub mod affiliate;
pub mod coupon;
pub mod event;
pub mod promotion;
pub mod referral;
#[cfg(test)]
pub mod test_utils;
pub mod user;

pub use affiliate::Affiliate;
pub use coupon::Coupon;
pub use event::{Events, RequestMeta};
pub use promotion::Promotion;
pub use referral::Referral;
pub use user::User;
