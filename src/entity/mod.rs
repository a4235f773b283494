pub mod affiliate_profile;
pub mod coupon_code;
pub mod coupon_redemption;
pub mod promotion;
pub mod referral;
pub mod tracked_event;
pub mod user;

pub use promotion::DiscountKind;
pub use referral::ReferralStatus;
pub use tracked_event::EventType;
pub use user::UserRole;
