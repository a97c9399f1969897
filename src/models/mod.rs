pub mod user;
pub mod visa_application;
pub mod payment;
pub mod promo_code;
pub mod employee;
pub mod admin;
pub mod visa_config;

pub use user::*;
pub use visa_application::*;
pub use payment::*;
pub use promo_code::*;
pub use employee::*;
pub use admin::*;
pub use visa_config::*;
