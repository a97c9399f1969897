pub mod admin;
pub mod employee;
pub mod payment;
pub mod promo_code;
pub mod user;
pub mod visa_application;
pub mod visa_config;
