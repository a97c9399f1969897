pub mod jwt;
pub mod otp;
pub mod razorpay;
pub mod sms;
pub mod storage;

pub use jwt::JwtService;
pub use otp::{OtpError, OtpStore};
pub use razorpay::RazorpayService;
pub use sms::SmsService;
