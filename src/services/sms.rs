use reqwest::Client;

use crate::config::Config;

const SMS_BASE: &str = "http://msg.msgclub.net/rest/services/sendSMS/sendGroupSms";

pub struct SmsService;

impl SmsService {
    fn client() -> Client {
        Client::new()
    }

    fn auth_key() -> Result<String, String> {
        Config::sms_auth_key()
            .ok_or_else(|| "SMS_AUTH_KEY not configured".to_string())
    }

    fn sender_id() -> Result<String, String> {
        Config::sms_sender_id()
            .ok_or_else(|| "SMS_SENDER_ID not configured".to_string())
    }

    /// Deliver an OTP text to an Indian mobile number. Without gateway
    /// credentials the development profile logs the code instead of
    /// sending, so the login flow stays usable locally.
    pub async fn send_otp(phone: &str, otp: &str) -> Result<(), String> {
        if !Config::is_sms_enabled() {
            if Config::is_development() {
                info!("SMS gateway disabled, OTP for {}: {}", phone, otp);
                return Ok(());
            }
            return Err("SMS gateway is not enabled".to_string());
        }

        let message = format!("Your OTP is {}. Please do not share it with anyone.", otp);

        let res = Self::client()
            .get(SMS_BASE)
            .query(&[
                ("AUTH_KEY", Self::auth_key()?.as_str()),
                ("message", message.as_str()),
                ("senderId", Self::sender_id()?.as_str()),
                ("routeId", "1"),
                ("mobileNos", &format!("91{}", phone)),
                ("smsContentType", "english"),
            ])
            .send()
            .await
            .map_err(|e| format!("SMS request failed: {}", e))?;

        if !res.status().is_success() {
            return Err(res.text().await.unwrap_or_else(|_| "SMS gateway error".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The test environment has no gateway credentials and runs under the
    // default development profile.
    #[rocket::async_test]
    async fn development_profile_delivers_without_a_gateway() {
        assert!(SmsService::send_otp("9999999999", "123456").await.is_ok());
    }
}
