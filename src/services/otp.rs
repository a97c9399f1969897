use std::collections::HashMap;
use std::sync::Mutex;

/// How long an issued code stays verifiable.
const OTP_TTL_MS: i64 = 5 * 60 * 1000;

#[derive(Debug, Clone)]
struct OtpEntry {
    otp: String,
    expires_at: i64,
}

#[derive(Debug, PartialEq)]
pub enum OtpError {
    /// No code on record for this phone (never issued, or already consumed).
    NotFound,
    /// Past the 5-minute window; the record is cleared.
    Expired,
    /// Wrong code; the record is kept so the caller may retry.
    Mismatch,
}

impl OtpError {
    pub fn message(&self) -> &'static str {
        match self {
            OtpError::NotFound => "OTP not found. Please request a new one.",
            OtpError::Expired => "OTP has expired. Please request a new one.",
            OtpError::Mismatch => "Invalid OTP",
        }
    }
}

/// In-process OTP store with per-entry expiry, managed as Rocket state and
/// injected into handlers. State does not survive a restart and is not
/// shared across instances; suitable for a single-instance deployment only.
#[derive(Default)]
pub struct OtpStore {
    entries: Mutex<HashMap<String, OtpEntry>>,
}

impl OtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a code for a phone number, replacing any earlier one.
    pub fn put(&self, phone: &str, otp: &str) {
        self.put_at(phone, otp, chrono::Utc::now().timestamp_millis())
    }

    fn put_at(&self, phone: &str, otp: &str, now_ms: i64) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            phone.to_string(),
            OtpEntry {
                otp: otp.to_string(),
                expires_at: now_ms + OTP_TTL_MS,
            },
        );
    }

    /// Check and consume. Success removes the entry, so a code verifies
    /// exactly once; expiry also removes it; a mismatch leaves it in place.
    pub fn verify(&self, phone: &str, otp: &str) -> Result<(), OtpError> {
        self.verify_at(phone, otp, chrono::Utc::now().timestamp_millis())
    }

    fn verify_at(&self, phone: &str, otp: &str, now_ms: i64) -> Result<(), OtpError> {
        let mut entries = self.entries.lock().unwrap();

        let entry = entries.get(phone).cloned().ok_or(OtpError::NotFound)?;

        if now_ms > entry.expires_at {
            entries.remove(phone);
            return Err(OtpError::Expired);
        }

        if entry.otp != otp {
            return Err(OtpError::Mismatch);
        }

        entries.remove(phone);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_verifies_exactly_once() {
        let store = OtpStore::new();
        store.put_at("9999999999", "123456", 0);

        assert!(store.verify_at("9999999999", "123456", 1_000).is_ok());
        assert_eq!(
            store.verify_at("9999999999", "123456", 2_000),
            Err(OtpError::NotFound)
        );
    }

    #[test]
    fn unknown_phone_is_not_found() {
        let store = OtpStore::new();
        assert_eq!(store.verify("8888888888", "000000"), Err(OtpError::NotFound));
    }

    #[test]
    fn expired_code_is_cleared() {
        let store = OtpStore::new();
        store.put_at("9999999999", "123456", 0);

        assert_eq!(
            store.verify_at("9999999999", "123456", OTP_TTL_MS + 1),
            Err(OtpError::Expired)
        );
        // Record is gone after the expiry path.
        assert_eq!(
            store.verify_at("9999999999", "123456", OTP_TTL_MS + 2),
            Err(OtpError::NotFound)
        );
    }

    #[test]
    fn mismatch_keeps_the_record_for_retry() {
        let store = OtpStore::new();
        store.put_at("9999999999", "123456", 0);

        assert_eq!(
            store.verify_at("9999999999", "654321", 1_000),
            Err(OtpError::Mismatch)
        );
        assert!(store.verify_at("9999999999", "123456", 2_000).is_ok());
    }

    #[test]
    fn reissue_replaces_the_previous_code() {
        let store = OtpStore::new();
        store.put_at("9999999999", "111111", 0);
        store.put_at("9999999999", "222222", 1_000);

        assert_eq!(
            store.verify_at("9999999999", "111111", 2_000),
            Err(OtpError::Mismatch)
        );
        assert!(store.verify_at("9999999999", "222222", 3_000).is_ok());
    }
}
