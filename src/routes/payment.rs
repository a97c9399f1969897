use rocket::http::Status;
use rocket::request::{self, FromRequest, Outcome, Request};
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, DateTime};

use crate::config::Config;
use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::models::{CreateOrderDto, PaymentOrder, PaymentStatus, VerifyPaymentDto};
use crate::services::razorpay::{verify_payment_signature, verify_webhook_signature};
use crate::services::RazorpayService;
use crate::utils::{ApiError, ApiResponse};

/// Midnight UTC of a `YYYY-MM-DD` travel date.
fn parse_selected_date(raw: &str) -> Option<DateTime> {
    let date = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(DateTime::from_millis(midnight.and_utc().timestamp_millis()))
}

/// --------------------
/// Create order
/// --------------------
#[openapi(tag = "Payments")]
#[post("/payments/create-order", data = "<dto>")]
pub async fn create_order(
    db: &State<DbConn>,
    dto: Json<CreateOrderDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if !Config::is_razorpay_enabled() {
        return Err(ApiError::internal_error("Payment gateway is not configured"));
    }

    if dto.amount <= 0 {
        return Err(ApiError::bad_request("Amount must be positive"));
    }

    let selected_date = match dto.selected_date.as_deref() {
        Some(raw) => Some(
            parse_selected_date(raw)
                .ok_or_else(|| ApiError::bad_request("Invalid selectedDate. Use YYYY-MM-DD"))?,
        ),
        None => None,
    };

    let receipt = format!("receipt_{}", chrono::Utc::now().timestamp_millis());

    let order = RazorpayService::create_order(
        dto.amount,
        &receipt,
        serde_json::json!({
            "visaId": dto.visa_id,
            "country": dto.country,
            "email": dto.email,
            "phone": dto.phone,
            "selectedDate": dto.selected_date,
            "travellers": dto.travellers,
        }),
    )
    .await
    .map_err(|e| {
        error!("Razorpay order error: {}", e);
        ApiError::internal_error("Order creation failed")
    })?;

    let order_id = order["id"]
        .as_str()
        .ok_or_else(|| ApiError::internal_error("Order creation failed"))?
        .to_string();

    let payment_order = PaymentOrder {
        id: None,
        order_id,
        payment_id: None,
        amount: order["amount"].as_i64().unwrap_or(dto.amount),
        currency: order["currency"].as_str().unwrap_or("INR").to_string(),
        status: PaymentStatus::Created,
        receipt: Some(receipt),
        signature: None,
        visa_id: dto.visa_id.clone(),
        country: dto.country.clone(),
        email: dto.email.clone(),
        phone: dto.phone.clone(),
        selected_date,
        travellers: dto.travellers,
        webhook_verified: false,
        created_at: DateTime::now(),
        paid_at: None,
    };

    db.collection::<PaymentOrder>("payment_orders")
        .insert_one(&payment_order, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to save order: {}", e)))?;

    Ok(Json(ApiResponse::success(order)))
}

/// --------------------
/// Verify checkout signature
/// --------------------
#[openapi(tag = "Payments")]
#[post("/payments/verify-payment", data = "<dto>")]
pub async fn verify_payment(
    db: &State<DbConn>,
    dto: Json<VerifyPaymentDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let secret = Config::razorpay_key_secret()
        .ok_or_else(|| ApiError::internal_error("Missing Razorpay secret"))?;

    if !verify_payment_signature(
        &secret,
        &dto.razorpay_order_id,
        &dto.razorpay_payment_id,
        &dto.razorpay_signature,
    ) {
        return Err(ApiError::bad_request("Payment verification failed"));
    }

    db.collection::<PaymentOrder>("payment_orders")
        .update_one(
            doc! { "orderId": &dto.razorpay_order_id },
            doc! {
                "$set": {
                    "status": "paid",
                    "paymentId": &dto.razorpay_payment_id,
                    "signature": &dto.razorpay_signature,
                    "paidAt": DateTime::now(),
                }
            },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update order: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Payment verified successfully"
    }))))
}

/// Raw `X-Razorpay-Signature` header; the webhook HMAC covers the exact
/// request body, so the handler takes the body as an unparsed string.
pub struct WebhookSignature(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for WebhookSignature {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match req.headers().get_one("X-Razorpay-Signature") {
            Some(sig) if !sig.is_empty() => Outcome::Success(WebhookSignature(sig.to_string())),
            _ => Outcome::Error((Status::BadRequest, ())),
        }
    }
}

/// --------------------
/// Server-to-server capture confirmation
/// --------------------
#[post("/payments/webhook", data = "<body>")]
pub async fn webhook(
    db: &State<DbConn>,
    signature: WebhookSignature,
    body: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let secret = Config::razorpay_webhook_secret()
        .ok_or_else(|| ApiError::internal_error("Missing Razorpay webhook secret"))?;

    if !verify_webhook_signature(&secret, body.as_bytes(), &signature.0) {
        return Err(ApiError::bad_request("Invalid signature"));
    }

    let payload: serde_json::Value = serde_json::from_str(&body)
        .map_err(|_| ApiError::bad_request("Invalid webhook body"))?;

    if payload["event"].as_str() == Some("payment.captured") {
        let order_id = payload["payload"]["payment"]["entity"]["order_id"]
            .as_str()
            .ok_or_else(|| ApiError::bad_request("Invalid webhook body"))?;

        // Replays reapply the same values, which is harmless.
        db.collection::<PaymentOrder>("payment_orders")
            .update_one(
                doc! { "orderId": order_id },
                doc! {
                    "$set": {
                        "status": "captured",
                        "webhookVerified": true,
                    }
                },
                None,
            )
            .await
            .map_err(|e| ApiError::internal_error(format!("Webhook processing failed: {}", e)))?;
    }

    Ok(Json(ApiResponse::success(serde_json::json!({ "status": "ok" }))))
}

/// --------------------
/// Orders for a phone
/// --------------------
#[openapi(tag = "Payments")]
#[get("/payments/by-phone/<phone>")]
pub async fn payments_by_phone(
    db: &State<DbConn>,
    _auth: AuthGuard,
    phone: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let mut cursor = db
        .collection::<PaymentOrder>("payment_orders")
        .find(doc! { "phone": &phone }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut orders = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let order = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        orders.push(order);
    }

    if orders.is_empty() {
        return Err(ApiError::not_found("No payments found for this phone number"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!(orders))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selected_date_parses_to_midnight_utc() {
        let parsed = parse_selected_date("2025-03-01").unwrap();
        let expected = chrono::NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis();
        assert_eq!(parsed.timestamp_millis(), expected);
    }

    #[test]
    fn malformed_selected_date_is_rejected() {
        assert!(parse_selected_date("01/03/2025").is_none());
        assert!(parse_selected_date("2025-13-40").is_none());
        assert!(parse_selected_date("soon").is_none());
    }
}
