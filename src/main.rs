#[macro_use]
extern crate rocket;
#[macro_use]
extern crate log;

mod config;
mod db;
mod guards;
mod models;
mod routes;
mod services;
mod utils;

use dotenvy::dotenv;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::fs::FileServer;
use rocket::http::Header;
use rocket::{Build, Request, Response, Rocket};
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};

use services::OtpStore;

/* ----------------------------- CORS ----------------------------- */

pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        if let Some(origin) = request.headers().get_one("Origin") {
            response.set_header(Header::new("Access-Control-Allow-Origin", origin));
        }

        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, PATCH, DELETE, OPTIONS",
        ));

        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization, x-access-token, X-Razorpay-Signature",
        ));

        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

/* ----------------------------- OPTIONS ----------------------------- */

#[options("/<_..>")]
fn options_handler() {}

/* ----------------------------- ERRORS ----------------------------- */

#[catch(404)]
fn not_found() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Resource not found (check /api prefix)"
    })
}

#[catch(500)]
fn internal_error() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Internal server error"
    })
}

/* ----------------------------- SWAGGER ----------------------------- */

fn swagger_config() -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: "/openapi.json".to_string(),
        ..Default::default()
    }
}

/* ----------------------------- LAUNCH ----------------------------- */

#[launch]
fn rocket() -> Rocket<Build> {
    dotenv().ok();
    env_logger::init();

    println!("🛂 Visa API running");
    println!("📚 Swagger UI → http://localhost:8000/api/docs");

    rocket::build()
        .attach(db::init())
        .attach(CORS)
        .manage(OtpStore::new())
        .mount("/", routes![options_handler])
        .mount(
            "/api",
            routes![
                // User auth (OTP)
                routes::user::send_otp,
                routes::user::verify_otp,
                routes::user::login,
                routes::user::logout,
                // Visa applications
                routes::visa_application::apply_visa,
                routes::visa_application::get_all,
                routes::visa_application::update_status,
                routes::visa_application::get_by_id,
                routes::visa_application::get_by_phone_query,
                routes::visa_application::status_by_payment_id,
                routes::visa_application::exists_by_payment_id,
                routes::visa_application::rejected_by_phone,
                routes::visa_application::approved_by_phone,
                routes::visa_application::by_phone,
                routes::visa_application::status_history,
                routes::visa_application::stats,
                // Payments
                routes::payment::create_order,
                routes::payment::verify_payment,
                routes::payment::webhook,
                routes::payment::payments_by_phone,
                // Promo codes
                routes::promo_code::create_promo_code,
                routes::promo_code::get_all_promo_codes,
                routes::promo_code::get_promo_code_by_id,
                routes::promo_code::update_promo_code,
                routes::promo_code::delete_promo_code,
                routes::promo_code::validate_promo_code,
                routes::promo_code::redeem_promo_code,
                // Employees
                routes::employee::signup,
                routes::employee::login,
                routes::employee::logout,
                routes::employee::get_all_employees,
                routes::employee::verify_employee,
                routes::employee::add_visa_id,
                routes::employee::get_employee_visas,
                // Admins
                routes::admin::signup,
                routes::admin::login,
                routes::admin::logout,
                routes::admin::refresh_access_token,
                // Visa configurations
                routes::visa_config::add_config,
                routes::visa_config::visa_summaries,
                routes::visa_config::get_all_configs,
                routes::visa_config::get_images,
                routes::visa_config::get_by_id,
                routes::visa_config::get_essential_details,
                routes::visa_config::get_rejection_reasons,
                routes::visa_config::get_documents,
                routes::visa_config::update_config,
                routes::visa_config::delete_config,
            ],
        )
        .mount("/uploads", FileServer::from("uploads"))
        .mount("/api/docs", make_swagger_ui(&swagger_config()))
        .register("/", catchers![not_found, internal_error])
}
