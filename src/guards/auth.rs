use rocket::request::{self, FromRequest, Request, Outcome};
use rocket::http::Status;
use mongodb::bson::oid::ObjectId;

use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use rocket_okapi::r#gen::OpenApiGenerator;

/// Bearer-token guard shared by user, employee and admin routes: all three
/// principal kinds sign with the same access secret and carry their
/// document id as the subject.
pub struct AuthGuard {
    pub principal_id: ObjectId,
}

/// Clients send the token wherever is convenient: `Authorization` header,
/// `x-access-token` header, `token` query parameter or `token` cookie.
/// First non-empty source wins.
fn extract_token<'r>(req: &'r Request<'_>) -> Option<String> {
    if let Some(header) = req.headers().get_one("Authorization") {
        let token = header.trim_start_matches("Bearer ").trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }
    if let Some(header) = req.headers().get_one("x-access-token") {
        if !header.is_empty() {
            return Some(header.to_string());
        }
    }
    if let Some(Ok(token)) = req.query_value::<&str>("token") {
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }
    if let Some(cookie) = req.cookies().get("token") {
        let token = cookie.value();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }
    None
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let token = match extract_token(req) {
            Some(token) => token,
            None => return Outcome::Error((Status::Unauthorized, ())),
        };

        match crate::services::JwtService::verify_token(&token, false) {
            Ok(claims) => match ObjectId::parse_str(&claims.sub) {
                Ok(principal_id) => Outcome::Success(AuthGuard { principal_id }),
                Err(_) => Outcome::Error((Status::Forbidden, ())),
            },
            Err(_) => Outcome::Error((Status::Forbidden, ())),
        }
    }
}

/// Guard contributes no extra parameters to the generated docs.
impl<'a> OpenApiFromRequest<'a> for AuthGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::{Cookie, Header as HttpHeader, Status};
    use rocket::local::blocking::Client;

    #[rocket::get("/whoami")]
    fn whoami(auth: AuthGuard) -> String {
        auth.principal_id.to_hex()
    }

    fn client() -> Client {
        Client::untracked(rocket::build().mount("/", rocket::routes![whoami]))
            .expect("valid rocket instance")
    }

    fn token_for(id: &ObjectId) -> String {
        crate::services::JwtService::generate_access_token(id).unwrap()
    }

    #[test]
    fn missing_token_is_unauthorized() {
        let client = client();
        let response = client.get("/whoami").dispatch();
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[test]
    fn bearer_header_wins() {
        let client = client();
        let id = ObjectId::new();
        let response = client
            .get("/whoami")
            .header(HttpHeader::new(
                "Authorization",
                format!("Bearer {}", token_for(&id)),
            ))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().unwrap(), id.to_hex());
    }

    #[test]
    fn x_access_token_header_accepted() {
        let client = client();
        let id = ObjectId::new();
        let response = client
            .get("/whoami")
            .header(HttpHeader::new("x-access-token", token_for(&id)))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
    }

    #[test]
    fn query_param_accepted() {
        let client = client();
        let id = ObjectId::new();
        let response = client
            .get(format!("/whoami?token={}", token_for(&id)))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
    }

    #[test]
    fn cookie_accepted() {
        let client = client();
        let id = ObjectId::new();
        let response = client
            .get("/whoami")
            .cookie(Cookie::new("token", token_for(&id)))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
    }

    #[test]
    fn garbage_token_is_forbidden() {
        let client = client();
        let response = client
            .get("/whoami")
            .header(HttpHeader::new("Authorization", "Bearer not-a-token"))
            .dispatch();
        assert_eq!(response.status(), Status::Forbidden);
    }
}
