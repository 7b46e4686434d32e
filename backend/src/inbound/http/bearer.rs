//! Bearer token extraction.
//!
//! Pulls the raw token out of the `Authorization` header; handlers resolve
//! it through the account service so suspension and revocation are checked
//! on every request, not cached in the extractor.

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{FromRequest, HttpRequest};
use futures_util::future::{Ready, ready};

use crate::domain::Error;

/// Raw bearer credential presented with the request.
pub struct BearerToken(String);

impl BearerToken {
    /// The token string without the `Bearer ` prefix.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequest for BearerToken {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract(req))
    }
}

fn extract(req: &HttpRequest) -> Result<BearerToken, Error> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| Error::unauthorized("Missing bearer token"))?;
    match header.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() => Ok(BearerToken(token.to_string())),
        _ => Err(Error::unauthorized("Missing bearer token")),
    }
}
