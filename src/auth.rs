use actix_web::{dev::Payload, FromRequest, HttpRequest};
use sha2::{Digest, Sha256};
use std::env;
use std::future::{ready, Ready};

use crate::error::ApiError;

/// Header carrying the shared secret on staff-only requests.
pub const STAFF_PASSWORD_HEADER: &str = "x-staff-password";

/// Checks a presented secret against the configured `STAFF_PASSWORD`.
/// Comparing SHA-256 digests instead of the raw strings keeps the comparison
/// independent of how long a matching prefix the caller guessed.
pub fn verify_staff_password(presented: &str) -> bool {
    let expected = match env::var("STAFF_PASSWORD") {
        Ok(v) => v,
        Err(_) => return false,
    };
    Sha256::digest(presented.as_bytes()) == Sha256::digest(expected.as_bytes())
}

/// Extractor gating staff-only handlers. Rejects with 401 before the handler
/// body runs, so an unauthorized request never reaches the repository. There
/// are no sessions or tokens: every protected request re-presents the secret.
pub struct StaffAuth;

impl FromRequest for StaffAuth {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _pl: &mut Payload) -> Self::Future {
        let presented = req
            .headers()
            .get(STAFF_PASSWORD_HEADER)
            .and_then(|v| v.to_str().ok());
        match presented {
            Some(p) if verify_staff_password(p) => ready(Ok(StaffAuth)),
            _ => ready(Err(ApiError::Unauthorized)),
        }
    }
}
