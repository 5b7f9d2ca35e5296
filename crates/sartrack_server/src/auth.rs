//! Bearer credential validation.
//!
//! The whole activity shares one credential, distributed to field nodes out
//! of band. Requests carry it as an `Authorization: Bearer <token>` value;
//! issuing and rotating the credential is outside this core.

use crate::error::{ApiError, ApiResult};

/// Validates the shared bearer credential on incoming requests.
#[derive(Debug, Clone)]
pub struct BearerValidator {
    secret: String,
}

impl BearerValidator {
    /// Creates a validator for the given shared secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Checks an `Authorization` header value, if any.
    pub fn validate(&self, authorization: Option<&str>) -> ApiResult<()> {
        let header = authorization
            .ok_or_else(|| ApiError::Unauthorized("missing bearer credential".into()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("malformed Authorization value".into()))?;
        if token == self.secret {
            Ok(())
        } else {
            Err(ApiError::Unauthorized("invalid credential".into()))
        }
    }
}
