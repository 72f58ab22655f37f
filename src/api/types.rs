//! Crownstone cloud HTTP API request/response types

use std::fmt;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// error code for a wrong email/password combination
pub const LOGIN_FAILED: &str = "LOGIN_FAILED";

/// error code for an account whose email is not verified
pub const LOGIN_FAILED_EMAIL_NOT_VERIFIED: &str = "LOGIN_FAILED_EMAIL_NOT_VERIFIED";

/// Account credentials used for (re-)login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// account email address
    pub email: String,
    /// plain account password, only its digest is ever sent
    pub password: String,
}

impl Credentials {
    /// Create credentials from email and plain password
    pub fn new<E: Into<String>, P: Into<String>>(email: E, password: P) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// SHA-1 hex digest of the password, the form the cloud expects
    pub fn hashed_password(&self) -> String {
        hex::encode(Sha1::digest(self.password.as_bytes()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// body of a login request
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: String,
}

/// body of a successful login response
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    /// session id, used as access token
    pub id: String,
}

/// body of a failed login response
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub code: String,
}
