//! Credential and access token holder.

use snafu::prelude::*;

use crate::{
    api::{self, Credentials},
    error::{self, auth},
    Result,
};

/// Holds account credentials and the current access token.
///
/// A token is only ever handed out after it was supplied explicitly or obtained by a successful
/// [`login`](Self::login).
#[derive(Debug, Default)]
pub struct Session {
    credentials: Option<Credentials>,
    token: Option<String>,
}

impl Session {
    /// Create a session from optional credentials and an optional pre-supplied token
    pub fn new(credentials: Option<Credentials>, token: Option<String>) -> Self {
        Self { credentials, token }
    }

    /// current access token
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// true if login is possible
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Use this token for subsequent stream requests, bypassing login
    pub fn set_token<S: Into<String>>(&mut self, token: S) {
        self.token = Some(token.into());
    }

    /// Forget the current token, next connect will login again
    pub fn invalidate(&mut self) {
        self.token = None;
    }

    /// Login with stored credentials and keep the returned token.
    ///
    /// The stored token is only replaced when login succeeds.
    pub async fn login(&mut self, api: &api::Client) -> Result<&str> {
        let credentials = self
            .credentials
            .as_ref()
            .context(auth::NoCredentials)
            .context(error::Auth)?;

        let token = api.login(credentials).await?;

        Ok(self.token.insert(token).as_str())
    }
}
