use reqwest::{
    header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE},
    StatusCode,
};
use snafu::prelude::*;
use url::Url;

use super::types::*;
use crate::{
    config::Config,
    error::{self, auth, connect, ConnectError},
    Result,
};

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

static EVENT_STREAM: &str = "text/event-stream";

static NO_CACHE: &str = "no-cache";

static ACCESS_TOKEN_QUERY: &str = "accessToken";

/// Crownstone cloud HTTP client, does login and opens event streams
#[derive(Debug, Clone)]
pub struct Client {
    client: reqwest::Client,
    login_url: Url,
    events_url: Url,
    request_timeout: std::time::Duration,
    // bounds waiting for the stream response headers, the body is watched by the reader
    open_timeout: std::time::Duration,
}

impl Client {
    /// Create a client from config, reusing `config.http_client` if provided
    pub fn new(config: &Config) -> Result<Self> {
        let client = match config.http_client {
            Some(ref client) => client.clone(),
            None => reqwest::Client::builder()
                .gzip(true)
                .deflate(true)
                .user_agent(APP_USER_AGENT)
                .connect_timeout(config.connect_timeout)
                .build()
                .context(error::HttpClientCreateFailed)?,
        };

        let login_url = Url::parse(&config.login_url).with_context(|_| error::InvalidUrl {
            url: &config.login_url,
        })?;

        let events_url = Url::parse(&config.events_url).with_context(|_| error::InvalidUrl {
            url: &config.events_url,
        })?;

        Ok(Self {
            client,
            login_url,
            events_url,
            request_timeout: config.request_timeout,
            open_timeout: config.idle_timeout,
        })
    }

    /// Login with email and password, returning the access token.
    pub async fn login(&self, credentials: &Credentials) -> Result<String> {
        let body = LoginRequest {
            email: &credentials.email,
            password: credentials.hashed_password(),
        };

        log::debug!("Logging in as {}", credentials.email);

        let resp = self
            .client
            .post(self.login_url.clone())
            .json(&body)
            .timeout(self.request_timeout)
            .send()
            .await
            .with_context(|_| connect::NoInternet {
                url: self.login_url.as_str(),
            })
            .context(error::Connect)?;

        let status_code = resp.status();

        let body = resp
            .bytes()
            .await
            .with_context(|_| connect::NoInternet {
                url: self.login_url.as_str(),
            })
            .context(error::Connect)?;

        match status_code {
            StatusCode::OK => {
                let data: LoginResponse = serde_json::from_slice(&body)
                    .with_context(|_| error::ParseBodyFailed { body })?;

                log::debug!("Login successful");

                Ok(data.id)
            }
            StatusCode::UNAUTHORIZED => {
                let code = serde_json::from_slice::<ErrorResponse>(&body)
                    .ok()
                    .map(|resp| resp.error.code);

                log::debug!("Login rejected with error code {:?}", code);

                let err = match code.as_deref() {
                    Some(LOGIN_FAILED) => auth::WrongEmailPassword.build(),
                    Some(LOGIN_FAILED_EMAIL_NOT_VERIFIED) => auth::EmailNotVerified.build(),
                    _ => auth::Unknown { status_code }.build(),
                };

                Err(err).context(error::Auth)
            }
            _ => auth::Unknown { status_code }
                .fail()
                .context(error::Auth),
        }
    }

    /// Open the event stream for the access token.
    ///
    /// The returned response may have status 204, which means the server has no stream for us.
    /// Response headers must arrive within the idle timeout. The request has no total timeout,
    /// idle detection of the body is done by the reader.
    pub async fn open_stream(
        &self,
        token: &str,
    ) -> std::result::Result<reqwest::Response, ConnectError> {
        let mut url = self.events_url.clone();
        url.query_pairs_mut().append_pair(ACCESS_TOKEN_QUERY, token);

        log::debug!("Opening event stream at {}", self.events_url);

        let request = self
            .client
            .get(url)
            .header(CONTENT_TYPE, EVENT_STREAM)
            .header(ACCEPT, EVENT_STREAM)
            .header(CACHE_CONTROL, NO_CACHE)
            .send();

        let resp = tokio::time::timeout(self.open_timeout, request)
            .await
            .map_err(|_| {
                connect::Timeout {
                    idle: self.open_timeout,
                }
                .build()
            })?
            .with_context(|_| connect::NoInternet {
                url: self.events_url.as_str(),
            })?;

        ensure!(
            resp.status().is_success(),
            connect::NoResponse {
                status_code: resp.status()
            }
        );

        Ok(resp)
    }
}
