//! client error types

use std::time::Duration;

use snafu::prelude::*;

use crate::sse::FrameError;

/// client result type
pub type Result<T> = std::result::Result<T, Error>;

/// client error type
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), context(suffix(false)))]
pub enum Error {
    /// Login to the cloud failed, or the access token is no longer accepted
    #[snafu(display("authentication failed: {source}"))]
    Auth {
        /// source error
        source: AuthError,
    },

    /// Can't reach the cloud or the event server
    #[snafu(display("connection failed: {source}"))]
    Connect {
        /// source error
        source: ConnectError,
    },

    /// Client used in a way its current state does not allow
    #[snafu(display("client error: {source}"))]
    Client {
        /// source error
        source: ClientError,
    },

    /// create HTTP client failed
    #[snafu(display("create http client failed: {source}"))]
    HttpClientCreateFailed {
        /// source error
        source: reqwest::Error,
    },

    /// configured login or event url is invalid
    #[snafu(display("invalid url {url}: {source}"))]
    InvalidUrl {
        /// configured url
        url: String,
        /// source error
        source: url::ParseError,
    },

    /// parse response body of login request failed
    #[snafu(display("parse response body {body:?} failed: {source}"))]
    ParseBodyFailed {
        /// http response body
        body: bytes::Bytes,
        /// source parse error
        source: serde_json::Error,
    },

    /// create runtime or thread for the blocking client failed
    #[snafu(display("spawn worker failed: {source}"))]
    SpawnWorkerFailed {
        /// source error
        source: std::io::Error,
    },
}

impl Error {
    /// true if this error comes from the authentication layer
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}

/// Authentication error kinds
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(auth), context(suffix(false)))]
pub enum AuthError {
    /// neither email/password nor an access token is configured
    #[snafu(display("no access token set and no email/password provided"))]
    NoCredentials,

    /// cloud rejected the email/password combination
    #[snafu(display("wrong email/password"))]
    WrongEmailPassword,

    /// account exists but its email address is not verified yet
    #[snafu(display("email not verified"))]
    EmailNotVerified,

    /// login got a response this client does not understand
    #[snafu(display("unknown error occurred, http status code {status_code}"))]
    UnknownError {
        /// received http status code
        status_code: reqwest::StatusCode,
    },

    /// event server reported the access token as expired
    #[snafu(display("access token expired"))]
    TokenExpired,
}

/// Connection error kinds
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(connect), context(suffix(false)))]
pub enum ConnectError {
    /// request could not be sent at all
    #[snafu(display("request to {url} failed, no internet connection: {source}"))]
    NoInternet {
        /// target url, without query
        url: String,
        /// source http error
        source: reqwest::Error,
    },

    /// event server answered with a non-success status
    #[snafu(display("event server responded with http status code {status_code}"))]
    NoResponse {
        /// received http status code
        status_code: reqwest::StatusCode,
    },

    /// no data received within the idle timeout
    #[snafu(display("no data received for {idle:?}"))]
    Timeout {
        /// idle timeout that expired
        idle: Duration,
    },

    /// reading or decoding the event stream failed
    #[snafu(display("connection to cloud lost: {source}"))]
    ConnectionLost {
        /// source error
        source: FrameError,
    },

    /// event stream body ended without the server saying so
    #[snafu(display("event stream ended unexpectedly"))]
    StreamEnded,
}

/// Client usage error kinds
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(client), context(suffix(false)))]
pub enum ClientError {
    /// client was stopped while the operation was in progress
    #[snafu(display("connection close received"))]
    CloseReceived,

    /// start called on a client that is already running
    #[snafu(display("client is already running"))]
    AlreadyRunning,

    /// worker thread of the blocking client exited without reporting
    #[snafu(display("worker thread stopped unexpectedly"))]
    WorkerStopped,
}
