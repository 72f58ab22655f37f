use std::{sync::Arc, time::Duration};

use futures_util::StreamExt;
use reqwest::StatusCode;
use snafu::prelude::*;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{backoff::Backoff, connection::Connection, ClientState};
use crate::{
    api,
    bus::EventBus,
    error::{self, auth, connect},
    sse::event::{event_type, Event},
    Error, Result, Session,
};

enum Outcome {
    /// server said the token expired, `fresh` if the token came from a login of this attempt
    /// and nothing else was received before
    TokenExpired { fresh: bool },
    /// server answered 204
    Ended,
    Failed(Error),
}

/// Owns the session and runs connect, read and reconnect until cancelled.
pub(crate) struct Worker {
    pub label: String,
    pub api: api::Client,
    pub bus: EventBus,
    pub session: Session,
    pub token_rx: watch::Receiver<Option<String>>,
    pub state_tx: Arc<watch::Sender<ClientState>>,
    pub backoff: Backoff,
    pub idle_timeout: Duration,
    pub cancel: CancellationToken,
    /// a failure was already reported since the last successful open
    pub failing: bool,
}

impl Worker {
    pub async fn run(mut self) {
        log::debug!("[{}] Worker task start", self.label);

        let cancel = self.cancel.clone();

        loop {
            let outcome = tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    log::debug!("[{}] Close received while connected", self.label);
                    break;
                }

                outcome = self.connect_and_stream() => outcome,
            };

            match outcome {
                Outcome::TokenExpired { fresh: false } => {
                    log::info!("[{}] Access token expired, login again", self.label);
                    self.session.invalidate();
                    self.set_state(ClientState::Connecting);
                    continue;
                }
                Outcome::TokenExpired { fresh: true } => {
                    self.session.invalidate();
                    self.report(Error::Auth {
                        source: auth::TokenExpired.build(),
                    });
                }
                Outcome::Ended => {
                    log::info!("[{}] Event server ended the stream", self.label);
                    self.set_state(ClientState::Connecting);
                }
                Outcome::Failed(err) => self.report(err),
            }

            if !self.wait_reconnect(&cancel).await {
                break;
            }
        }

        self.set_state(ClientState::Closed);
        log::info!("[{}] Client closed", self.label);
    }

    fn set_state(&self, state: ClientState) {
        let old = self.state_tx.send_replace(state);
        if old != state {
            log::debug!("[{}] State {} -> {}", self.label, old, state);
        }
    }

    /// Log a failure once per transition into connecting
    fn report(&mut self, err: Error) {
        if self.failing {
            log::debug!("[{}] Still failing: {}", self.label, err);
        } else if err.is_auth() {
            log::error!("[{}] {}, retrying", self.label, err);
        } else {
            log::warn!("[{}] {}, reconnecting", self.label, err);
        }

        self.failing = true;
        self.set_state(ClientState::Connecting);
    }

    /// false if cancelled while waiting
    async fn wait_reconnect(&mut self, cancel: &CancellationToken) -> bool {
        let delay = self.backoff.next_delay();

        log::debug!("[{}] Reconnect in {:?}", self.label, delay);

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                log::debug!("[{}] Reconnect wait cancelled", self.label);
                false
            }

            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Open the stream, logging in first when there is no token
    async fn connect(&mut self) -> Result<(reqwest::Response, bool)> {
        if self.token_rx.has_changed().unwrap_or(false) {
            if let Some(token) = self.token_rx.borrow_and_update().clone() {
                log::debug!("[{}] Use newly provided access token", self.label);
                self.session.set_token(token);
            }
        }

        let fresh = self.session.token().is_none();
        if fresh {
            self.session.login(&self.api).await?;
        }

        let token = self
            .session
            .token()
            .context(auth::NoCredentials)
            .context(error::Auth)?;

        let response = self
            .api
            .open_stream(token)
            .await
            .context(error::Connect)?;

        Ok((response, fresh))
    }

    async fn connect_and_stream(&mut self) -> Outcome {
        let (response, fresh) = match self.connect().await {
            Ok(r) => r,
            Err(err) => return Outcome::Failed(err),
        };

        if response.status() == StatusCode::NO_CONTENT {
            return Outcome::Ended;
        }

        self.backoff.reset();
        self.failing = false;
        self.set_state(ClientState::Running);

        log::info!("[{}] Event stream connected", self.label);

        let mut connection = Connection::new(response.bytes_stream().boxed(), self.idle_timeout);

        let mut received = 0usize;

        loop {
            match connection.next_payload().await {
                Ok(Some(value)) => {
                    if let Some(outcome) = self.dispatch(value, fresh && received == 0) {
                        return outcome;
                    }
                    received += 1;
                }
                Ok(None) => {
                    return Outcome::Failed(Error::Connect {
                        source: connect::StreamEnded.build(),
                    })
                }
                Err(source) => return Outcome::Failed(Error::Connect { source }),
            }
        }
    }

    /// Publish one payload. Returns an outcome if the stream must be left.
    fn dispatch(&self, value: serde_json::Value, fresh: bool) -> Option<Outcome> {
        let event = match Event::classify(value) {
            Ok(Some(event)) => event,
            Ok(None) => return None,
            Err(err) => {
                log::warn!("[{}] Skip event: {}", self.label, err);
                return None;
            }
        };

        let key = event.event_type();

        log::trace!("[{}] Received {} event", self.label, key);

        match key {
            event_type::TOKEN_EXPIRED => return Some(Outcome::TokenExpired { fresh }),
            event_type::NO_CONNECTION => {
                if let Some(system) = event.as_system() {
                    log::warn!("[{}] Event server: {}", self.label, system.message);
                }
            }
            _ => {}
        }

        self.bus.publish(key, Arc::new(event));

        None
    }
}
