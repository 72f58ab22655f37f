//! Long running event stream client.
//!
//! The client logs in, opens the event stream, publishes every event on its [`EventBus`] and
//! reconnects on any failure until [`Client::stop`] is called. States:
//!
//! ```text
//! CLOSED --start--> CONNECTING --opened--> RUNNING
//!                     ^    |                  |
//!                     |    +--failure, wait---+
//!                     +-----------------------+
//! any --stop--> CLOSED
//! ```

mod backoff;
mod connection;
mod state;
mod worker;

pub use state::ClientState;

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use snafu::prelude::*;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    api::{self, Credentials},
    bus::{EventBus, Listener, Subscription},
    config::Config,
    error::{self, client},
    sse::Event,
    Result, Session,
};
use backoff::Backoff;
use worker::Worker;

struct Shared {
    config: Config,
    api: api::Client,
    bus: EventBus,
    credentials: Option<Credentials>,
    token_tx: watch::Sender<Option<String>>,
    state_tx: Arc<watch::Sender<ClientState>>,
    // cancel token of the current or last run
    run: Mutex<Option<CancellationToken>>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(cancel) = self.run.get_mut().take() {
            cancel.cancel();
        }
    }
}

/// Crownstone event stream client.
///
/// Cheap to clone, clones control the same connection. Dropping the last clone stops it.
///
/// ```no_run
/// use std::sync::Arc;
/// use crownstone_sse::{api::Credentials, config::Config, sse::event_type, Client, Event};
///
/// # async fn run() -> crownstone_sse::Result<()> {
/// let client = Client::new(
///     Config::default(),
///     Some(Credentials::new("me@example.com", "secret")),
/// )?;
///
/// client.subscribe(event_type::ENTER_LOCATION, |event: Arc<Event>| async move {
///     println!("{:?}", event);
/// });
///
/// client.start().await?;
/// client.closed().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("label", &self.shared.config.label)
            .field("state", &self.state())
            .field("bus", &self.shared.bus)
            .finish()
    }
}

impl Client {
    /// Create a stopped client.
    ///
    /// Without credentials an access token must be provided by
    /// [`set_access_token`](Self::set_access_token) before [`start`](Self::start).
    pub fn new(config: Config, credentials: Option<Credentials>) -> Result<Self> {
        let api = api::Client::new(&config)?;
        let (token_tx, _) = watch::channel(None);
        let (state_tx, _) = watch::channel(ClientState::Closed);

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                api,
                bus: EventBus::new(),
                credentials,
                token_tx,
                state_tx: Arc::new(state_tx),
                run: Mutex::new(None),
            }),
        })
    }

    /// Use this access token, skipping login. A running client picks it up on the next reconnect.
    pub fn set_access_token<S: Into<String>>(&self, token: S) {
        self.shared.token_tx.send_replace(Some(token.into()));
        log::debug!("[{}] Access token set", self.shared.config.label);
    }

    /// Start the client.
    ///
    /// Logs in first if no access token is set, a login failure is returned here. After that the
    /// client runs in a background task and recovers from every failure by itself.
    ///
    /// Right after [`stop`](Self::stop) this first waits for the previous run to close.
    pub async fn start(&self) -> Result<()> {
        let shared = &self.shared;
        let label = &shared.config.label;

        let cancel = loop {
            {
                let mut run = shared.run.lock();

                if run.as_ref().map_or(false, |c| !c.is_cancelled()) {
                    return client::AlreadyRunning.fail().context(error::Client);
                }

                if *shared.state_tx.borrow() == ClientState::Closed {
                    let cancel = CancellationToken::new();
                    *run = Some(cancel.clone());
                    break cancel;
                }
            }

            // stopped, but the previous worker has not exited yet
            log::debug!("[{}] Waiting for previous run to close", label);
            self.closed().await;
        };

        log::info!("[{}] Starting", label);
        shared.state_tx.send_replace(ClientState::Connecting);

        let mut token_rx = shared.token_tx.subscribe();
        let token = token_rx.borrow_and_update().clone();
        let mut session = Session::new(shared.credentials.clone(), token);

        if session.token().is_none() {
            let login = tokio::select! {
                biased;

                _ = cancel.cancelled() => client::CloseReceived.fail().context(error::Client),

                result = session.login(&shared.api) => result.map(|_| ()),
            };

            if let Err(err) = login {
                log::debug!("[{}] Start failed: {}", label, err);
                shared.state_tx.send_replace(ClientState::Closed);
                cancel.cancel();
                return Err(err);
            }
        }

        let worker = Worker {
            label: label.clone(),
            api: shared.api.clone(),
            bus: shared.bus.clone(),
            session,
            token_rx,
            state_tx: shared.state_tx.clone(),
            backoff: Backoff::new(shared.config.reconnect),
            idle_timeout: shared.config.idle_timeout,
            cancel,
            failing: false,
        };

        tokio::spawn(worker.run());

        Ok(())
    }

    /// Stop the client. Pending reconnect waits and stream reads end immediately.
    ///
    /// Does nothing if the client is not running. Use [`closed`](Self::closed) to wait until
    /// the background task has finished.
    pub fn stop(&self) {
        match self.shared.run.lock().as_ref() {
            Some(cancel) if !cancel.is_cancelled() => {
                log::info!("[{}] Stopping", self.shared.config.label);
                cancel.cancel();
            }
            _ => log::debug!("[{}] Not running, ignore stop", self.shared.config.label),
        }
    }

    /// Wait until the client is closed
    pub async fn closed(&self) {
        let mut rx = self.shared.state_tx.subscribe();
        // sender lives in self, never closed here
        let _ = rx.wait_for(|s| *s == ClientState::Closed).await;
    }

    /// diagnostic label from the config
    pub fn label(&self) -> &str {
        &self.shared.config.label
    }

    /// current state
    pub fn state(&self) -> ClientState {
        *self.shared.state_tx.borrow()
    }

    /// Receiver of state changes
    pub fn state_changes(&self) -> watch::Receiver<ClientState> {
        self.shared.state_tx.subscribe()
    }

    /// true while the stream is open
    pub fn is_available(&self) -> bool {
        self.state() == ClientState::Running
    }

    /// Subscribe an async listener to an event type, see [`EventBus::subscribe`]
    pub fn subscribe<S, L>(&self, event_type: S, listener: L) -> Subscription
    where
        S: Into<String>,
        L: Listener,
    {
        self.shared.bus.subscribe(event_type, listener)
    }

    /// Subscribe a plain function to an event type, see [`EventBus::subscribe_blocking`]
    pub fn subscribe_blocking<S, F>(&self, event_type: S, f: F) -> Subscription
    where
        S: Into<String>,
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.shared.bus.subscribe_blocking(event_type, f)
    }

    /// Number of listeners per event type
    pub fn listener_counts(&self) -> HashMap<String, usize> {
        self.shared.bus.listener_counts()
    }

    /// The bus events are published on
    pub fn bus(&self) -> &EventBus {
        &self.shared.bus
    }
}
