//! Client for programs without an async runtime.

use std::{collections::HashMap, thread};

use parking_lot::Mutex;
use snafu::prelude::*;

use crate::{
    api::Credentials,
    bus::{Listener, Subscription},
    config::Config,
    error::{self, client},
    sse::{Client, ClientState, Event},
    Result,
};

/// Runs a [`Client`] on its own thread with a single threaded tokio runtime.
///
/// All methods are blocking and must not be called from inside an async runtime. Dropping the
/// client stops it and joins the thread.
#[derive(Debug)]
pub struct BlockingClient {
    client: Client,
    thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl BlockingClient {
    /// Create a stopped client, see [`Client::new`]
    pub fn new(config: Config, credentials: Option<Credentials>) -> Result<Self> {
        Ok(Self {
            client: Client::new(config, credentials)?,
            thread: Mutex::new(None),
        })
    }

    /// Start the worker thread.
    ///
    /// Returns once the initial login finished, with its error if it failed.
    pub fn start(&self) -> Result<()> {
        let mut slot = self.thread.lock();

        if let Some(handle) = slot.take() {
            if !handle.is_finished() {
                *slot = Some(handle);
                return client::AlreadyRunning.fail().context(error::Client);
            }
            let _ = handle.join();
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context(error::SpawnWorkerFailed)?;

        let (report_tx, report_rx) = tokio::sync::oneshot::channel();
        let client = self.client.clone();
        let name = format!("{}-worker", self.client.label());

        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || {
                runtime.block_on(async move {
                    let result = client.start().await;
                    let started = result.is_ok();
                    let _ = report_tx.send(result);

                    if started {
                        client.closed().await;
                    }
                });

                // listeners still on the blocking pool may be the ones waiting for this thread
                runtime.shutdown_background();
            })
            .context(error::SpawnWorkerFailed)?;

        *slot = Some(handle);
        drop(slot);

        report_rx
            .blocking_recv()
            .unwrap_or_else(|_| client::WorkerStopped.fail().context(error::Client))
    }

    /// Stop the client and wait for the worker thread to exit.
    ///
    /// Called from a listener on the worker thread itself it only requests the stop.
    pub fn stop(&self) {
        self.client.stop();

        let Some(handle) = self.thread.lock().take() else {
            return;
        };

        if handle.thread().id() == thread::current().id() {
            log::debug!("Stop called from worker thread, not joining");
            return;
        }

        if handle.join().is_err() {
            log::error!("Worker thread panicked");
        }
    }

    /// see [`Client::set_access_token`]
    pub fn set_access_token<S: Into<String>>(&self, token: S) {
        self.client.set_access_token(token)
    }

    /// current state
    pub fn state(&self) -> ClientState {
        self.client.state()
    }

    /// true while the stream is open
    pub fn is_available(&self) -> bool {
        self.client.is_available()
    }

    /// see [`Client::subscribe`]
    pub fn subscribe<S, L>(&self, event_type: S, listener: L) -> Subscription
    where
        S: Into<String>,
        L: Listener,
    {
        self.client.subscribe(event_type, listener)
    }

    /// see [`Client::subscribe_blocking`]
    pub fn subscribe_blocking<S, F>(&self, event_type: S, f: F) -> Subscription
    where
        S: Into<String>,
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.client.subscribe_blocking(event_type, f)
    }

    /// Number of listeners per event type
    pub fn listener_counts(&self) -> HashMap<String, usize> {
        self.client.listener_counts()
    }

    /// The async client driven by the worker thread
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Drop for BlockingClient {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{AuthError, Error};

    fn config() -> Config {
        Config::default()
            .with_login_url("http://127.0.0.1:9/login")
            .with_events_url("http://127.0.0.1:9/sse")
    }

    #[test]
    fn test_start_reports_login_error() {
        let client = BlockingClient::new(config(), None).unwrap();

        let err = client.start().unwrap_err();

        assert!(matches!(
            err,
            Error::Auth {
                source: AuthError::NoCredentials
            }
        ));
        assert_eq!(client.state(), ClientState::Closed);
    }

    #[test]
    fn test_start_and_stop_without_runtime() {
        let client = BlockingClient::new(config(), None).unwrap();
        client.set_access_token("token");

        client.start().unwrap();
        assert!(client.start().is_err());

        client.stop();
        assert_eq!(client.state(), ClientState::Closed);

        // stop again is fine
        client.stop();
    }
}
