//! PostgreSQL connector built on the synchronous `postgres` client.
//!
//! The client blocks without an upper bound once the TCP socket is open, so
//! every call runs on a worker thread and the caller waits at most the
//! configured timeout. A worker that outlives its deadline is abandoned.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use native_tls::TlsConnector;
use postgres::config::SslMode;
use postgres::{Client, Config, NoTls, SimpleQueryMessage};
use postgres_native_tls::MakeTlsConnector;
use preflight_core::{ConnectParams, DatabaseConnector, DatabaseSession};
use preflight_model::OpaqueError;
use tracing::{debug, warn};

use crate::error::RemoteError;

/// Application name reported to the server.
const APPLICATION_NAME: &str = "preflight";

/// Opens sessions with `postgres::Config`.
///
/// With SSL enabled the server certificate is not verified, matching how
/// managed Postgres endpoints are usually reached from development machines.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresConnector;

impl PostgresConnector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn config(params: &ConnectParams) -> Config {
        let mut config = Config::new();
        config
            .host(&params.host)
            .port(params.port)
            .dbname(&params.database)
            .user(&params.user)
            .password(&params.password)
            .application_name(APPLICATION_NAME)
            .connect_timeout(params.timeout)
            .ssl_mode(if params.ssl {
                SslMode::Require
            } else {
                SslMode::Disable
            });
        config
    }

    fn open(params: &ConnectParams) -> Result<Client, RemoteError> {
        let config = Self::config(params);
        let client = if params.ssl {
            let connector = TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .build()?;
            config.connect(MakeTlsConnector::new(connector))?
        } else {
            config.connect(NoTls)?
        };
        Ok(client)
    }
}

impl DatabaseConnector for PostgresConnector {
    fn connect(&self, params: &ConnectParams) -> Result<Box<dyn DatabaseSession>, OpaqueError> {
        let timeout = params.timeout;
        let worker_params = params.clone();
        let client = bounded(timeout, "connect", move || -> Result<Client, OpaqueError> {
            let mut client = Self::open(&worker_params).map_err(OpaqueError::from)?;
            // Server-side limit for later queries, on top of the client deadline.
            let statement_timeout = format!(
                "SET statement_timeout = {}",
                worker_params.timeout.as_millis()
            );
            if let Err(err) = client.batch_execute(&statement_timeout) {
                warn!(error = %err, "could not set statement timeout");
            }
            Ok(client)
        })??;
        debug!(host = %params.host, "database session opened");

        Ok(Box::new(PostgresSession {
            client: Some(client),
            timeout,
        }))
    }
}

/// A live `postgres::Client`.
pub struct PostgresSession {
    client: Option<Client>,
    timeout: Duration,
}

impl DatabaseSession for PostgresSession {
    fn query_row(&mut self, sql: &str) -> Result<Vec<String>, OpaqueError> {
        let mut client = self
            .client
            .take()
            .ok_or_else(|| OpaqueError::new("ECONNRESET", "database session already closed"))?;
        let sql = sql.to_string();
        // On timeout the client stays with the abandoned worker.
        let (client, result) = bounded(self.timeout, "query", move || {
            let result = client
                .simple_query(&sql)
                .map(|messages| first_row(&messages))
                .map_err(|err| OpaqueError::from(RemoteError::from(err)));
            (client, result)
        })?;
        self.client = Some(client);
        result
    }

    fn close(&mut self) {
        if let Some(client) = self.client.take() {
            match bounded(self.timeout, "close", move || client.close()) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(error = %err, "error while closing database session"),
                Err(err) => warn!(error = %err.message, "database session did not close in time"),
            }
        }
    }
}

/// Runs `job` on a worker thread and waits at most `timeout` for its result.
fn bounded<T, F>(timeout: Duration, operation: &str, job: F) -> Result<T, OpaqueError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (sender, receiver) = mpsc::sync_channel(1);
    thread::Builder::new()
        .name(format!("preflight-postgres-{operation}"))
        .spawn(move || {
            // The receiver is gone once the caller gave up waiting.
            let _ = sender.send(job());
        })
        .map_err(|err| {
            OpaqueError::new("EAGAIN", format!("failed to start database worker: {err}"))
        })?;

    match receiver.recv_timeout(timeout) {
        Ok(value) => Ok(value),
        Err(RecvTimeoutError::Timeout) => {
            warn!(operation, ?timeout, "database call timed out");
            Err(OpaqueError::new(
                "ETIMEDOUT",
                format!("database {operation} timed out after {timeout:?}"),
            ))
        }
        Err(RecvTimeoutError::Disconnected) => Err(OpaqueError::new(
            "ECONNABORTED",
            format!("database {operation} worker exited without a result"),
        )),
    }
}

fn first_row(messages: &[SimpleQueryMessage]) -> Vec<String> {
    messages
        .iter()
        .find_map(|message| match message {
            SimpleQueryMessage::Row(row) => Some(
                (0..row.len())
                    .map(|index| row.get(index).unwrap_or("NULL").to_string())
                    .collect(),
            ),
            _ => None,
        })
        .unwrap_or_default()
}
