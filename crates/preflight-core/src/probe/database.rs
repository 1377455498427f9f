//! PostgreSQL probe.

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use preflight_model::target::{DB_HOST, DB_NAME, DB_PASSWORD, DB_PORT, DB_SSL, DB_USER};
use preflight_model::{Fact, OpaqueError, ProbeDepth, ProbeOutcome, TargetConfig};
use regex::Regex;

use super::{ServiceProbe, StageFailure, SubCheck, run_checks};
use crate::validate::ssl_enabled;

/// Extracts the `x.y` release from a `version()` banner.
static VERSION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PostgreSQL ([\d.]+)").expect("Invalid version regex"));

const VERSION_UNKNOWN: &str = "Unknown";

/// Everything needed to open one database session.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub ssl: bool,
    pub timeout: Duration,
}

impl ConnectParams {
    /// Builds parameters from a validated database config.
    pub fn from_config(config: &TargetConfig, timeout: Duration) -> Result<Self, OpaqueError> {
        let value = |key: &str| {
            config
                .get(key)
                .map(str::to_string)
                .ok_or_else(|| OpaqueError::new("EINVAL", format!("{key} is not set")))
        };
        let port = value(DB_PORT)?;
        let port = port
            .parse::<u16>()
            .map_err(|_| {
                OpaqueError::new("EINVAL", format!("{DB_PORT} is not a valid port: {port}"))
            })?;

        Ok(Self {
            host: value(DB_HOST)?,
            port,
            database: value(DB_NAME)?,
            user: value(DB_USER)?,
            password: value(DB_PASSWORD)?,
            ssl: ssl_enabled(config.get(DB_SSL)),
            timeout,
        })
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("ssl", &self.ssl)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// An open database session.
pub trait DatabaseSession {
    /// Runs `sql` and returns the columns of the first row as text.
    ///
    /// An empty vector means the query returned no rows.
    fn query_row(&mut self, sql: &str) -> Result<Vec<String>, OpaqueError>;

    /// Ends the session. Called exactly once.
    fn close(&mut self);
}

/// Opens database sessions.
pub trait DatabaseConnector {
    fn connect(&self, params: &ConnectParams) -> Result<Box<dyn DatabaseSession>, OpaqueError>;
}

/// Owns a session and closes it when dropped.
struct SessionGuard {
    session: Box<dyn DatabaseSession>,
}

impl SessionGuard {
    fn query_row(&mut self, sql: &str) -> Result<Vec<String>, OpaqueError> {
        tracing::trace!(sql, "running query");
        self.session.query_row(sql)
    }

    fn query_scalar(&mut self, sql: &str) -> Result<String, OpaqueError> {
        self.query_row(sql)?
            .into_iter()
            .next()
            .ok_or_else(|| OpaqueError::new("ENODATA", format!("query returned no rows: {sql}")))
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        tracing::debug!("closing database session");
        self.session.close();
    }
}

struct DatabaseContext<'a> {
    connector: &'a dyn DatabaseConnector,
    params: ConnectParams,
    session: Option<SessionGuard>,
}

impl DatabaseContext<'_> {
    fn session(&mut self) -> Result<&mut SessionGuard, OpaqueError> {
        self.session
            .as_mut()
            .ok_or_else(|| OpaqueError::new("ENOTCONN", "no open database session"))
    }
}

fn open(ctx: &mut DatabaseContext<'_>) -> Result<Vec<Fact>, OpaqueError> {
    tracing::debug!(
        host = %ctx.params.host,
        port = ctx.params.port,
        ssl = ctx.params.ssl,
        "connecting"
    );
    let session = ctx.connector.connect(&ctx.params)?;
    ctx.session = Some(SessionGuard { session });
    Ok(vec![Fact::info(
        "Connected to",
        format!("{}:{}", ctx.params.host, ctx.params.port),
    )])
}

fn liveness(ctx: &mut DatabaseContext<'_>) -> Result<Vec<Fact>, OpaqueError> {
    ctx.session()?.query_scalar("SELECT 1")?;
    Ok(vec![Fact::info("Test query", "SELECT 1 ok")])
}

fn version(ctx: &mut DatabaseContext<'_>) -> Result<Vec<Fact>, OpaqueError> {
    let banner = ctx.session()?.query_scalar("SELECT version()")?;
    Ok(vec![Fact::info("PostgreSQL version", extract_version(&banner))])
}

fn server_time(ctx: &mut DatabaseContext<'_>) -> Result<Vec<Fact>, OpaqueError> {
    let now = ctx.session()?.query_scalar("SELECT NOW()")?;
    Ok(vec![Fact::info("Database time", now)])
}

fn ssl_status(ctx: &mut DatabaseContext<'_>) -> Result<Vec<Fact>, OpaqueError> {
    let ssl = ctx.session()?.query_scalar("SHOW ssl")?;
    Ok(vec![Fact::info("SSL connection", ssl)])
}

fn database_size(ctx: &mut DatabaseContext<'_>) -> Result<Vec<Fact>, OpaqueError> {
    let size = ctx
        .session()?
        .query_scalar("SELECT pg_size_pretty(pg_database_size(current_database()))")?;
    Ok(vec![Fact::info("Database size", size)])
}

fn table_count(ctx: &mut DatabaseContext<'_>) -> Result<Vec<Fact>, OpaqueError> {
    let count = ctx.session()?.query_scalar(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'public'",
    )?;
    Ok(vec![Fact::info("Tables in database", count)])
}

fn version_and_time(ctx: &mut DatabaseContext<'_>) -> Result<Vec<Fact>, OpaqueError> {
    let row = ctx.session()?.query_row("SELECT version(), NOW()")?;
    let mut columns = row.into_iter();
    let (Some(banner), Some(now)) = (columns.next(), columns.next()) else {
        return Err(OpaqueError::new(
            "ENODATA",
            "query returned no rows: SELECT version(), NOW()",
        ));
    };
    Ok(vec![
        Fact::info("Test query", "SELECT version(), NOW() ok"),
        Fact::info("PostgreSQL version", extract_version(&banner)),
        Fact::info("Database time", now),
    ])
}

fn checks<'a>(depth: ProbeDepth) -> Vec<SubCheck<DatabaseContext<'a>>> {
    match depth {
        ProbeDepth::Bare => vec![
            SubCheck::required("open connection", open),
            SubCheck::required("version and time", version_and_time),
        ],
        ProbeDepth::Full => vec![
            SubCheck::required("open connection", open),
            SubCheck::required("liveness query", liveness),
            SubCheck::optional("server version", version),
            SubCheck::optional("server time", server_time),
            SubCheck::optional("ssl status", ssl_status),
            SubCheck::optional("database size", database_size),
            SubCheck::optional("table count", table_count),
        ],
    }
}

/// `x.y` release number from a `version()` banner, or `Unknown`.
#[must_use]
pub fn extract_version(banner: &str) -> String {
    VERSION_REGEX
        .captures(banner)
        .and_then(|captures| captures.get(1))
        .map_or_else(|| VERSION_UNKNOWN.to_string(), |m| m.as_str().to_string())
}

/// Probes a PostgreSQL database through a [`DatabaseConnector`].
pub struct DatabaseProbe {
    connector: Box<dyn DatabaseConnector>,
    depth: ProbeDepth,
    timeout: Duration,
}

impl DatabaseProbe {
    /// Probe running every sub-check.
    pub fn new(connector: Box<dyn DatabaseConnector>, timeout: Duration) -> Self {
        Self {
            connector,
            depth: ProbeDepth::Full,
            timeout,
        }
    }

    /// Probe that connects and runs a single query.
    pub fn bare(connector: Box<dyn DatabaseConnector>, timeout: Duration) -> Self {
        Self {
            connector,
            depth: ProbeDepth::Bare,
            timeout,
        }
    }

    #[must_use]
    pub fn depth(&self) -> ProbeDepth {
        self.depth
    }
}

impl ServiceProbe for DatabaseProbe {
    fn requires_authentication(&self) -> bool {
        false
    }

    fn authenticate(&mut self, _config: &TargetConfig) -> Result<Vec<Fact>, StageFailure> {
        Ok(Vec::new())
    }

    fn probe(&mut self, config: &TargetConfig) -> ProbeOutcome {
        let params = match ConnectParams::from_config(config, self.timeout) {
            Ok(params) => params,
            Err(error) => return ProbeOutcome::Failure { error },
        };
        let mut context = DatabaseContext {
            connector: self.connector.as_ref(),
            params,
            session: None,
        };
        run_checks(&mut context, &checks(self.depth))
    }
}
