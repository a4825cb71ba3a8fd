//! Connection lifecycle for the single shared database handle
//!
//! [`ConnectionManager`] holds the current handle and is what statements
//! borrow from. [`ConnectionSupervisor`] is the background task that opens
//! the handle, retries failed connects, and reopens it after loss:
//!
//! ```text
//! Disconnected --connect ok--> Connected
//! Disconnected --connect err--> (sleep retry_delay) --> Disconnected
//! Connected --connection lost--> Disconnected (reconnect immediately)
//! Connected --other transport error--> supervisor resolves with the error
//! ```
//!
//! In single mode a failed first connect is only logged, and losing the
//! connection ends the supervisor like a fatal error.
//!
//! The handle is replaced wholesale and never mutated in place. Nothing
//! waits for a connection: while disconnected, [`ConnectionManager::handle`]
//! fails immediately.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, Interval};
use tracing::{error, info, warn};

use super::{Connector, DbError, ErrorKind};

/// Delay between connect attempts while disconnected.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Interval between liveness pings while connected.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(30);

/// Whether the manager recovers from connect failures and loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionMode {
    /// One connect attempt at startup; losing that connection ends the process.
    Single,
    /// Retry connects forever and reconnect after loss.
    #[default]
    Reconnect,
}

impl FromStr for ConnectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "reconnect" => Ok(Self::Reconnect),
            other => Err(format!(
                "unknown connection mode '{other}' (expected 'single' or 'reconnect')"
            )),
        }
    }
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => f.write_str("single"),
            Self::Reconnect => f.write_str("reconnect"),
        }
    }
}

/// Connection manager settings
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub mode: ConnectionMode,
    pub retry_delay: Duration,
    /// `None` disables the liveness ping.
    pub heartbeat: Option<Duration>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::default(),
            retry_delay: DEFAULT_RETRY_DELAY,
            heartbeat: Some(DEFAULT_HEARTBEAT),
        }
    }
}

enum Signal {
    Lost(String),
    Fatal(String),
}

/// Owner of the single live connection handle.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    config: ManagerConfig,
    current: watch::Sender<Option<Arc<C::Conn>>>,
    signals: mpsc::UnboundedSender<Signal>,
}

impl<C: Connector> ConnectionManager<C> {
    /// Create a disconnected manager and the supervisor that drives it.
    ///
    /// Nothing connects until [`ConnectionSupervisor::run`] is polled.
    pub fn new(connector: C, config: ManagerConfig) -> (Arc<Self>, ConnectionSupervisor<C>) {
        let (current, _) = watch::channel(None);
        let (signals, receiver) = mpsc::unbounded_channel();

        let manager = Arc::new(Self {
            connector,
            config,
            current,
            signals,
        });
        let supervisor = ConnectionSupervisor {
            manager: Arc::clone(&manager),
            signals: receiver,
        };

        (manager, supervisor)
    }

    /// The current live handle.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Disconnected`] when no handle is live.
    pub fn handle(&self) -> Result<Arc<C::Conn>, DbError> {
        self.current.borrow().clone().ok_or(DbError::Disconnected)
    }

    pub fn is_connected(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Report an error observed while using `conn`.
    ///
    /// Only reports about the current handle count. Connection loss clears
    /// the handle and wakes the supervisor; other transport errors are
    /// forwarded as fatal. Query errors leave everything as is.
    pub fn report(&self, conn: &Arc<C::Conn>, err: &DbError) {
        match err.kind() {
            ErrorKind::Query => {}
            ErrorKind::ConnectionLost => {
                let cleared = self.current.send_if_modified(|current| {
                    let is_current = current.as_ref().is_some_and(|live| Arc::ptr_eq(live, conn));
                    if is_current {
                        *current = None;
                    }
                    is_current
                });
                if cleared {
                    warn!(error = %err.message(), "Database connection lost");
                    let _ = self.signals.send(Signal::Lost(err.message()));
                }
            }
            ErrorKind::Transport => {
                if self.is_current(conn) {
                    error!(error = %err.message(), "Unexpected database transport error");
                    let _ = self.signals.send(Signal::Fatal(err.message()));
                }
            }
        }
    }

    fn is_current(&self, conn: &Arc<C::Conn>) -> bool {
        self.current
            .borrow()
            .as_ref()
            .is_some_and(|live| Arc::ptr_eq(live, conn))
    }
}

/// Background task driving a [`ConnectionManager`]'s state machine.
pub struct ConnectionSupervisor<C: Connector> {
    manager: Arc<ConnectionManager<C>>,
    signals: mpsc::UnboundedReceiver<Signal>,
}

impl<C: Connector> ConnectionSupervisor<C> {
    /// Run the connection lifecycle.
    ///
    /// Resolves only with an error that should end the process: a fatal
    /// transport error, or in single mode the loss of the one connection.
    /// The caller is expected to shut down so an outside process manager can
    /// restart the service.
    pub async fn run(mut self) -> DbError {
        loop {
            let Some(conn) = self.establish().await else {
                return self.idle().await;
            };

            let lost = match self.supervise(conn).await {
                Ok(lost) => lost,
                Err(fatal) => return fatal,
            };

            if self.manager.config.mode == ConnectionMode::Single {
                error!("Single connection mode does not reconnect, giving up");
                return DbError::ConnectionLost(lost);
            }
            info!("Reconnecting to database");
        }
    }

    /// Connect, retrying after `retry_delay` in reconnect mode.
    async fn establish(&mut self) -> Option<Arc<C::Conn>> {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            match self.manager.connector.connect().await {
                Ok(conn) => {
                    let conn = Arc::new(conn);
                    self.manager.current.send_replace(Some(Arc::clone(&conn)));
                    info!(attempt, "Connected to MySQL database");
                    return Some(conn);
                }
                Err(err) => {
                    error!(attempt, error = %err.message(), "Database connection failed");
                    if self.manager.config.mode == ConnectionMode::Single {
                        return None;
                    }
                    time::sleep(self.manager.config.retry_delay).await;
                }
            }
        }
    }

    /// Watch a live handle until it is lost (`Ok` with the loss message) or
    /// fails fatally (`Err`).
    async fn supervise(&mut self, conn: Arc<C::Conn>) -> Result<String, DbError> {
        let mut heartbeat = self
            .manager
            .config
            .heartbeat
            .filter(|period| !period.is_zero())
            .map(|period| time::interval_at(Instant::now() + period, period));

        loop {
            tokio::select! {
                Some(signal) = self.signals.recv() => match signal {
                    Signal::Lost(message) => return Ok(message),
                    Signal::Fatal(message) => return Err(DbError::Transport(message)),
                },
                _ = next_tick(&mut heartbeat) => {
                    if let Err(err) = self.manager.connector.ping(&conn).await {
                        self.manager.report(&conn, &err);
                    }
                }
            }
        }
    }

    /// Initial connect failed in single mode. No handle exists, so nothing
    /// is reported and the task stays pending.
    async fn idle(&mut self) -> DbError {
        loop {
            match self.signals.recv().await {
                Some(Signal::Fatal(message)) => return DbError::Transport(message),
                Some(Signal::Lost(_)) => continue,
                None => return std::future::pending().await,
            }
        }
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    #[derive(Debug)]
    struct FakeConn {
        serial: usize,
    }

    /// Connects according to a script of outcomes; succeeds once it runs out.
    #[derive(Default)]
    struct FakeConnector {
        script: Mutex<VecDeque<bool>>,
        attempts: AtomicUsize,
        fail_next_ping: AtomicBool,
    }

    impl FakeConnector {
        fn scripted(outcomes: &[bool]) -> Self {
            Self {
                script: Mutex::new(outcomes.iter().copied().collect()),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl Connector for FakeConnector {
        type Conn = FakeConn;

        async fn connect(&self) -> Result<FakeConn, DbError> {
            let serial = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let ok = self.script.lock().unwrap().pop_front().unwrap_or(true);
            if ok {
                Ok(FakeConn { serial })
            } else {
                Err(DbError::Transport("connect ECONNREFUSED".into()))
            }
        }

        async fn ping(&self, _conn: &FakeConn) -> Result<(), DbError> {
            if self.fail_next_ping.swap(false, Ordering::SeqCst) {
                Err(DbError::ConnectionLost("server closed the connection".into()))
            } else {
                Ok(())
            }
        }
    }

    fn config(mode: ConnectionMode) -> ManagerConfig {
        ManagerConfig {
            mode,
            retry_delay: Duration::from_secs(2),
            heartbeat: None,
        }
    }

    fn attempts(manager: &ConnectionManager<FakeConnector>) -> usize {
        manager.connector.attempts.load(Ordering::SeqCst)
    }

    async fn settle() {
        time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn starts_disconnected() {
        let (manager, _supervisor) =
            ConnectionManager::new(FakeConnector::default(), config(ConnectionMode::Reconnect));

        assert!(!manager.is_connected());
        assert!(matches!(manager.handle(), Err(DbError::Disconnected)));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_failed_connects_every_retry_delay() {
        let (manager, supervisor) = ConnectionManager::new(
            FakeConnector::scripted(&[false, false, true]),
            config(ConnectionMode::Reconnect),
        );
        tokio::spawn(supervisor.run());

        settle().await;
        assert_eq!(attempts(&manager), 1);
        assert!(!manager.is_connected());

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(attempts(&manager), 2);
        assert!(!manager.is_connected());

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(attempts(&manager), 3);
        assert!(manager.is_connected());
        assert_eq!(manager.handle().unwrap().serial, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn single_mode_makes_one_attempt() {
        let (manager, supervisor) = ConnectionManager::new(
            FakeConnector::scripted(&[false]),
            config(ConnectionMode::Single),
        );
        tokio::spawn(supervisor.run());

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(attempts(&manager), 1);
        assert!(matches!(manager.handle(), Err(DbError::Disconnected)));
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_after_loss() {
        let (manager, supervisor) =
            ConnectionManager::new(FakeConnector::default(), config(ConnectionMode::Reconnect));
        tokio::spawn(supervisor.run());
        settle().await;

        let first = manager.handle().unwrap();
        assert_eq!(first.serial, 1);

        manager.report(&first, &DbError::ConnectionLost("PROTOCOL_CONNECTION_LOST".into()));
        assert!(matches!(manager.handle(), Err(DbError::Disconnected)));

        settle().await;
        let second = manager.handle().unwrap();
        assert_eq!(second.serial, 2);
        assert_eq!(attempts(&manager), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn single_mode_gives_up_after_loss() {
        let (manager, supervisor) =
            ConnectionManager::new(FakeConnector::default(), config(ConnectionMode::Single));
        let task = tokio::spawn(supervisor.run());
        settle().await;

        let conn = manager.handle().unwrap();
        manager.report(&conn, &DbError::ConnectionLost("PROTOCOL_CONNECTION_LOST".into()));

        let ended = task.await.unwrap();
        assert!(matches!(ended, DbError::ConnectionLost(ref msg) if msg.contains("PROTOCOL_CONNECTION_LOST")));
        assert!(!manager.is_connected());
        assert_eq!(attempts(&manager), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn single_mode_connect_failure_keeps_running() {
        let (manager, supervisor) = ConnectionManager::new(
            FakeConnector::scripted(&[false]),
            config(ConnectionMode::Single),
        );
        let task = tokio::spawn(supervisor.run());

        time::sleep(Duration::from_secs(60)).await;
        assert!(!task.is_finished());
        assert!(!manager.is_connected());
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn stale_and_query_reports_are_ignored() {
        let (manager, supervisor) =
            ConnectionManager::new(FakeConnector::default(), config(ConnectionMode::Reconnect));
        tokio::spawn(supervisor.run());
        settle().await;

        let first = manager.handle().unwrap();
        manager.report(&first, &DbError::Sqlx(sqlx::Error::RowNotFound));
        settle().await;
        assert_eq!(manager.handle().unwrap().serial, 1);

        manager.report(&first, &DbError::ConnectionLost("gone".into()));
        settle().await;
        assert_eq!(manager.handle().unwrap().serial, 2);

        // A second report about the old handle must not drop the new one.
        manager.report(&first, &DbError::ConnectionLost("gone".into()));
        manager.report(&first, &DbError::Transport("late".into()));
        settle().await;
        assert_eq!(manager.handle().unwrap().serial, 2);
        assert_eq!(attempts(&manager), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_ends_supervisor() {
        let (manager, supervisor) =
            ConnectionManager::new(FakeConnector::default(), config(ConnectionMode::Reconnect));
        let task = tokio::spawn(supervisor.run());
        settle().await;

        let conn = manager.handle().unwrap();
        manager.report(&conn, &DbError::Transport("ER_NET_PACKETS_OUT_OF_ORDER".into()));

        let fatal = task.await.unwrap();
        assert!(matches!(fatal, DbError::Transport(ref msg) if msg.contains("OUT_OF_ORDER")));
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_detects_idle_loss() {
        let mut config = config(ConnectionMode::Reconnect);
        config.heartbeat = Some(Duration::from_secs(5));
        let (manager, supervisor) = ConnectionManager::new(FakeConnector::default(), config);
        tokio::spawn(supervisor.run());
        settle().await;
        assert_eq!(manager.handle().unwrap().serial, 1);

        manager.connector.fail_next_ping.store(true, Ordering::SeqCst);
        time::sleep(Duration::from_secs(6)).await;

        assert_eq!(manager.handle().unwrap().serial, 2);
    }

    #[test]
    fn parses_connection_mode() {
        assert_eq!("single".parse::<ConnectionMode>(), Ok(ConnectionMode::Single));
        assert_eq!("Reconnect".parse::<ConnectionMode>(), Ok(ConnectionMode::Reconnect));
        assert!("sometimes".parse::<ConnectionMode>().is_err());
        assert_eq!(ConnectionMode::default().to_string(), "reconnect");
    }
}
