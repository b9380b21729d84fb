use std::{net::SocketAddr, path::PathBuf, time::Duration};

use crate::common::LimitsConfig;
use crate::pool::{INITIAL_WORKERS_DEFAULT, MAX_WORKERS_DEFAULT, POLL_INTERVAL_DEFAULT};
use crate::{ConfigListenAddr, SocketConfig};

/// Default capacity of the connection queue
pub const QUEUE_CAPACITY_DEFAULT: usize = 4;

/// Duration of sleep after a failed `accept`
pub(crate) const ACCEPT_ERROR_SLEEP_DURATION: Duration = Duration::from_millis(25);

/// Represents the config parameters required to create a server.
///
/// # Example
///
/// ```
/// # use tiny_web::ServerConfig;
/// let cfg = ServerConfig { max_workers: 64, ..ServerConfig::default() };
/// ```
///
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The addresses to try to listen to.
    pub addr: ConfigListenAddr,

    /// Number of accepted connections buffered for the workers.
    /// The acceptor blocks while the queue is full.
    pub queue_capacity: usize,

    /// Workers started with the server
    pub initial_workers: usize,

    /// Hard maximum of workers, the pool never grows beyond
    pub max_workers: usize,

    /// Pause of the pool controller after a round without resizing
    pub controller_poll_interval: Duration,

    /// Document root of [`Server::tiny`](crate::Server::tiny)
    pub doc_root: PathBuf,

    /// Socket configuration
    /// See [SocketConfig]
    pub socket_config: SocketConfig,

    /// Limits for reading requests
    /// See [LimitsConfig]
    pub limits: LimitsConfig,

    /// Collect terminated CGI programs on `SIGCHLD`.
    ///
    /// Without this, an embedding program has to reap the children itself.
    pub reap_cgi_children: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: ConfigListenAddr::IP(vec![SocketAddr::from(([127, 0, 0, 1], 0))]),
            queue_capacity: QUEUE_CAPACITY_DEFAULT,
            initial_workers: INITIAL_WORKERS_DEFAULT,
            max_workers: MAX_WORKERS_DEFAULT,
            controller_poll_interval: POLL_INTERVAL_DEFAULT,
            doc_root: PathBuf::from("."),
            socket_config: SocketConfig::default(),
            limits: LimitsConfig::default(),
            reap_cgi_children: true,
        }
    }
}
