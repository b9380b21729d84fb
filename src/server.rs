//! [`Server`] wiring the acceptor, the connection queue and the worker pool

use std::{
    error::Error,
    net::ToSocketAddrs,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    thread,
};

use crate::connection_stream::ConnectionStream;
use crate::handler::TinyHandler;
use crate::pool::{PoolController, WorkerPool};
use crate::server_config::ServerConfig;
use crate::socket_listener::{ConfigListenAddr, ListenAddr, Listener};
use crate::util::BoundedQueue;
use crate::{acceptor, log, reaper, RequestHandler};

type ServerResult = Result<Server, Box<dyn Error + Send + Sync + 'static>>;

/// The main class of this library.
///
/// A newly-created `Server` immediately accepts connections. The acceptor inserts
/// them into a bounded queue, and a pool of workers, resized by a controller thread
/// between 1 and `max_workers`, serves one transaction per connection.
///
/// Dropping the `Server` stops accepting and stops the controller. Workers serve
/// the connections still queued and exit.
///
/// # Example
///
/// ```no_run
/// let server = tiny_web::Server::http("0.0.0.0:8000").unwrap();
/// println!("listening on {}", server.server_addr());
/// server.wait();
/// ```
pub struct Server {
    // should be false as long as the server exists
    close: Arc<AtomicBool>,

    // result of Listener::local_addr()
    listening_addr: ListenAddr,

    pool: Arc<WorkerPool<ConnectionStream>>,

    acceptor: Mutex<Option<thread::JoinHandle<()>>>,
    controller: Mutex<Option<thread::JoinHandle<()>>>,
}

// this trait is to make sure that Server implements Send and Sync
#[doc(hidden)]
#[allow(dead_code)]
trait SendSyncT: Send + Sync {}
#[doc(hidden)]
impl SendSyncT for Server {}

impl Server {
    /// Builds a new server that listens on the configured address and serves
    /// connections with `handler`.
    ///
    /// # Errors
    ///
    /// - `std::io::Error` when socket binding failed
    /// - `std::io::Error` when the server threads couldn't be spawned
    ///
    pub fn new<H>(config: &ServerConfig, handler: H) -> ServerResult
    where
        H: RequestHandler<ConnectionStream> + 'static,
    {
        let listener = config.addr.bind(&config.socket_config)?;
        Self::from_listener(listener, config, handler)
    }

    /// Builds a new server serving static files and CGI programs below
    /// `config.doc_root`.
    ///
    /// # Errors
    ///
    /// - see [`Server::new`]
    ///
    pub fn tiny(config: &ServerConfig) -> ServerResult {
        Self::new(
            config,
            TinyHandler::new(config.doc_root.clone(), config.limits),
        )
    }

    /// Shortcut for a file and CGI server of the current directory on a specific address.
    ///
    /// # Errors
    ///
    /// - `std::io::Error` when `addr` is no socket address
    /// - see [`Server::new`]
    ///
    #[inline]
    pub fn http<A>(addr: A) -> ServerResult
    where
        A: ToSocketAddrs,
    {
        Server::tiny(&ServerConfig {
            addr: ConfigListenAddr::from_socket_addrs(addr)?,
            ..ServerConfig::default()
        })
    }

    /// Shortcut for a file and CGI server of the current directory on a UNIX socket
    ///
    /// # Errors
    ///
    /// - see [`Server::new`]
    ///
    #[inline]
    pub fn http_unix(path: &Path) -> ServerResult {
        Server::tiny(&ServerConfig {
            addr: ConfigListenAddr::unix_from_path(path),
            ..ServerConfig::default()
        })
    }

    /// Builds a new server using the specified listener.
    ///
    /// This is useful if you've constructed the listener using some less usual method
    /// such as from systemd. For other cases, you probably want the `new()` function.
    /// `config.addr` is ignored.
    ///
    /// # Errors
    ///
    /// - `std::io::Error` when socket problem
    /// - `std::io::Error` when the server threads couldn't be spawned
    ///
    pub fn from_listener<L, H>(listener: L, config: &ServerConfig, handler: H) -> ServerResult
    where
        L: Into<Listener>,
        H: RequestHandler<ConnectionStream> + 'static,
    {
        let listener = listener.into();
        let local_addr = listener.local_addr()?;

        if config.reap_cgi_children && reaper::start()? {
            log::debug!("reaper started");
        }

        let queue = Arc::new(BoundedQueue::with_capacity(config.queue_capacity));
        let handler: Arc<dyn RequestHandler<ConnectionStream>> = Arc::new(handler);
        let pool = Arc::new(WorkerPool::new(
            Arc::clone(&queue),
            handler,
            config.initial_workers,
            config.max_workers,
        )?);

        let close = Arc::new(AtomicBool::new(false));

        let controller = match PoolController::new(Arc::clone(&pool), config.controller_poll_interval)
            .spawn(Arc::clone(&close))
        {
            Ok(jh) => jh,
            Err(err) => {
                queue.close();
                return Err(err.into());
            }
        };

        let acceptor = match acceptor::spawn(listener, Arc::clone(&queue), Arc::clone(&close)) {
            Ok(jh) => jh,
            Err(err) => {
                close.store(true, Ordering::Release);
                queue.close();
                let _ = controller.join();
                return Err(err.into());
            }
        };

        log::info!(
            "server listening on {local_addr} with {} worker(s), max {}",
            pool.numthread(),
            pool.max_workers()
        );

        Ok(Server {
            close,
            listening_addr: local_addr,
            pool,
            acceptor: Mutex::new(Some(acceptor)),
            controller: Mutex::new(Some(controller)),
        })
    }

    /// Returns the address the server is listening to.
    #[must_use]
    #[inline]
    pub fn server_addr(&self) -> ListenAddr {
        self.listening_addr.clone()
    }

    /// Number of serviced worker slots.
    #[must_use]
    #[inline]
    pub fn num_workers(&self) -> usize {
        self.pool.numthread()
    }

    /// Number of connections waiting for a worker.
    #[must_use]
    #[inline]
    pub fn queue_len(&self) -> usize {
        self.pool.queue().len()
    }

    /// The worker pool serving the connections.
    #[must_use]
    #[inline]
    pub fn pool(&self) -> &Arc<WorkerPool<ConnectionStream>> {
        &self.pool
    }

    /// `true` after [`shutdown`](Server::shutdown)
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.close.load(Ordering::Acquire)
    }

    /// Blocks until the acceptor exits, which happens after [`shutdown`](Server::shutdown).
    ///
    /// Returns immediately if another thread already waited.
    pub fn wait(&self) {
        let jh = self
            .acceptor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(jh) = jh {
            if jh.join().is_err() {
                log::error!("accept thread panicked");
            }
        }
    }

    /// Stops accepting connections and stops the pool controller.
    ///
    /// Connections already queued are still served, then the workers exit.
    pub fn shutdown(&self) {
        if self.close.swap(true, Ordering::AcqRel) {
            return;
        }
        log::info!("shutting down server on {}", self.listening_addr);

        // Connect briefly to ourselves to unblock the accept thread
        acceptor::unblock(&self.listening_addr);
        self.pool.queue().close();
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("listening_addr", &self.listening_addr)
            .field("pool", &self.pool)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown();

        let controller = self
            .controller
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(jh) = controller {
            let _ = jh.join();
        }
        self.wait();
    }
}
