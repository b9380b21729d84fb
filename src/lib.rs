//! # Tiny web server
//!
//! A minimal HTTP/1.0 server for static files and CGI programs, built around a
//! pre-threaded worker pool that resizes itself with the load.
//!
//! ## Dispatch
//!
//! One acceptor thread inserts every accepted connection into a [`BoundedQueue`].
//! Workers of a [`WorkerPool`] remove connections from the queue and hand each one
//! to a [`RequestHandler`]. A [`PoolController`] samples the queue: while it is full
//! the pool doubles, up to `max_workers`, and while it is empty the pool halves, down
//! to a single worker. Workers are cancelled only between two connections, never
//! while serving one.
//!
//! ## Creating the server
//!
//! The easiest way to create a server is to call [`Server::http()`], which serves the
//! current directory with a [`TinyHandler`].
//!
//! ```no_run
//! let server = tiny_web::Server::http("0.0.0.0:8000").unwrap();
//! server.wait();
//! ```
//!
//! URIs containing `cgi-bin` run the named program with `QUERY_STRING` and
//! `REQUEST_METHOD` set and its standard output connected to the client. Everything
//! else is sent as a file, `/` maps to `home.html`.
//!
//! ## Custom handling
//!
//! Any [`RequestHandler`] can serve the connections, for example a closure:
//!
//! ```no_run
//! # use std::io::Write;
//! use tiny_web::{ConnectionStream, FnRequestHandler, Server, ServerConfig};
//!
//! let config = ServerConfig { max_workers: 64, ..ServerConfig::default() };
//! let server = Server::new(
//!     &config,
//!     FnRequestHandler(|conn: &mut ConnectionStream| {
//!         let _ = conn.write_all(b"HTTP/1.0 200 OK\r\n\r\nhello");
//!     }),
//! )
//! .unwrap();
//! # drop(server);
//! ```

pub use common::{content_type, limits, LimitsConfig, Method, StatusCode};
pub use connection_stream::ConnectionStream;
pub use handler::TinyHandler;
pub use pool::{PoolController, QueuePressure, Resize, SlotState, WorkerPool, WorkerSlot};
pub use request::{parse_uri, read_request, ClientError, ReadError, Request, Target};
pub use request_handler::{FnRequestHandler, RequestHandler};
pub use server::Server;
pub use server_config::{ServerConfig, QUEUE_CAPACITY_DEFAULT};
pub use socket_config::SocketConfig;
pub use socket_listener::{ConfigListenAddr, ListenAddr, Listener};
pub use util::BoundedQueue;

mod acceptor;
pub mod cgi;
mod common;
mod connection_stream;
mod handler;
mod log;
pub mod pool;
pub mod reaper;
mod request;
mod request_handler;
pub mod response;
mod server;
mod server_config;
mod socket_config;
mod socket_listener;
mod util;

// used by the `tiny` binary only
#[cfg(feature = "cli")]
use clap as _;
#[cfg(feature = "cli")]
use env_logger as _;
