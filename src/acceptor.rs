//! Accept loop feeding the connection queue

use std::{
    io::Result as IoResult,
    net::{Shutdown, TcpStream},
    os::unix::net::UnixStream,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use crate::connection_stream::ConnectionStream;
use crate::log;
use crate::server_config::ACCEPT_ERROR_SLEEP_DURATION;
use crate::socket_listener::{ListenAddr, Listener};
use crate::util::BoundedQueue;

/// Starts the thread accepting connections on `listener` until `close` is set.
///
/// Every accepted connection is inserted into `queue`, blocking while it is full.
pub(crate) fn spawn(
    listener: Listener,
    queue: Arc<BoundedQueue<ConnectionStream>>,
    close: Arc<AtomicBool>,
) -> IoResult<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name(String::from("acceptor"))
        .spawn(move || run(&listener, &queue, &close))
}

fn run(listener: &Listener, queue: &BoundedQueue<ConnectionStream>, close: &AtomicBool) {
    log::debug!("running accept thread");

    while !close.load(Ordering::Acquire) {
        match listener.accept() {
            Ok(conn) => {
                // woken up by `unblock`
                if close.load(Ordering::Acquire) {
                    break;
                }
                if queue.insert(conn).is_err() {
                    log::debug!("queue closed, connection dropped");
                    break;
                }
            }
            Err(err) => {
                log::error!("error on connection accept: {err:?}");
                #[cfg(not(feature = "log"))]
                eprintln!("error on connection accept: {err:?}");
                thread::sleep(ACCEPT_ERROR_SLEEP_DURATION);
            }
        }
    }

    log::debug!("terminating accept thread");
}

/// Connects briefly to `addr` so a thread blocked in `accept` sees the close flag.
///
/// Unix socket files are removed afterwards.
pub(crate) fn unblock(addr: &ListenAddr) {
    match addr {
        ListenAddr::IP(addr) => {
            let _ = TcpStream::connect(addr)
                .map(ConnectionStream::from)
                .and_then(|stream| stream.shutdown(Shutdown::Both));
        }
        ListenAddr::Unix(addr) => {
            if let Some(path) = addr.as_pathname() {
                let _ = UnixStream::connect(path)
                    .map(ConnectionStream::from)
                    .and_then(|stream| stream.shutdown(Shutdown::Both));
                let _ = std::fs::remove_file(path);
            }
        }
    }
}
