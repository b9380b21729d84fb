//! Abstractions of Tcp and Unix socket types

use std::{
    fmt,
    io::Result as IoResult,
    net::{SocketAddr, TcpListener, ToSocketAddrs},
    os::unix::net as unix_net,
    path::PathBuf,
};

use crate::connection_stream::ConnectionStream;
use crate::log;
use crate::socket_config::SocketConfig;

/// Unified listener. Either a [`TcpListener`] or [`std::os::unix::net::UnixListener`]
#[derive(Debug)]
pub enum Listener {
    /// [TcpListener] socket with the [SocketConfig] for accepted connections
    Tcp(TcpListener, SocketConfig),
    /// [unix_net::UnixListener] socket with the [SocketConfig] for accepted connections
    Unix(unix_net::UnixListener, SocketConfig),
}

impl Listener {
    pub(crate) fn local_addr(&self) -> IoResult<ListenAddr> {
        match self {
            Self::Tcp(l, _) => l.local_addr().map(ListenAddr::from),
            Self::Unix(l, _) => l.local_addr().map(ListenAddr::from),
        }
    }

    /// Blocks until the next connection arrives.
    pub(crate) fn accept(&self) -> IoResult<ConnectionStream> {
        match self {
            Self::Tcp(l, cfg) => {
                let (stream, addr) = l.accept()?;
                log::trace!("accepted connection from {addr}");
                if let Err(err) = cfg.configure(&stream) {
                    log::warn!("socket config fail: {err:?}");
                }
                Ok(ConnectionStream::from(stream))
            }
            Self::Unix(l, cfg) => {
                let (stream, _) = l.accept()?;
                if let Err(err) = cfg.configure_unix(&stream) {
                    log::warn!("socket config fail: {err:?}");
                }
                Ok(ConnectionStream::from(stream))
            }
        }
    }
}

impl From<(TcpListener, SocketConfig)> for Listener {
    fn from((s, cfg): (TcpListener, SocketConfig)) -> Self {
        Self::Tcp(s, cfg)
    }
}

impl From<(unix_net::UnixListener, SocketConfig)> for Listener {
    fn from((s, cfg): (unix_net::UnixListener, SocketConfig)) -> Self {
        Self::Unix(s, cfg)
    }
}

impl From<unix_net::UnixListener> for Listener {
    fn from(s: unix_net::UnixListener) -> Self {
        Self::Unix(s, SocketConfig::default())
    }
}

/// Address of configuration
///
/// Either a `Vec` of [`SocketAddr`] tried in order, or the path of a Unix socket.
#[derive(Debug, Clone)]
pub enum ConfigListenAddr {
    /// [SocketAddr]s for IP net
    IP(Vec<SocketAddr>),
    /// [PathBuf] for `Unix` socket
    Unix(PathBuf),
}

impl ConfigListenAddr {
    /// Create [`ConfigListenAddr`] from `IP` addresses
    ///
    /// # Errors
    ///
    /// - `std::io::Error` when `addrs` are no socket addresses
    ///
    pub fn from_socket_addrs<A: ToSocketAddrs>(addrs: A) -> IoResult<Self> {
        addrs.to_socket_addrs().map(|it| Self::IP(it.collect()))
    }

    /// Create [`ConfigListenAddr`] listening on every interface at `port`
    #[must_use]
    pub fn from_port(port: u16) -> Self {
        Self::IP(vec![SocketAddr::from(([0, 0, 0, 0], port))])
    }

    /// Create [`ConfigListenAddr`] from `path`
    pub fn unix_from_path<P: Into<PathBuf>>(path: P) -> Self {
        Self::Unix(path.into())
    }

    /// Binds the listening socket.
    pub(crate) fn bind(&self, config: &SocketConfig) -> IoResult<Listener> {
        match self {
            Self::IP(addresses) => {
                log::debug!("addresses: {addresses:?}");
                bind_tcp(addresses, config).map(|l| Listener::Tcp(l, config.clone()))
            }
            Self::Unix(path) => {
                unix_net::UnixListener::bind(path).map(|l| Listener::Unix(l, config.clone()))
            }
        }
    }
}

#[cfg(not(feature = "socket2"))]
fn bind_tcp(addresses: &[SocketAddr], _config: &SocketConfig) -> IoResult<TcpListener> {
    TcpListener::bind(addresses)
}

/// Tries `addresses` in order, the first one that binds and listens wins.
#[cfg(feature = "socket2")]
fn bind_tcp(addresses: &[SocketAddr], config: &SocketConfig) -> IoResult<TcpListener> {
    use socket2::{Domain, Socket, Type};

    let mut last_err = None;

    for address in addresses {
        let socket = Socket::new(Domain::for_address(*address), Type::STREAM, None)?;
        socket.set_reuse_address(true)?;
        socket.set_linger(config.linger)?;

        match socket
            .bind(&(*address).into())
            .and_then(|()| socket.listen(config.backlog))
        {
            Ok(()) => return Ok(socket.into()),
            Err(err) => {
                log::debug!("bind {address} fail: {err:?}");
                last_err = Some(err);
            }
        }
    }

    let err = last_err.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "could not resolve to any addresses",
        )
    });
    log::error!("socket bind fail: {err:?}");
    Err(err)
}

/// Unified listen socket address. Either a [`SocketAddr`] or [`std::os::unix::net::SocketAddr`].
#[derive(Debug, Clone)]
pub enum ListenAddr {
    /// [SocketAddr] for IP net
    IP(SocketAddr),
    /// Unix [unix_net::SocketAddr]
    Unix(unix_net::SocketAddr),
}

impl ListenAddr {
    /// Get [`SocketAddr`] if it is an `IP` else `None`
    #[must_use]
    pub fn to_ip(self) -> Option<SocketAddr> {
        match self {
            Self::IP(s) => Some(s),
            Self::Unix(_) => None,
        }
    }

    /// Gets the Unix socket address.
    #[must_use]
    pub fn to_unix(self) -> Option<unix_net::SocketAddr> {
        match self {
            Self::IP(_) => None,
            Self::Unix(s) => Some(s),
        }
    }
}

impl From<SocketAddr> for ListenAddr {
    fn from(s: SocketAddr) -> Self {
        Self::IP(s)
    }
}

impl From<unix_net::SocketAddr> for ListenAddr {
    fn from(s: unix_net::SocketAddr) -> Self {
        Self::Unix(s)
    }
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IP(s) => fmt::Display::fmt(s, f),
            Self::Unix(s) => match s.as_pathname() {
                Some(path) => fmt::Display::fmt(&path.display(), f),
                None => fmt::Debug::fmt(s, f),
            },
        }
    }
}
