use std::{
    io::{Read, Result as IoResult, Write},
    net::{Shutdown, SocketAddr, TcpStream},
    os::{fd::OwnedFd, unix::net::UnixStream},
    process::Stdio,
};

/// An accepted client connection. Either a [`TcpStream`] or a [`UnixStream`].
///
/// This is the item type of the connection queue, workers own it while serving
/// and the connection is closed when it is dropped.
#[derive(Debug)]
pub enum ConnectionStream {
    /// Connection accepted on an IP listener
    Tcp(TcpStream),
    /// Connection accepted on a Unix socket listener
    Unix(UnixStream),
}

impl ConnectionStream {
    /// Gets the peer's address. Some for TCP, None for Unix sockets.
    ///
    /// # Errors
    ///
    /// - `std::io::Error` when the socket is no longer connected
    ///
    pub fn peer_addr(&self) -> IoResult<Option<SocketAddr>> {
        match self {
            Self::Tcp(s) => s.peer_addr().map(Some),
            Self::Unix(_) => Ok(None),
        }
    }

    pub(crate) fn shutdown(&self, how: Shutdown) -> IoResult<()> {
        match self {
            Self::Tcp(s) => s.shutdown(how),
            Self::Unix(s) => s.shutdown(how),
        }
    }

    /// Duplicates the underlying descriptor so a child process can write to the client.
    ///
    /// The connection stays open until both this stream and the child's copy are closed.
    pub(crate) fn try_clone_stdio(&self) -> IoResult<Stdio> {
        let fd: OwnedFd = match self {
            Self::Tcp(s) => s.try_clone()?.into(),
            Self::Unix(s) => s.try_clone()?.into(),
        };
        Ok(Stdio::from(fd))
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        match self {
            Self::Tcp(s) => s.read(buf),
            Self::Unix(s) => s.read(buf),
        }
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        match self {
            Self::Tcp(s) => s.write(buf),
            Self::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> IoResult<()> {
        match self {
            Self::Tcp(s) => s.flush(),
            Self::Unix(s) => s.flush(),
        }
    }
}

impl From<TcpStream> for ConnectionStream {
    fn from(s: TcpStream) -> Self {
        Self::Tcp(s)
    }
}

impl From<UnixStream> for ConnectionStream {
    fn from(s: UnixStream) -> Self {
        Self::Unix(s)
    }
}
