use std::{io::Result as IoResult, net::TcpStream, os::unix::net::UnixStream, time::Duration};

/// Default backlog of the listening socket
#[cfg(feature = "socket2")]
pub const LISTEN_BACKLOG_DEFAULT: i32 = 1024;

/// Config for accepted sockets
///
/// The timeouts bound how long a worker can be stuck on a slow client, on TCP and
/// Unix sockets alike. `no_delay` applies to TCP only.
/// With enabled _socket2_ feature the listening socket can be configured too.
///
/// # Defaults
///
/// `backlog`: 1024
/// `linger`: None
/// `no_delay`: true
/// `read_timeout`: 10s
/// `write_timeout`: 10s
///
#[derive(Clone, Debug)]
pub struct SocketConfig {
    /// Length of the pending connection queue of the listening socket
    #[cfg(feature = "socket2")]
    pub backlog: i32,
    /// `SO_LINGER` accuracy is in seconds (below 1s is 0)
    #[cfg(feature = "socket2")]
    pub linger: Option<Duration>,
    /// `TCP_NODELAY` of accepted connections
    pub no_delay: bool,
    /// Read timeout of accepted connections, zero for none
    pub read_timeout: Duration,
    /// Write timeout of accepted connections, zero for none
    pub write_timeout: Duration,
}

impl SocketConfig {
    /// Applies the settings to an accepted connection.
    pub(crate) fn configure(&self, stream: &TcpStream) -> IoResult<()> {
        stream.set_nodelay(self.no_delay)?;
        if !self.read_timeout.is_zero() {
            stream.set_read_timeout(Some(self.read_timeout))?;
        }
        if !self.write_timeout.is_zero() {
            stream.set_write_timeout(Some(self.write_timeout))?;
        }
        Ok(())
    }

    /// Applies the timeouts to an accepted Unix socket connection.
    pub(crate) fn configure_unix(&self, stream: &UnixStream) -> IoResult<()> {
        if !self.read_timeout.is_zero() {
            stream.set_read_timeout(Some(self.read_timeout))?;
        }
        if !self.write_timeout.is_zero() {
            stream.set_write_timeout(Some(self.write_timeout))?;
        }
        Ok(())
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            #[cfg(feature = "socket2")]
            backlog: LISTEN_BACKLOG_DEFAULT,
            #[cfg(feature = "socket2")]
            linger: None,
            no_delay: true,
            read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{TcpListener, TcpStream};
    use std::time::Duration;

    use super::SocketConfig;

    #[test]
    fn configure_test() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let _client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (stream, _) = listener.accept().unwrap();

        let config = SocketConfig {
            read_timeout: Duration::from_millis(1500),
            write_timeout: Duration::ZERO,
            ..SocketConfig::default()
        };
        config.configure(&stream).unwrap();

        assert!(stream.nodelay().unwrap());
        assert_eq!(stream.read_timeout().unwrap(), Some(Duration::from_millis(1500)));
        assert_eq!(stream.write_timeout().unwrap(), None);
    }
}
