use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tiny_web::{Server, ServerConfig};

pub(crate) const HOME_PAGE: &str = "<html><body>home</body></html>";

/// Creates a document root with a home page, an image and two CGI programs.
///
/// `cgi-bin/adder` adds the two numbers of `QUERY_STRING` (`15&20`),
/// `cgi-bin/env` echoes `REQUEST_METHOD` and `QUERY_STRING`.
pub(crate) fn doc_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("home.html"), HOME_PAGE).unwrap();
    fs::write(dir.path().join("godzilla.gif"), b"GIF89a\x01\x00").unwrap();

    fs::create_dir(dir.path().join("cgi-bin")).unwrap();
    write_script(
        &dir.path().join("cgi-bin").join("adder"),
        "a=${QUERY_STRING%%&*}\nb=${QUERY_STRING##*&}\n\
         printf 'Content-type: text/plain\\r\\n\\r\\n'\nprintf '%s' \"$((a + b))\"\n",
    );
    write_script(
        &dir.path().join("cgi-bin").join("env"),
        "printf 'Content-type: text/plain\\r\\n\\r\\n'\n\
         printf '%s|%s' \"$REQUEST_METHOD\" \"$QUERY_STRING\"\n",
    );
    dir
}

/// Writes an executable shell script.
pub(crate) fn write_script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{body}")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Creates a file and CGI server of `root` on an ephemeral port.
pub(crate) fn tiny_server(root: &Path) -> Server {
    Server::tiny(&ServerConfig {
        addr: tiny_web::ConfigListenAddr::from_socket_addrs("127.0.0.1:0").unwrap(),
        doc_root: root.to_path_buf(),
        ..ServerConfig::default()
    })
    .unwrap()
}

pub(crate) fn server_ip(server: &Server) -> SocketAddr {
    server.server_addr().to_ip().unwrap()
}

/// Creates a [`TcpStream`] Client with read and write timeouts
pub(crate) fn create_client(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();
    stream
        .set_write_timeout(Some(Duration::from_secs(10)))
        .unwrap();
    stream
}

/// Sends `request` and reads the response until the server closes the connection.
pub(crate) fn exchange(server: &Server, request: &[u8]) -> String {
    let mut client = create_client(server_ip(server));
    client.write_all(request).unwrap();

    let mut out = Vec::new();
    let _ = client.read_to_end(&mut out).unwrap();
    String::from_utf8_lossy(&out).into_owned()
}

/// Splits a response at the empty line.
pub(crate) fn split_response(response: &str) -> (&str, &str) {
    response.split_once("\r\n\r\n").unwrap()
}

/// Polls `cond` until it holds, panics after 10 seconds.
pub(crate) fn wait_until<F: Fn() -> bool>(cond: F) {
    let now = Instant::now();
    while !cond() {
        assert!(now.elapsed() < Duration::from_secs(10), "condition timed out");
        thread::sleep(Duration::from_millis(5));
    }
}
