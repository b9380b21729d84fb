#![allow(unused_crate_dependencies)]

use std::fs;
use std::io::{Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::UnixStream;

use tiny_web::{ConfigListenAddr, Server, ServerConfig};

#[allow(dead_code)]
mod support;

#[test]
fn get_home_page() {
    let root = support::doc_root();
    let server = support::tiny_server(root.path());

    let response = support::exchange(&server, b"GET / HTTP/1.0\r\n\r\n");
    let (head, body) = support::split_response(&response);

    assert!(head.starts_with("HTTP/1.0 200 OK\r\n"));
    assert!(head.contains("Server: Tiny Web Server\r\n"));
    assert!(head.contains("Date: "));
    assert!(head.contains(&format!("Content-length: {}\r\n", support::HOME_PAGE.len())));
    assert!(head.ends_with("Content-type: text/html"));
    assert_eq!(body, support::HOME_PAGE);
}

#[test]
fn head_sends_no_body() {
    let root = support::doc_root();
    let server = support::tiny_server(root.path());

    let response = support::exchange(&server, b"head /godzilla.gif HTTP/1.0\r\nHost: x\r\n\r\n");
    let (head, body) = support::split_response(&response);

    assert!(head.starts_with("HTTP/1.0 200 OK\r\n"));
    assert!(head.contains("Content-length: 8\r\n"));
    assert!(head.contains("Content-type: image/gif"));
    assert!(body.is_empty());
}

#[test]
fn missing_file_is_404() {
    let root = support::doc_root();
    let server = support::tiny_server(root.path());

    let response = support::exchange(&server, b"GET /missing.html HTTP/1.0\r\n\r\n");
    let (head, body) = support::split_response(&response);

    assert!(head.starts_with("HTTP/1.0 404 Not found\r\n"));
    assert!(head.contains("Content-type: text/html"));
    assert!(body.starts_with("<html><title>Tiny Error</title>"));
    assert!(body.contains("404: Not found\r\n"));
    assert!(body.contains("<p>Tiny couldn't find this file: "));
    assert!(body.contains("missing.html"));
}

#[test]
fn unreadable_file_is_403() {
    let root = support::doc_root();
    let secret = root.path().join("secret.txt");
    fs::write(&secret, "top secret").unwrap();
    fs::set_permissions(&secret, fs::Permissions::from_mode(0o200)).unwrap();
    let server = support::tiny_server(root.path());

    let response = support::exchange(&server, b"GET /secret.txt HTTP/1.0\r\n\r\n");

    assert!(response.starts_with("HTTP/1.0 403 Forbidden\r\n"));
    assert!(response.contains("Tiny couldn't read the file"));
    assert!(!response.contains("top secret"));
}

#[test]
fn unsupported_method_is_501() {
    let root = support::doc_root();
    let server = support::tiny_server(root.path());

    let response = support::exchange(
        &server,
        b"DELETE /home.html HTTP/1.0\r\nHost: localhost\r\nUser-Agent: test\r\n\r\n",
    );

    assert!(response.starts_with("HTTP/1.0 501 Not Implemented\r\n"));
    assert!(response.contains("Tiny does not implement this method: DELETE"));
    // nothing was deleted
    assert!(root.path().join("home.html").exists());
}

#[test]
fn malformed_request_is_400() {
    let root = support::doc_root();
    let server = support::tiny_server(root.path());

    let response = support::exchange(&server, b"GET\r\n\r\n");
    assert!(response.starts_with("HTTP/1.0 400 Bad Request\r\n"));

    let response = support::exchange(&server, b"GET /../../etc/passwd HTTP/1.0\r\n\r\n");
    assert!(response.starts_with("HTTP/1.0 400 Bad Request\r\n"));
}

#[test]
fn oversized_headers_are_431() {
    let root = support::doc_root();
    let server = Server::tiny(&ServerConfig {
        doc_root: root.path().to_path_buf(),
        limits: tiny_web::LimitsConfig {
            header_line_len: 64,
            ..tiny_web::LimitsConfig::default()
        },
        ..ServerConfig::default()
    })
    .unwrap();

    let request = format!("GET / HTTP/1.0\r\nX-Long: {}\r\n\r\n", "x".repeat(100));
    let response = support::exchange(&server, request.as_bytes());
    assert!(response.starts_with("HTTP/1.0 431 Request Header Fields Too Large\r\n"));
}

#[test]
fn client_closing_early_is_ignored() {
    let root = support::doc_root();
    let server = support::tiny_server(root.path());

    {
        let mut client = support::create_client(support::server_ip(&server));
        client.write_all(b"GET / HTTP/1.0\r\nHost:").unwrap();
    }

    // still serving
    let response = support::exchange(&server, b"GET / HTTP/1.0\r\n\r\n");
    assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
}

#[test]
fn serve_on_unix_socket() {
    let root = support::doc_root();
    let sock_dir = tempfile::tempdir().unwrap();
    let path = sock_dir.path().join("tiny.sock");

    let server = Server::tiny(&ServerConfig {
        addr: ConfigListenAddr::unix_from_path(&path),
        doc_root: root.path().to_path_buf(),
        ..ServerConfig::default()
    })
    .unwrap();

    let mut client = UnixStream::connect(&path).unwrap();
    client.write_all(b"GET /home.html HTTP/1.0\r\n\r\n").unwrap();
    let mut response = String::new();
    let _ = client.read_to_string(&mut response).unwrap();
    assert!(response.ends_with(support::HOME_PAGE));

    drop(server);
    assert!(!path.exists());
}
