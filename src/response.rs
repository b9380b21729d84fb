//! Response writers. Every response is `HTTP/1.0` and the connection is closed after it.

use std::{
    io::{Result as IoResult, Write},
    time::SystemTime,
};

use httpdate::HttpDate;

use crate::common::StatusCode;
use crate::request::ClientError;

/// Value of the `Server` header
pub const SERVER_NAME: &str = "Tiny Web Server";

fn write_status_line<W: Write>(writer: &mut W, status: StatusCode) -> IoResult<()> {
    write!(
        writer,
        "HTTP/1.0 {} {}\r\nServer: {SERVER_NAME}\r\nDate: {}\r\n",
        status.0,
        status.default_reason_phrase(),
        HttpDate::from(SystemTime::now())
    )
}

/// Writes the header block of a static file response.
///
/// The body follows directly, or nothing for `HEAD`.
///
/// # Errors
///
/// - `std::io::Error` when writing to the client fails
///
pub fn write_static_header<W: Write>(
    writer: &mut W,
    content_length: u64,
    content_type: &str,
) -> IoResult<()> {
    write_status_line(writer, StatusCode::OK)?;
    write!(
        writer,
        "Content-length: {content_length}\r\nContent-type: {content_type}\r\n\r\n"
    )
}

/// Writes the first part of a CGI response.
///
/// The CGI program writes the remaining headers and the body itself.
///
/// # Errors
///
/// - `std::io::Error` when writing to the client fails
///
pub fn write_cgi_prelude<W: Write>(writer: &mut W) -> IoResult<()> {
    write_status_line(writer, StatusCode::OK)?;
    writer.flush()
}

/// Writes the HTML error page for `err`.
///
/// # Errors
///
/// - `std::io::Error` when writing to the client fails
///
pub fn write_error<W: Write>(writer: &mut W, err: &ClientError) -> IoResult<()> {
    let status = err.status();
    let short = status.default_reason_phrase();

    let body = format!(
        "<html><title>Tiny Error</title><body bgcolor=ffffff>\r\n\
         {}: {short}\r\n\
         <p>{}: {}\r\n\
         <hr><em>The Tiny Web server</em>\r\n",
        status.0,
        err.message(),
        escape_html(&err.cause())
    );

    write_status_line(writer, status)?;
    write!(
        writer,
        "Content-type: text/html\r\nContent-length: {}\r\n\r\n{body}",
        body.len()
    )?;
    writer.flush()
}

/// The cause may echo the request URI back, so it is escaped.
fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
