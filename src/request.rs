use std::{
    ffi::{OsStr, OsString},
    fmt,
    io::{BufRead, Error as IoError, ErrorKind as IoErrorKind, Read},
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
};

use ascii::{AsAsciiStr, AsciiChar, AsciiStr, AsciiString};

use crate::common::{LimitsConfig, Method, StatusCode};
use crate::log;

/// URIs containing this are served by running a CGI program
const CGI_MARKER: &str = "cgi-bin";
/// File served for URIs ending with `/`
const DEFAULT_PAGE: &str = "home.html";
const CONTENT_LENGTH_FIELD: &[u8] = b"Content-Length:";

/// A parsed HTTP/1.0 request: the request line and, for `POST`, the body.
///
/// Only the `Content-Length` header of a `POST` is interpreted, all other
/// headers are read and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    uri: AsciiString,
    version: Option<AsciiString>,
    body: Vec<u8>,
}

impl Request {
    /// Requested method
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Requested URI as sent by the client
    #[must_use]
    pub fn uri(&self) -> &str {
        self.uri.as_str()
    }

    /// Version string of the request line, `None` if the client omitted it
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref().map(AsciiStr::as_str)
    }

    /// Bytes read as `POST` body, empty for other methods
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Maps the request to the file or CGI program below `doc_root`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::BadRequest`] when the URI leaves the document root
    ///
    pub fn target(&self, doc_root: &Path) -> Result<Target, ClientError> {
        parse_uri(self.uri(), &self.method, doc_root, &self.body)
    }
}

/// What a request resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// File sent as it is
    Static {
        /// Path of the file
        filename: PathBuf,
    },
    /// Program run through CGI
    Dynamic {
        /// Path of the program
        filename: PathBuf,
        /// Arguments passed as `QUERY_STRING`, the raw bytes the client sent
        cgiargs: OsString,
    },
}

impl Target {
    /// Path of the file or program
    #[must_use]
    pub fn filename(&self) -> &Path {
        match self {
            Self::Static { filename } | Self::Dynamic { filename, .. } => filename.as_path(),
        }
    }
}

/// Request the server refuses to serve. Answered with an error page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Request line could not be parsed, or the URI is not below the document root
    BadRequest(String),
    /// `POST` body larger than allowed, with the announced length
    BodyTooLarge(usize),
    /// Static target is no regular file or not readable by the owner
    Forbidden(PathBuf),
    /// Request line or headers larger than allowed
    HeaderTooLarge,
    /// CGI target is no regular file or not executable by the owner
    NotExecutable(PathBuf),
    /// Target doesn't exist
    NotFound(PathBuf),
    /// Method other than `GET`, `HEAD` or `POST`
    NotImplemented(Method),
}

impl ClientError {
    /// Status code of the error response
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::BodyTooLarge(_) => StatusCode::CONTENT_TOO_LARGE,
            Self::Forbidden(_) | Self::NotExecutable(_) => StatusCode::FORBIDDEN,
            Self::HeaderTooLarge => StatusCode::HEADER_FIELDS_TOO_LARGE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
        }
    }

    /// Explanation shown on the error page
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "Tiny couldn't parse the request",
            Self::BodyTooLarge(_) => "Tiny couldn't accept the request body",
            Self::Forbidden(_) => "Tiny couldn't read the file",
            Self::HeaderTooLarge => "Tiny couldn't read the request headers",
            Self::NotExecutable(_) => "Tiny couldn't run the CGI program",
            Self::NotFound(_) => "Tiny couldn't find this file",
            Self::NotImplemented(_) => "Tiny does not implement this method",
        }
    }

    /// What caused the error: the method, the file name or the offending input
    #[must_use]
    pub fn cause(&self) -> String {
        match self {
            Self::BadRequest(cause) => cause.clone(),
            Self::BodyTooLarge(len) => len.to_string(),
            Self::Forbidden(path) | Self::NotExecutable(path) | Self::NotFound(path) => {
                path.display().to_string()
            }
            Self::HeaderTooLarge => String::from("headers"),
            Self::NotImplemented(method) => method.to_string(),
        }
    }
}

impl std::error::Error for ClientError {}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} ({})",
            self.status(),
            self.status().default_reason_phrase(),
            self.message(),
            self.cause()
        )
    }
}

/// Error that can happen when reading a request.
#[derive(Debug)]
pub enum ReadError {
    /// The client sent something the server answers with an error page
    Client(ClientError),
    /// Reading from the connection failed
    Io(IoError),
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Client(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client(err) => err.fmt(f),
            Self::Io(err) => err.fmt(f),
        }
    }
}

impl From<IoError> for ReadError {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl From<ClientError> for ReadError {
    fn from(err: ClientError) -> Self {
        Self::Client(err)
    }
}

/// Reads one request from `reader`.
///
/// Returns `Ok(None)` if the client closed the connection before sending a request line.
/// Unsupported methods are rejected after the headers were consumed.
///
/// # Errors
///
/// - [`ReadError::Client`] for malformed or oversized requests and unsupported methods
/// - [`ReadError::Io`] when the connection fails or ends in the middle of the request
///
pub fn read_request<R: BufRead>(
    reader: &mut R,
    limits: &LimitsConfig,
) -> Result<Option<Request>, ReadError> {
    let mut header_limit_rest = limits.header_max_size;

    let Some(line) = read_line(reader, limits.header_line_len)? else {
        return Ok(None);
    };
    header_limit_rest = header_limit_rest
        .checked_sub(line.len())
        .ok_or(ClientError::HeaderTooLarge)?;

    let line = AsciiString::from_ascii(line)
        .map_err(|_| ClientError::BadRequest(String::from("request line no ascii")))?;
    let (method, uri, version) = parse_request_line(line.trim())?;
    log::debug!("{method} {uri}");

    let mut content_length = None;
    loop {
        let line = read_line(reader, limits.header_line_len)?.ok_or_else(|| {
            IoError::new(IoErrorKind::UnexpectedEof, "connection closed in headers")
        })?;
        header_limit_rest = header_limit_rest
            .checked_sub(line.len())
            .ok_or(ClientError::HeaderTooLarge)?;

        if line.is_empty() {
            break;
        }

        if method == Method::Post {
            if let Some(len) = parse_content_length(&line)? {
                content_length = Some(len);
            }
        }
    }

    if !method.is_supported() {
        return Err(ClientError::NotImplemented(method).into());
    }

    let mut body = Vec::new();
    if let Some(len) = content_length {
        if len > limits.content_max_size {
            return Err(ClientError::BodyTooLarge(len).into());
        }
        body.resize(len, 0);
        reader.read_exact(&mut body)?;
    }

    Ok(Some(Request {
        method,
        uri,
        version,
        body,
    }))
}

/// Maps `uri` to a [`Target`] below `doc_root`.
///
/// URIs containing `cgi-bin` are dynamic. For `GET` and `HEAD` the part after the
/// first `?` becomes the CGI arguments, for `POST` the arguments are `post_args`
/// and the URI is used as it is. Static URIs ending with `/` get `home.html` appended.
///
/// # Errors
///
/// - [`ClientError::BadRequest`] when `uri` doesn't start with `/` or has a `..` segment
///
pub fn parse_uri(
    uri: &str,
    method: &Method,
    doc_root: &Path,
    post_args: &[u8],
) -> Result<Target, ClientError> {
    if !uri.starts_with('/') || uri.split('/').any(|segment| segment == "..") {
        return Err(ClientError::BadRequest(uri.to_owned()));
    }

    if !uri.contains(CGI_MARKER) {
        let mut filename = below(doc_root, uri);
        if uri.ends_with('/') {
            filename.push(DEFAULT_PAGE);
        }
        return Ok(Target::Static {
            filename: filename.into(),
        });
    }

    let (path, cgiargs) = match method {
        Method::Post => (uri, post_args),
        _ => uri
            .split_once('?')
            .map_or((uri, &[][..]), |(path, query)| (path, query.as_bytes())),
    };

    Ok(Target::Dynamic {
        filename: below(doc_root, path).into(),
        cgiargs: OsStr::from_bytes(cgiargs).to_owned(),
    })
}

/// Concatenates `doc_root` and `uri`, so `.` and `/x` become `./x`.
fn below(doc_root: &Path, uri: &str) -> OsString {
    let mut filename = doc_root.as_os_str().to_owned();
    filename.push(uri);
    filename
}

/// Parses the request line of the request.
/// eg. GET /hello HTTP/1.0
fn parse_request_line(
    line: &AsciiStr,
) -> Result<(Method, AsciiString, Option<AsciiString>), ClientError> {
    let mut parts = line
        .split(AsciiChar::Space)
        .filter(|part| !part.is_empty());

    let method = parts.next().map(|m| Method::from(m.as_bytes()));
    let uri = parts.next().map(ToOwned::to_owned);
    let version = parts.next().map(ToOwned::to_owned);

    method
        .zip(uri)
        .map(|(method, uri)| (method, uri, version))
        .ok_or_else(|| ClientError::BadRequest(line.to_string()))
}

/// `Some(len)` if `line` is a `Content-Length` header, matched case-insensitively.
fn parse_content_length(line: &[u8]) -> Result<Option<usize>, ClientError> {
    if line.len() < CONTENT_LENGTH_FIELD.len()
        || !line[..CONTENT_LENGTH_FIELD.len()].eq_ignore_ascii_case(CONTENT_LENGTH_FIELD)
    {
        return Ok(None);
    }

    line[CONTENT_LENGTH_FIELD.len()..]
        .as_ascii_str()
        .ok()
        .and_then(|value| value.trim().as_str().parse::<usize>().ok())
        .map(Some)
        .ok_or_else(|| ClientError::BadRequest(String::from_utf8_lossy(line).into_owned()))
}

/// Reads the next line from `reader` without its line ending.
///
/// Accepts `CRLF` and bare `LF`. Returns `None` on end of stream before any byte.
fn read_line<R: BufRead>(reader: &mut R, max_len: usize) -> Result<Option<Vec<u8>>, ReadError> {
    let mut line = Vec::new();
    // room for CRLF
    let limit = u64::try_from(max_len.saturating_add(2)).unwrap_or(u64::MAX);
    let _ = reader.by_ref().take(limit).read_until(b'\n', &mut line)?;

    if line.is_empty() {
        return Ok(None);
    }
    if line.last() != Some(&b'\n') {
        if line.len() > max_len {
            return Err(ClientError::HeaderTooLarge.into());
        }
        log::debug!("unexpected connection abort");
        return Err(IoError::new(IoErrorKind::UnexpectedEof, "unexpected connection abort").into());
    }

    let _ = line.pop();
    if line.last() == Some(&b'\r') {
        let _ = line.pop();
    }
    if line.len() > max_len {
        return Err(ClientError::HeaderTooLarge.into());
    }

    Ok(Some(line))
}
