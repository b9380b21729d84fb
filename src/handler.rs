use std::{
    ffi::OsStr,
    fs::{self, File, Metadata},
    io::{self, BufReader, ErrorKind as IoErrorKind, Read},
    net::Shutdown,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use crate::common::{content_type, LimitsConfig, Method};
use crate::connection_stream::ConnectionStream;
use crate::request::{read_request, ClientError, ReadError, Target};
use crate::{cgi, log, response, RequestHandler};

/// Read permission of the owner
const MODE_OWNER_READ: u32 = 0o400;
/// Execute permission of the owner
const MODE_OWNER_EXEC: u32 = 0o100;

/// Serves one HTTP/1.0 transaction per connection: static files and CGI programs
/// below a document root.
///
/// # Example
///
/// ```no_run
/// # use tiny_web::{LimitsConfig, Server, ServerConfig, TinyHandler};
/// let handler = TinyHandler::new("/srv/www", LimitsConfig::default());
/// let server = Server::new(&ServerConfig::default(), handler).unwrap();
/// server.wait();
/// ```
#[derive(Debug, Clone)]
pub struct TinyHandler {
    doc_root: PathBuf,
    limits: LimitsConfig,
}

impl TinyHandler {
    /// Handler for files below `doc_root`
    #[must_use]
    pub fn new<P: Into<PathBuf>>(doc_root: P, limits: LimitsConfig) -> Self {
        Self {
            doc_root: doc_root.into(),
            limits,
        }
    }

    /// Directory the request URIs are resolved against
    #[must_use]
    pub fn doc_root(&self) -> &Path {
        &self.doc_root
    }

    fn transaction(&self, conn: &mut ConnectionStream) -> Result<(), ReadError> {
        let request = {
            let mut reader = BufReader::new(&mut *conn);
            match read_request(&mut reader, &self.limits)? {
                Some(request) => request,
                None => {
                    log::debug!("connection closed without request");
                    return Ok(());
                }
            }
        };

        let target = request.target(&self.doc_root)?;
        let metadata =
            fs::metadata(target.filename()).map_err(|_| not_found(target.filename()))?;

        match target {
            Target::Static { filename } => {
                if !metadata.is_file() || !has_mode(&metadata, MODE_OWNER_READ) {
                    return Err(ClientError::Forbidden(filename).into());
                }
                serve_static(conn, &filename, &metadata, request.method())
            }
            Target::Dynamic { filename, cgiargs } => {
                if !metadata.is_file() || !has_mode(&metadata, MODE_OWNER_EXEC) {
                    return Err(ClientError::NotExecutable(filename).into());
                }
                serve_dynamic(conn, &filename, &cgiargs, request.method())
            }
        }
    }

    /// Sends the error page and closes the sending side, then drains what the
    /// client still sends so closing doesn't reset the connection.
    fn reject(&self, conn: &mut ConnectionStream, err: &ClientError) {
        log::info!("{err}");
        if let Err(err) = response::write_error(conn, err) {
            log::debug!("error page not sent: {err}");
            return;
        }
        let _ = conn.shutdown(Shutdown::Write);
        let limit = u64::try_from(self.limits.header_max_size).unwrap_or(u64::MAX);
        let _ = io::copy(&mut conn.by_ref().take(limit), &mut io::sink());
    }
}

impl RequestHandler<ConnectionStream> for TinyHandler {
    fn serve(&self, conn: &mut ConnectionStream) {
        match self.transaction(conn) {
            Ok(()) => {}
            Err(ReadError::Client(err)) => self.reject(conn, &err),
            Err(ReadError::Io(err)) => {
                log::debug!("transaction aborted: {err}");
            }
        }
    }
}

fn not_found(filename: &Path) -> ClientError {
    ClientError::NotFound(filename.to_path_buf())
}

fn has_mode(metadata: &Metadata, mode: u32) -> bool {
    metadata.permissions().mode() & mode != 0
}

fn serve_static(
    conn: &mut ConnectionStream,
    filename: &Path,
    metadata: &Metadata,
    method: &Method,
) -> Result<(), ReadError> {
    let content_type = filename.file_name().map_or(content_type::CONTENT_TYPE_DEFAULT, |name| {
        content_type::from_filename(&name.to_string_lossy())
    });
    let file = if *method == Method::Head {
        None
    } else {
        Some(File::open(filename).map_err(|err| match err.kind() {
            IoErrorKind::NotFound => not_found(filename),
            _ => ClientError::Forbidden(filename.to_path_buf()),
        })?)
    };

    response::write_static_header(conn, metadata.len(), content_type)?;
    if let Some(file) = file {
        let _ = io::copy(&mut file.take(metadata.len()), conn)?;
    }
    Ok(())
}

fn serve_dynamic(
    conn: &mut ConnectionStream,
    filename: &Path,
    cgiargs: &OsStr,
    method: &Method,
) -> Result<(), ReadError> {
    response::write_cgi_prelude(conn)?;
    let stdout = conn.try_clone_stdio()?;
    match cgi::spawn(filename, cgiargs, method, stdout) {
        Ok(child) => {
            log::trace!("cgi child {} left to the reaper", child.id());
            drop(child);
            Ok(())
        }
        Err(err) => {
            log::warn!("cgi {} not started: {err}", filename.display());
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        io::{Read, Write},
        net::Shutdown,
        os::unix::{fs::PermissionsExt, net::UnixStream},
        path::Path,
    };

    use tempfile::TempDir;

    use super::TinyHandler;
    use crate::common::LimitsConfig;
    use crate::connection_stream::ConnectionStream;
    use crate::RequestHandler;

    fn doc_root() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("home.html"), "<p>home</p>").unwrap();
        fs::write(dir.path().join("godzilla.gif"), [0x47, 0x49, 0x46, 0x38]).unwrap();
        dir
    }

    fn set_mode(path: &Path, mode: u32) {
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    fn exchange(handler: &TinyHandler, request: &str) -> String {
        let (mut client, server) = UnixStream::pair().unwrap();
        client.write_all(request.as_bytes()).unwrap();
        client.shutdown(Shutdown::Write).unwrap();

        let mut conn = ConnectionStream::from(server);
        handler.serve(&mut conn);
        drop(conn);

        let mut out = Vec::new();
        let _ = client.read_to_end(&mut out).unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    fn handler(dir: &TempDir) -> TinyHandler {
        TinyHandler::new(dir.path(), LimitsConfig::default())
    }

    #[test]
    fn get_static_file_test() {
        let dir = doc_root();
        let out = exchange(&handler(&dir), "GET / HTTP/1.0\r\n\r\n");

        assert!(out.starts_with("HTTP/1.0 200 OK\r\nServer: Tiny Web Server\r\n"));
        assert!(out.contains("Content-length: 11\r\n"));
        assert!(out.contains("Content-type: text/html\r\n"));
        assert!(out.ends_with("\r\n\r\n<p>home</p>"));
    }

    #[test]
    fn head_has_no_body_test() {
        let dir = doc_root();
        let out = exchange(&handler(&dir), "HEAD /godzilla.gif HTTP/1.0\r\n\r\n");

        assert!(out.contains("Content-length: 4\r\n"));
        assert!(out.contains("Content-type: image/gif\r\n"));
        assert!(out.ends_with("\r\n\r\n"));
    }

    #[test]
    fn missing_file_test() {
        let dir = doc_root();
        let out = exchange(&handler(&dir), "GET /nope.html HTTP/1.0\r\n\r\n");

        assert!(out.starts_with("HTTP/1.0 404 Not found\r\n"));
        assert!(out.contains("Tiny couldn't find this file"));
        assert!(out.contains("nope.html"));
    }

    #[test]
    fn unreadable_file_is_forbidden_test() {
        let dir = doc_root();
        let secret = dir.path().join("secret.html");
        fs::write(&secret, "secret").unwrap();
        set_mode(&secret, 0o200);

        let out = exchange(&handler(&dir), "GET /secret.html HTTP/1.0\r\n\r\n");
        assert!(out.starts_with("HTTP/1.0 403 Forbidden\r\n"));
        assert!(out.contains("Tiny couldn't read the file"));
        assert!(!out.contains("secret\r\n"));
    }

    #[test]
    fn directory_is_forbidden_test() {
        let dir = doc_root();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let out = exchange(&handler(&dir), "GET /sub HTTP/1.0\r\n\r\n");
        assert!(out.starts_with("HTTP/1.0 403 Forbidden\r\n"));
    }

    #[test]
    fn unsupported_method_test() {
        let dir = doc_root();
        let out = exchange(&handler(&dir), "PUT / HTTP/1.0\r\n\r\n");

        assert!(out.starts_with("HTTP/1.0 501 Not Implemented\r\n"));
        assert!(out.contains("Tiny does not implement this method: PUT"));
    }

    #[test]
    fn cgi_program_test() {
        let dir = doc_root();
        fs::create_dir(dir.path().join("cgi-bin")).unwrap();
        let script = dir.path().join("cgi-bin").join("echo");
        fs::write(
            &script,
            "#!/bin/sh\nprintf 'Content-type: text/plain\\r\\n\\r\\n'\nprintf '%s %s' \"$REQUEST_METHOD\" \"$QUERY_STRING\"\n",
        )
        .unwrap();
        set_mode(&script, 0o755);

        let out = exchange(&handler(&dir), "GET /cgi-bin/echo?15&20 HTTP/1.0\r\n\r\n");
        assert!(out.starts_with("HTTP/1.0 200 OK\r\nServer: Tiny Web Server\r\n"));
        assert!(out.ends_with("Content-type: text/plain\r\n\r\nGET 15&20"));

        let out = exchange(
            &handler(&dir),
            "POST /cgi-bin/echo HTTP/1.0\r\nContent-Length: 5\r\n\r\na=123",
        );
        assert!(out.ends_with("\r\n\r\nPOST a=123"));
    }

    #[test]
    fn cgi_not_executable_test() {
        let dir = doc_root();
        fs::create_dir(dir.path().join("cgi-bin")).unwrap();
        let script = dir.path().join("cgi-bin").join("plain");
        fs::write(&script, "#!/bin/sh\necho hi\n").unwrap();
        set_mode(&script, 0o644);

        let out = exchange(&handler(&dir), "GET /cgi-bin/plain HTTP/1.0\r\n\r\n");
        assert!(out.starts_with("HTTP/1.0 403 Forbidden\r\n"));
        assert!(out.contains("Tiny couldn't run the CGI program"));
    }

    #[test]
    fn closed_without_request_test() {
        let dir = doc_root();
        assert!(exchange(&handler(&dir), "").is_empty());
    }
}
