//! Starting CGI programs

use std::{
    ffi::OsStr,
    io::Result as IoResult,
    path::Path,
    process::{Child, Command, Stdio},
    thread,
    time::Duration,
};

use nix::errno::Errno;

use crate::common::Method;
use crate::log;

/// Attempts while the program file is still open for writing somewhere
const SPAWN_ATTEMPTS: u32 = 5;
const SPAWN_RETRY_SLEEP: Duration = Duration::from_millis(10);

/// Environment variable holding the CGI arguments
pub const QUERY_STRING: &str = "QUERY_STRING";
/// Environment variable holding the request method
pub const REQUEST_METHOD: &str = "REQUEST_METHOD";

/// Starts the CGI program `filename` with its standard output bound to `stdout`.
///
/// The program gets no arguments, the server's environment plus
/// `QUERY_STRING` and `REQUEST_METHOD`, and an empty standard input.
/// `SIGPIPE` has its default disposition in the child.
///
/// The returned [`Child`] is not waited on by the server. Terminated programs are
/// collected by the [`reaper`](crate::reaper).
///
/// A program that was just written may still be open in a concurrently forked
/// process (`ETXTBSY`), this is retried a few times.
///
/// # Errors
///
/// - `std::io::Error` when the program couldn't be started
///
pub fn spawn(
    filename: &Path,
    cgiargs: &OsStr,
    method: &Method,
    stdout: Stdio,
) -> IoResult<Child> {
    let mut cmd = Command::new(filename);
    let _ = cmd
        .env(QUERY_STRING, cgiargs)
        .env(REQUEST_METHOD, method.as_str())
        .stdin(Stdio::null())
        .stdout(stdout);

    let mut attempt = 1;
    let child = loop {
        match cmd.spawn() {
            Err(err)
                if err.raw_os_error() == Some(Errno::ETXTBSY as i32)
                    && attempt < SPAWN_ATTEMPTS =>
            {
                log::trace!("cgi {} busy, attempt {attempt}", filename.display());
                attempt += 1;
                thread::sleep(SPAWN_RETRY_SLEEP);
            }
            result => break result?,
        }
    };

    log::debug!("cgi {} started as {}", filename.display(), child.id());

    Ok(child)
}

#[cfg(test)]
mod tests {
    use std::{
        ffi::{OsStr, OsString},
        fs,
        io::Read,
        os::unix::{ffi::OsStringExt, fs::PermissionsExt},
        process::Stdio,
    };

    use super::spawn;
    use crate::common::Method;

    #[test]
    fn spawn_sets_environment_test() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("env.sh");
        fs::write(
            &script,
            "#!/bin/sh\nprintf '%s|%s|%s' \"$REQUEST_METHOD\" \"$QUERY_STRING\" \"$#\"\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let mut child = spawn(&script, OsStr::new("15&20"), &Method::Get, Stdio::piped()).unwrap();
        let mut out = String::new();
        let _ = child.stdout.take().unwrap().read_to_string(&mut out).unwrap();
        let _ = child.wait();

        assert_eq!(out, "GET|15&20|0");
    }

    #[test]
    fn query_string_is_passed_unchanged_test() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("raw.sh");
        fs::write(&script, "#!/bin/sh\nprintf '%s' \"$QUERY_STRING\"\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let cgiargs = OsString::from_vec(vec![b'a', 0xff, b'b']);
        let mut child = spawn(&script, &cgiargs, &Method::Post, Stdio::piped()).unwrap();

        let mut out = Vec::new();
        let _ = child.stdout.take().unwrap().read_to_end(&mut out).unwrap();
        let _ = child.wait();
        assert_eq!(out, vec![b'a', 0xff, b'b']);
    }

    #[test]
    fn spawn_missing_program_test() {
        let dir = tempfile::tempdir().unwrap();
        assert!(spawn(
            &dir.path().join("missing"),
            OsStr::new(""),
            &Method::Post,
            Stdio::null()
        )
        .is_err());
    }
}
