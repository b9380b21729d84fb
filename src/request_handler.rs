//! [`RequestHandler`] called by every pool worker for each dequeued connection

/// A `RequestHandler` serves one transaction on a connection handle.
///
/// [`serve`](RequestHandler::serve) is called synchronously by a pool worker while the
/// worker holds its slot lock. It must not return before the transaction is complete,
/// including the handoff of the connection to a CGI child. The worker closes the
/// connection (drops it) once `serve` returns.
///
/// For simple handling exists the implementation [`FnRequestHandler`].
///
/// # Example
///
/// ```
/// # use std::io::Write;
/// # use tiny_web::{ConnectionStream, RequestHandler};
/// struct NothingFoundHandler;
/// impl RequestHandler<ConnectionStream> for NothingFoundHandler {
///     fn serve(&self, conn: &mut ConnectionStream) {
///         let _ = conn.write_all(b"HTTP/1.0 404 Not Found\r\n\r\n");
///     }
/// }
/// ```
pub trait RequestHandler<C>: Send + Sync {
    /// Serves one transaction on `conn`.
    fn serve(&self, conn: &mut C);
}

/// `FnRequestHandler` implements [`RequestHandler`]
///
/// It can be used to make an [`RequestHandler`] out of function or closure.
///
/// # Example
///
/// ```
/// # use std::io::Write;
/// # use tiny_web::{ConnectionStream, FnRequestHandler};
/// let handler = FnRequestHandler(|conn: &mut ConnectionStream| {
///     let _ = conn.write_all(b"HTTP/1.0 204 No Content\r\n\r\n");
/// });
/// ```
#[allow(missing_debug_implementations)]
pub struct FnRequestHandler<F>(pub F);

impl<C, F> RequestHandler<C> for FnRequestHandler<F>
where
    F: Fn(&mut C) + Send + Sync,
{
    #[inline]
    fn serve(&self, conn: &mut C) {
        (self.0)(conn);
    }
}

impl<F> From<F> for FnRequestHandler<F> {
    fn from(f: F) -> Self {
        FnRequestHandler(f)
    }
}
