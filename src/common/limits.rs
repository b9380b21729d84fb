//! Limits used when reading a request
//!

/// Default value for allowed length/size of a request or header line
pub const HEADER_LINE_LEN_DEFAULT: usize = 8192;
/// Default value for allowed size of the whole request head
pub const HEADER_MAX_SIZE_DEFAULT: usize = 65536;
/// Default value for allowed size of a `POST` body forwarded to CGI
pub const CONTENT_MAX_SIZE_DEFAULT: usize = 8192;

/// [`Config`] for `limits`
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Allowed length/size of a request or header line
    pub header_line_len: usize,
    /// Allowed size of request line plus headers
    pub header_max_size: usize,
    /// Allowed `Content-Length` of a `POST` body
    pub content_max_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            header_line_len: HEADER_LINE_LEN_DEFAULT,
            header_max_size: HEADER_MAX_SIZE_DEFAULT,
            content_max_size: CONTENT_MAX_SIZE_DEFAULT,
        }
    }
}
