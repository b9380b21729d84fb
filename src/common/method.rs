use std::{fmt, str::FromStr};

use ascii::{AsciiStr, AsciiString};

/// HTTP request methods
///
/// Only `GET`, `HEAD` and `POST` are served, everything else is kept as
/// [`Method::NonStandard`] and answered with `501 Not Implemented`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `HEAD`
    Head,
    /// `POST`
    Post,
    /// Any other method, `None` if it wasn't ASCII
    NonStandard(Option<AsciiString>),
}

impl Method {
    /// enum [Method] names as `&str`
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::NonStandard(s) => s.as_deref().map_or("None", AsciiStr::as_str),
        }
    }

    /// `true` for the methods the server implements
    #[must_use]
    #[inline]
    pub fn is_supported(&self) -> bool {
        !matches!(self, Method::NonStandard(_))
    }
}

impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Method, ()> {
        Ok(Method::from(s.as_bytes()))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(self.as_str())
    }
}

/// Method names are matched case-insensitively.
impl From<&[u8]> for Method {
    fn from(b: &[u8]) -> Self {
        if b.eq_ignore_ascii_case(b"GET") {
            Method::Get
        } else if b.eq_ignore_ascii_case(b"HEAD") {
            Method::Head
        } else if b.eq_ignore_ascii_case(b"POST") {
            Method::Post
        } else {
            Method::NonStandard(AsciiString::from_ascii(b).ok())
        }
    }
}
