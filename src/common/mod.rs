pub use limits::Config as LimitsConfig;
pub use method::Method;
pub use status_code::StatusCode;

pub mod content_type;
pub mod limits;
mod method;
mod status_code;
