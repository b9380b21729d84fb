#[cfg(feature = "log")]
pub(crate) use log::{debug, error, info, trace, warn};

/// Formats nothing, but still borrows the arguments so they count as used.
#[cfg(not(feature = "log"))]
macro_rules! log_mock {
    (target: $target:expr, $($arg:tt)+) => {{
        let _ = $target;
        let _ = format_args!($($arg)+);
    }};
    ($($arg:tt)+) => {{
        let _ = format_args!($($arg)+);
    }};
}

#[cfg(not(feature = "log"))]
pub(crate) use {
    log_mock as debug, log_mock as error, log_mock as info, log_mock as trace, log_mock as warn,
};
