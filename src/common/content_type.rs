//! MIME types of served files

/// Known MIME types by filename fragment, first match wins.
const CONTENT_TYPES: &[(&str, &str)] = &[
    (".html", "text/html"),
    (".gif", "image/gif"),
    (".png", "image/png"),
    (".jpg", "image/jpeg"),
    (".mpeg", "video/mpeg"),
    (".flv", "video/flv"),
    (".mp4", "video/mp4"),
];

/// Fallback for unknown files
pub const CONTENT_TYPE_DEFAULT: &str = "text/plain";

/// Derives the `Content-type` of a static file from its name.
///
/// The fragment may appear anywhere in the name, so `page.html.bak` is `text/html`.
#[must_use]
pub fn from_filename(filename: &str) -> &'static str {
    CONTENT_TYPES
        .iter()
        .find(|(fragment, _)| filename.contains(fragment))
        .map_or(CONTENT_TYPE_DEFAULT, |(_, mime)| mime)
}

#[cfg(test)]
mod tests {
    use super::from_filename;

    #[test]
    fn content_type_test() {
        assert_eq!(from_filename("./home.html"), "text/html");
        assert_eq!(from_filename("./godzilla.gif"), "image/gif");
        assert_eq!(from_filename("./a.png"), "image/png");
        assert_eq!(from_filename("./a.jpg"), "image/jpeg");
        assert_eq!(from_filename("./clip.mpeg"), "video/mpeg");
        assert_eq!(from_filename("./clip.flv"), "video/flv");
        assert_eq!(from_filename("./clip.mp4"), "video/mp4");
        assert_eq!(from_filename("./notes.txt"), "text/plain");
        assert_eq!(from_filename("./Makefile"), "text/plain");
        assert_eq!(from_filename("./page.html.bak"), "text/html");
    }
}
