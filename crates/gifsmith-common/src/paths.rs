//! Media type detection for intake.
//!
//! Files picked from disk only carry an extension, uploads carry a
//! `Content-Type` header. Both end up as a media type string that
//! [`is_video_media_type`] decides on.

use std::path::Path;

/// Media type reported for files whose extension is not recognized.
pub const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// Media type of the converted output.
pub const GIF_MEDIA_TYPE: &str = "image/gif";

/// Supported video extensions and their media types.
const VIDEO_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mov", "video/quicktime"),
    ("webm", "video/webm"),
    ("mkv", "video/x-matroska"),
    ("avi", "video/x-msvideo"),
    ("wmv", "video/x-ms-wmv"),
    ("flv", "video/x-flv"),
    ("ts", "video/mp2t"),
    ("mpeg", "video/mpeg"),
    ("mpg", "video/mpeg"),
    ("3gp", "video/3gpp"),
    ("ogv", "video/ogg"),
];

/// A few non-video types that commonly get dropped onto the converter.
const OTHER_TYPES: &[(&str, &str)] = &[
    ("gif", "image/gif"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("txt", "text/plain"),
];

/// Guess the media type of a file from its extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use gifsmith_common::paths::media_type_for_path;
///
/// assert_eq!(media_type_for_path(Path::new("clip.MP4")), "video/mp4");
/// assert_eq!(media_type_for_path(Path::new("notes.txt")), "text/plain");
/// assert_eq!(media_type_for_path(Path::new("blob")), "application/octet-stream");
/// ```
pub fn media_type_for_path(path: &Path) -> &'static str {
    let Some(ext) = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
    else {
        return UNKNOWN_MEDIA_TYPE;
    };

    VIDEO_TYPES
        .iter()
        .chain(OTHER_TYPES)
        .find(|(known, _)| *known == ext)
        .map(|(_, media_type)| *media_type)
        .unwrap_or(UNKNOWN_MEDIA_TYPE)
}

/// Strip parameters and normalize case: `"Video/MP4; codecs=avc1"` -> `"video/mp4"`.
pub fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Check whether a declared media type is a video type.
///
/// # Examples
///
/// ```
/// use gifsmith_common::paths::is_video_media_type;
///
/// assert!(is_video_media_type("video/webm"));
/// assert!(is_video_media_type("VIDEO/MP4; codecs=\"avc1\""));
/// assert!(!is_video_media_type("image/gif"));
/// assert!(!is_video_media_type("video/"));
/// ```
pub fn is_video_media_type(media_type: &str) -> bool {
    essence(media_type)
        .strip_prefix("video/")
        .map(|subtype| !subtype.is_empty())
        .unwrap_or(false)
}

/// Get the list of recognized video file extensions.
#[must_use]
pub fn video_extensions() -> Vec<&'static str> {
    VIDEO_TYPES.iter().map(|(ext, _)| *ext).collect()
}
