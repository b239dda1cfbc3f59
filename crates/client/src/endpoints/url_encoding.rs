//! Percent-encoding for values interpolated into REST paths.
//!
//! Search ids, owners, and app names are caller-supplied and may contain
//! characters that would otherwise change the path (`/`, `?`, `#`) or be
//! decoded twice (`%`).
//!
//! # Example
//!
//! ```
//! use splunk_jobs::endpoints::url_encoding::encode_path_segment;
//!
//! let encoded = encode_path_segment("scheduler__admin/search");
//! assert_eq!(encoded, "scheduler__admin%2Fsearch");
//! ```

use percent_encoding::{AsciiSet, CONTROLS, percent_encode};

/// Characters that must be percent-encoded in a single path segment.
pub const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^')
    .add(b'~')
    .add(b'%')
    .add(b'/')
    .add(b'?')
    .add(b'#')
    .add(b'+')
    .add(b',')
    .add(b';')
    .add(b'[')
    .add(b']');

/// Percent-encode a string for safe use as one URL path segment.
///
/// ```
/// use splunk_jobs::endpoints::url_encoding::encode_path_segment;
///
/// assert_eq!(encode_path_segment("1700000000.42"), "1700000000.42");
/// assert_eq!(encode_path_segment("rt_md_1700000000.42"), "rt_md_1700000000.42");
/// assert_eq!(encode_path_segment("my app"), "my%20app");
/// ```
pub fn encode_path_segment(segment: &str) -> String {
    percent_encode(segment.as_bytes(), PATH_SEGMENT_ENCODE_SET).to_string()
}
