//! # Utility Functions Module
//!
//! Small helpers shared by the process invokers and the reporting code.

use std::time::Duration;

/// Converts any iterable of string-like items to `Vec<String>`.
///
/// Used to build the fixed parameter part of external command lines,
/// where numbers and strings are mixed:
///
/// ```rust,ignore
/// let crf = 23;
/// let params = to_string_vec(["-crf", &crf.to_string(), "-c:a", "aac"]);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Builds an argument vector from mixed expressions.
///
/// ```rust,ignore
/// let params = args!["-crf", 23, "-b:a", "128k"];
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        $crate::utils::to_string_vec([$($item.to_string()),*])
    };
}

/// Formats a duration as `1h 2m 3s`, dropping leading zero units
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
