//! Build timestamp used to derive obfuscation keys

use time::macros::format_description;
use time::OffsetDateTime;

/// Environment variable pinning the build time for reproducible builds
pub const BUILD_TIME_ENV: &str = "OVERLAYHOOK_OBFUSCATION_TIME";

/// Current build time as `HH:MM:SS`
///
/// Local time of the build host. Falls back to UTC when the local offset
/// cannot be determined.
pub fn build_time() -> String {
    if let Ok(pinned) = std::env::var(BUILD_TIME_ENV) {
        return pinned;
    }

    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    format_clock(now)
}

fn format_clock(at: OffsetDateTime) -> String {
    at.format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| String::from("00:00:00"))
}

/// Key pair from a `HH:MM:SS` time: minute and second units characters
pub fn keys_from_time(time: &str) -> (u8, u8) {
    let bytes = time.as_bytes();
    let key1 = bytes.get(4).copied().unwrap_or(b'0');
    let key2 = bytes.get(7).copied().unwrap_or(b'0');
    (key1, key2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_time_shape() {
        // The pinned value would short-circuit formatting
        if std::env::var(BUILD_TIME_ENV).is_ok() {
            return;
        }

        let time = build_time();
        let bytes = time.as_bytes();
        assert_eq!(bytes.len(), 8, "unexpected build time {time:?}");
        assert_eq!(bytes[2], b':');
        assert_eq!(bytes[5], b':');
        for i in [0, 1, 3, 4, 6, 7] {
            assert!(bytes[i].is_ascii_digit(), "unexpected build time {time:?}");
        }
    }

    #[test]
    fn test_format_matches_clock_fields() {
        let at = time::macros::datetime!(2024-03-09 07:05:42 UTC);
        assert_eq!(format_clock(at), "07:05:42");
    }

    #[test]
    fn test_keys_from_time() {
        assert_eq!(keys_from_time("12:34:56"), (b'4', b'6'));
        assert_eq!(keys_from_time("bad"), (b'0', b'0'));
    }
}
