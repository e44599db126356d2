//! Small utilities that do not warrant a module of their own

use std::num::ParseIntError;
use std::time::Duration;

/// Parses a number of seconds into a [`Duration`]
pub fn parse_seconds(src: &str) -> Result<Duration, ParseIntError> {
    src.parse::<u64>().map(Duration::from_secs)
}

/// Parses a number of milliseconds into a [`Duration`]
pub fn parse_millis(src: &str) -> Result<Duration, ParseIntError> {
    src.parse::<u64>().map(Duration::from_millis)
}

#[cfg(test)]
mod does {
    use super::*;

    #[test]
    fn parse_seconds_and_millis() {
        assert_eq!(parse_seconds("300").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_millis("250").unwrap(), Duration::from_millis(250));
        assert!(parse_seconds("five").is_err());
    }
}
