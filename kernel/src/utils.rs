use std::time::{SystemTime, UNIX_EPOCH};

use crate::{Error, TableResult};

/// Convenient check-and-bail macro. Returns the given error if the condition
/// does not hold.
macro_rules! require {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err);
        }
    };
}
pub(crate) use require;

/// Current wall-clock time in milliseconds since the unix epoch.
pub(crate) fn current_time_ms() -> TableResult<i64> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| Error::internal_error("System time is before the unix epoch"))?
        .as_millis();
    i64::try_from(millis).map_err(|_| Error::internal_error("Current time overflows i64 millis"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_time_is_recent() {
        // 2020-01-01 in millis
        assert!(current_time_ms().unwrap() > 1_577_836_800_000);
    }
}
