use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// return milliseconds since epoch, as stamped on stored key/values
pub(crate) fn get_now_as_millis() -> i64 {
    let now = SystemTime::now();
    match now.duration_since(UNIX_EPOCH) {
        Ok(since_epoch) => since_epoch.as_millis() as i64,
        Err(_) => 0,
    }
}
