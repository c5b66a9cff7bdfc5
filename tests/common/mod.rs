#![allow(dead_code, unused_imports)]

pub use filewatch_test_utils::fakes;
pub use filewatch_test_utils::{init_tracing, with_timeout};

use std::time::Duration;

/// Poll `cond` every 10ms until it holds, for at most 5 seconds.
pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}
