//! Bench lines emitted by query and aggregation execution.
//!
//! Each line is a JSON object with a `bench` key naming the operation. Lines go
//! to the `bookquery::dev` log target at TRACE and, when a capture is active on
//! the current thread, into a per-thread buffer that tests can read back.

use std::cell::RefCell;

thread_local! {
    static CAPTURE: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Active capture on this thread. Dropping it restores whatever capture was
/// active before, so captures nest.
#[must_use = "capture stops as soon as the guard is dropped"]
pub struct DevSinkGuard {
    previous: Option<Vec<String>>,
}

impl Drop for DevSinkGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CAPTURE.with(|c| *c.borrow_mut() = previous);
    }
}

/// Starts capturing bench lines on the current thread.
pub fn enable_thread_sink() -> DevSinkGuard {
    let previous = CAPTURE.with(|c| c.borrow_mut().replace(Vec::new()));
    DevSinkGuard { previous }
}

pub fn write_str(msg: &str) {
    CAPTURE.with(|c| {
        if let Some(lines) = c.borrow_mut().as_mut() {
            lines.push(msg.to_owned());
        }
    });
}

/// Takes every captured line, leaving the capture active and empty.
#[must_use]
pub fn drain() -> Vec<String> {
    CAPTURE.with(|c| c.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
}

#[must_use]
pub fn snapshot() -> Vec<String> {
    CAPTURE.with(|c| c.borrow().clone().unwrap_or_default())
}

/// Captured lines whose `bench` field equals `op`, parsed as JSON.
#[must_use]
pub fn bench_lines(op: &str) -> Vec<serde_json::Value> {
    snapshot()
        .iter()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .filter(|v| v.get("bench").and_then(serde_json::Value::as_str) == Some(op))
        .collect()
}

/// Formats a bench line, records it in the thread capture and logs it at
/// TRACE under `bookquery::dev`.
#[macro_export]
macro_rules! devlog {
    ($($arg:tt)*) => {{
        let line = format!($($arg)*);
        $crate::utils::devlog::write_str(&line);
        log::trace!(target: "bookquery::dev", "{line}");
    }};
}
