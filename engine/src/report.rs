//! Structured reporting of preparation statistics and experiment results.
//!
//! Values are collected into one JSON object per thread which is printed to stdout
//! when the guard returned by `enable_reporting` is dropped.
//! Nested objects and collections are opened with RAII guards, so the shape of the output
//! follows the call graph. Without `enable_reporting` all reporting calls are no-ops.

use crate::built_info;
use serde_json::{Map, Value};
use std::cell::RefCell;

pub use serde_json::json;

#[derive(Debug)]
enum Frame {
    Object(Map<String, Value>),
    Collection(Vec<Value>),
    Blocked,
}

#[derive(Debug)]
struct Reporter {
    // (key under which the frame gets inserted into its parent, frame)
    stack: Vec<(Option<String>, Frame)>,
}

impl Reporter {
    fn new() -> Self {
        Reporter {
            stack: vec![(None, Frame::Object(Map::new()))],
        }
    }

    fn top(&mut self) -> &mut Frame {
        &mut self.stack.last_mut().expect("reporting stack underflow").1
    }

    fn open(&mut self, key: Option<String>, frame: Frame) {
        let frame = match (self.top(), key.is_some()) {
            (Frame::Blocked, _) => Frame::Blocked,
            (Frame::Object(_), true) | (Frame::Collection(_), false) => frame,
            (Frame::Object(_), false) => panic!("collection item opened inside an object"),
            (Frame::Collection(_), true) => panic!("keyed context opened inside a collection"),
        };
        self.stack.push((key, frame));
    }

    fn close(&mut self) {
        assert!(self.stack.len() > 1, "tried to close the root reporting context");
        let (key, frame) = self.stack.pop().expect("reporting stack underflow");
        let value = match frame {
            Frame::Object(object) => Value::Object(object),
            Frame::Collection(items) => Value::Array(items),
            Frame::Blocked => return,
        };
        match (self.top(), key) {
            (Frame::Object(object), Some(key)) => insert(object, key, value),
            (Frame::Collection(items), None) => items.push(value),
            (Frame::Blocked, _) => (),
            _ => panic!("inconsistent reporting stack"),
        }
    }

    fn report(&mut self, key: String, val: Value) {
        match self.top() {
            Frame::Object(object) => insert(object, key, val),
            Frame::Collection(_) => panic!("cannot report a keyed value into a collection"),
            Frame::Blocked => (),
        }
    }

    fn finish(mut self) -> Value {
        assert_eq!(self.stack.len(), 1, "reporting contexts still open");
        match self.stack.pop() {
            Some((_, Frame::Object(object))) => Value::Object(object),
            _ => panic!("broken root object for reporting"),
        }
    }
}

fn insert(object: &mut Map<String, Value>, key: String, val: Value) {
    let prev = object.insert(key, val);
    if !cfg!(feature = "report-allow-override") {
        assert!(prev.is_none(), "value reported twice");
    }
}

thread_local! {
    static REPORTER: RefCell<Option<Reporter>> = RefCell::new(None);
}

fn with_reporter(f: impl FnOnce(&mut Reporter)) {
    REPORTER.with(|reporter| {
        if let Some(r) = reporter.borrow_mut().as_mut() {
            f(r)
        }
    });
}

/// Closes the innermost context when dropped.
#[must_use]
pub struct ContextGuard(());

impl Drop for ContextGuard {
    fn drop(&mut self) {
        with_reporter(Reporter::close);
    }
}

/// Everything reported while the guard lives ends up in a nested object under `key`.
pub fn push_context(key: String) -> ContextGuard {
    with_reporter(|r| r.open(Some(key), Frame::Object(Map::new())));
    ContextGuard(())
}

#[must_use]
pub struct CollectionContextGuard(());

impl Drop for CollectionContextGuard {
    fn drop(&mut self) {
        with_reporter(Reporter::close);
    }
}

/// Opens a JSON array under `key`. Items are added with `push_collection_item`.
pub fn push_collection_context(key: String) -> CollectionContextGuard {
    with_reporter(|r| r.open(Some(key), Frame::Collection(Vec::new())));
    CollectionContextGuard(())
}

impl CollectionContextGuard {
    pub fn push_collection_item(&mut self) -> ContextGuard {
        with_reporter(|r| r.open(None, Frame::Object(Map::new())));
        ContextGuard(())
    }
}

/// Discards everything reported while the guard lives.
pub fn block_reporting() -> ContextGuard {
    with_reporter(|r| r.open(None, Frame::Blocked));
    ContextGuard(())
}

pub fn report(key: String, val: Value) {
    if cfg!(feature = "report-to-stderr") {
        eprintln!("{}: {}", key, val);
    }
    report_silent(key, val)
}

pub fn report_silent(key: String, val: Value) {
    with_reporter(|r| r.report(key, val));
}

/// Prints the collected JSON object when dropped.
#[must_use]
pub struct ReportingGuard(());

impl Drop for ReportingGuard {
    fn drop(&mut self) {
        REPORTER.with(|reporter| {
            if let Some(r) = reporter.borrow_mut().take() {
                println!("{}", r.finish());
            }
        });
    }
}

#[macro_export]
macro_rules! report {
    ($k:expr, $($json:tt)+) => { $crate::report::report($k.to_string(), $crate::report::json!($($json)+)) };
}

#[macro_export]
macro_rules! report_silent {
    ($k:expr, $($json:tt)+) => { $crate::report::report_silent($k.to_string(), $crate::report::json!($($json)+)) };
}

/// Starts collecting reported values on the current thread and reports build and program information.
pub fn enable_reporting(program: &str) -> ReportingGuard {
    REPORTER.with(|reporter| reporter.replace(Some(Reporter::new())));

    report!("build_target", built_info::TARGET);
    report!("build_profile", built_info::PROFILE);
    report!("feature_flags", built_info::FEATURES_STR);
    report!("build_time", built_info::BUILT_TIME_UTC);
    report!("build_with_rustc", built_info::RUSTC_VERSION);
    report!("program", program);
    report!("start_time", format!("{}", time::now_utc().rfc822()));
    report!("args", std::env::args().collect::<Vec<String>>());

    ReportingGuard(())
}

/// Stops collecting on the current thread and returns what was reported so far.
/// Mostly useful in tests, `ReportingGuard` prints nothing afterwards.
pub fn take_report() -> Option<Value> {
    REPORTER.with(|reporter| reporter.borrow_mut().take().map(Reporter::finish))
}

pub mod benchmark;
pub use benchmark::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_contexts_build_json() {
        let _guard = enable_reporting("report_test");
        {
            let _ctx = push_context("preparation".to_string());
            report!("shortcuts", 3);
            let mut rounds = push_collection_context("rounds".to_string());
            for i in 0..2 {
                let _item = rounds.push_collection_item();
                report!("round", i);
            }
        }
        {
            let _blocked = block_reporting();
            report!("hidden", true);
        }
        let value = take_report().unwrap();
        assert_eq!(value["preparation"]["shortcuts"], json!(3));
        assert_eq!(value["preparation"]["rounds"], json!([{ "round": 0 }, { "round": 1 }]));
        assert_eq!(value.get("hidden"), None);
        assert_eq!(value["program"], json!("report_test"));
    }

    #[test]
    fn reporting_without_reporter_is_a_noop() {
        let _ctx = push_context("nothing".to_string());
        report!("value", 1);
        assert!(take_report().is_none());
    }
}
