//! Utilities to measure how long executing algorithms takes.

use super::*;
use std::sync::atomic::{compiler_fence, Ordering::SeqCst};
use std::time::*;

fn timed<Out, F: FnOnce() -> Out>(f: F) -> (Out, f64) {
    compiler_fence(SeqCst);
    let start = Instant::now();
    let res = f();
    let t_passed = start.elapsed();
    compiler_fence(SeqCst);
    (res, t_passed.as_secs_f64() * 1000.0)
}

/// Runs `f`, prints how long it took and reports the time as `running_time_ms`.
pub fn report_time<Out, F: FnOnce() -> Out>(name: &str, f: F) -> Out {
    report_time_with_key(name, "running_time_ms", f)
}

/// Runs `f`, prints how long it took and reports the time under `key`.
pub fn report_time_with_key<Out, F: FnOnce() -> Out>(name: &str, key: &'static str, f: F) -> Out {
    eprintln!("starting {}", name);
    let (res, t_passed) = timed(f);
    eprintln!("{} done - took: {}ms", name, t_passed);
    report!(key, t_passed);
    res
}

/// Runs `f` and reports the time under `key` without printing anything.
pub fn silent_report_time_with_key<Out, F: FnOnce() -> Out>(key: &'static str, f: F) -> Out {
    let (res, t_passed) = timed(f);
    report_silent!(key, t_passed);
    res
}

/// Runs `f` and returns its result together with the time it took.
pub fn measure<Out, F: FnOnce() -> Out>(f: F) -> (Out, Duration) {
    compiler_fence(SeqCst);
    let start = Instant::now();
    let res = f();
    let t_passed = start.elapsed();
    compiler_fence(SeqCst);
    (res, t_passed)
}

/// Repeatedly measures the time passed since it was started.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Timer {
        Timer { start: Instant::now() }
    }

    pub fn restart(&mut self) {
        self.start = Instant::now();
    }

    pub fn get_passed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }

    pub fn get_passed(&self) -> Duration {
        self.start.elapsed()
    }
}
