use std::io::{self, Write};
use std::time::Instant;

/// Elapsed-time-stamped batch progress on stderr, independent of the
/// tracing filter so `--verbose` off still shows where a long run is.
pub struct ConsoleProgress {
    enabled: bool,
    t0: Instant,
}

impl ConsoleProgress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            t0: Instant::now(),
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        if !self.enabled {
            return;
        }
        let ts = fmt_elapsed(self.t0.elapsed().as_secs_f64());
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "[{ts}] {}", msg.as_ref());
    }

    /// `[00:42] [3/10  30.0%] 12.html`
    pub fn chapter(&self, current: usize, total: usize, name: &str) {
        if !self.enabled {
            return;
        }
        let ts = fmt_elapsed(self.t0.elapsed().as_secs_f64());
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "[{ts}] [{}] {name}", step_label(current, total));
    }
}

fn step_label(current: usize, total: usize) -> String {
    let total = total.max(1);
    let current = current.min(total);
    let pct = (current as f64 / total as f64) * 100.0;
    format!("{current}/{total} {pct:5.1}%")
}

fn fmt_elapsed(seconds: f64) -> String {
    let seconds = seconds.max(0.0) as u64;
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
