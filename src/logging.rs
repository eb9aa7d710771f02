//! Logging macros, ported from the level-gated `println!`/backlog scheme.

use std::sync::{
    atomic::{AtomicBool, AtomicU8},
    Mutex,
};

/// Verbosity level of log to print/queue
pub static LOG_LEVEL: AtomicU8 = AtomicU8::new(0);
/// Print log if true else save for later
pub static PRINT_LOG: AtomicBool = AtomicBool::new(true);
/// The backlog of logs to print when resumed
pub static BACKLOG: Mutex<Vec<(u8, String)>> = Mutex::new(Vec::new());

/// If $v <= LOG_LEVEL print values
macro_rules! log {
    ($v:expr, $($fmt_args:tt)*) => {
        #[allow(unused_comparisons)]
        if $crate::logging::LOG_LEVEL.load(std::sync::atomic::Ordering::Relaxed) >= $v {
            if $crate::logging::PRINT_LOG.load(std::sync::atomic::Ordering::Relaxed) {
                println!($($fmt_args)*)
            } else if let Ok(mut backlog) = $crate::logging::BACKLOG.lock() {
                backlog.push(($v, format!($($fmt_args)*)))
            }
        }
    };
}

/// Pause log and queue further entries
#[allow(unused_macros)]
macro_rules! log_pause {
    () => {
        $crate::logging::PRINT_LOG.store(false, std::sync::atomic::Ordering::Relaxed)
    };
}

/// Resume log and print queued entries
#[allow(unused_macros)]
macro_rules! log_resume {
    () => {
        $crate::logging::PRINT_LOG.store(true, std::sync::atomic::Ordering::Relaxed);
        if let Ok(mut backlog) = $crate::logging::BACKLOG.lock() {
            for (n, s) in backlog.drain(..) {
                if n == 0 {
                    eprintln!("{}", s);
                } else {
                    println!("{}", s);
                }
            }
            backlog.shrink_to_fit();
        }
    };
}

/// Level 0
macro_rules! error {
    ($($fmt_args:tt)*) => {$crate::logging::log!(0, $($fmt_args)*)}
}
/// Level 1
macro_rules! info {
    ($($fmt_args:tt)*) => {$crate::logging::log!(1, $($fmt_args)*)}
}
/// Level 2
macro_rules! bench {
    ($($fmt_args:tt)*) => {$crate::logging::log!(2, $($fmt_args)*)}
}
/// Level 3
macro_rules! debug {
    ($($fmt_args:tt)*) => {$crate::logging::log!(3, $($fmt_args)*)}
}

pub(crate) use {bench, debug, error, info, log, log_pause, log_resume};
