//! Logging interface for the Ferrite serial stack.
//!
//! Provides [`fprint!`] / [`fprintln!`] macros for raw output and [`flog!`] /
//! convenience macros (`finfo!`, `fdebug!`, etc.) for leveled logging. Before
//! [`set_print_fn`] / [`set_log_fn`] are called, output is silently
//! discarded. Messages above the level set with [`set_max_level`] are
//! dropped before they reach the sink.
//!
//! Drivers only log from configuration paths. Interrupt handlers never log.

use core::fmt;
use core::sync::atomic::{AtomicPtr, AtomicU8, Ordering};

// ---------------------------------------------------------------------------
// Log levels, lower = more severe
// ---------------------------------------------------------------------------

/// Log severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    /// Error: something failed but the system may continue.
    Error = 0,
    /// Warning: unexpected condition, not necessarily an error.
    Warn = 1,
    /// Informational: high-level progress messages.
    Info = 2,
    /// Debug: detailed diagnostic information.
    Debug = 3,
    /// Trace: very verbose, low-level tracing.
    Trace = 4,
}

impl LogLevel {
    /// Returns the human-readable name (fixed-width for aligned output).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN ",
            Self::Info => "INFO ",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Error,
            1 => Self::Warn,
            2 => Self::Info,
            3 => Self::Debug,
            _ => Self::Trace,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Raw print function (fprint! / fprintln!), no levels, no filtering
// ---------------------------------------------------------------------------

/// The signature of the global print function.
pub type PrintFn = fn(fmt::Arguments<'_>);

fn null_print(_args: fmt::Arguments<'_>) {}

static PRINT_FN: AtomicPtr<()> = AtomicPtr::new(null_print as *mut ());

/// Registers the global print function.
///
/// # Safety
///
/// The provided function must be safe to call from any context that logs.
/// May be called more than once (e.g. once for a debug adapter, once for a
/// serial console). Uses `Release` ordering so subsequent loads see the new
/// function.
pub unsafe fn set_print_fn(f: PrintFn) {
    PRINT_FN.store(f as *mut (), Ordering::Release);
}

#[inline]
fn load_print_fn() -> PrintFn {
    let ptr = PRINT_FN.load(Ordering::Acquire);
    // SAFETY: Only valid `PrintFn` pointers (or `null_print`) are ever stored.
    unsafe { core::mem::transmute::<*mut (), PrintFn>(ptr) }
}

/// Implementation detail for [`fprint!`] / [`fprintln!`]. Not public API.
#[doc(hidden)]
pub fn _print(args: fmt::Arguments<'_>) {
    load_print_fn()(args);
}

/// Prints to the log sink (raw, no level).
#[macro_export]
macro_rules! fprint {
    ($($arg:tt)*) => { $crate::log::_print(format_args!($($arg)*)) };
}

/// Prints to the log sink with a trailing newline (raw, no level).
#[macro_export]
macro_rules! fprintln {
    () => { $crate::fprint!("\n") };
    ($($arg:tt)*) => { $crate::fprint!("{}\n", format_args!($($arg)*)) };
}

// ---------------------------------------------------------------------------
// Leveled log function (flog! and convenience macros)
// ---------------------------------------------------------------------------

/// The signature of the global leveled log function.
pub type LogFn = fn(LogLevel, fmt::Arguments<'_>);

fn null_log(_level: LogLevel, _args: fmt::Arguments<'_>) {}

static LOG_FN: AtomicPtr<()> = AtomicPtr::new(null_log as *mut ());

static MAX_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Trace as u8);

/// Registers the global leveled log function.
///
/// # Safety
///
/// Same contract as [`set_print_fn`].
pub unsafe fn set_log_fn(f: LogFn) {
    LOG_FN.store(f as *mut (), Ordering::Release);
}

/// Sets the most verbose level that is forwarded to the log function.
pub fn set_max_level(level: LogLevel) {
    MAX_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Returns the most verbose level that is forwarded to the log function.
pub fn max_level() -> LogLevel {
    LogLevel::from_u8(MAX_LEVEL.load(Ordering::Relaxed))
}

#[inline]
fn load_log_fn() -> LogFn {
    let ptr = LOG_FN.load(Ordering::Acquire);
    // SAFETY: Only valid `LogFn` pointers (or `null_log`) are ever stored.
    unsafe { core::mem::transmute::<*mut (), LogFn>(ptr) }
}

/// Implementation detail for [`flog!`]. Not public API.
#[doc(hidden)]
pub fn _log(level: LogLevel, args: fmt::Arguments<'_>) {
    if level <= max_level() {
        load_log_fn()(level, args);
    }
}

/// Logs a message at the given level.
#[macro_export]
macro_rules! flog {
    ($level:expr, $($arg:tt)*) => {
        $crate::log::_log($level, format_args!($($arg)*))
    };
}

/// Logs an error-level message.
#[macro_export]
macro_rules! ferr {
    ($($arg:tt)*) => { $crate::flog!($crate::log::LogLevel::Error, $($arg)*) };
}

/// Logs a warning-level message.
#[macro_export]
macro_rules! fwarn {
    ($($arg:tt)*) => { $crate::flog!($crate::log::LogLevel::Warn, $($arg)*) };
}

/// Logs an info-level message.
#[macro_export]
macro_rules! finfo {
    ($($arg:tt)*) => { $crate::flog!($crate::log::LogLevel::Info, $($arg)*) };
}

/// Logs a debug-level message.
#[macro_export]
macro_rules! fdebug {
    ($($arg:tt)*) => { $crate::flog!($crate::log::LogLevel::Debug, $($arg)*) };
}

/// Logs a trace-level message.
#[macro_export]
macro_rules! ftrace {
    ($($arg:tt)*) => { $crate::flog!($crate::log::LogLevel::Trace, $($arg)*) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::{String, ToString};
    use std::sync::Mutex;
    use std::vec::Vec;

    static CAPTURED: Mutex<Vec<String>> = Mutex::new(Vec::new());

    fn capture_log(level: LogLevel, args: fmt::Arguments<'_>) {
        CAPTURED
            .lock()
            .unwrap()
            .push(std::format!("[{level}] {args}"));
    }

    fn capture_print(args: fmt::Arguments<'_>) {
        CAPTURED.lock().unwrap().push(args.to_string());
    }

    #[test]
    fn level_names_are_fixed_width() {
        for level in [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ] {
            assert_eq!(level.name().len(), 5);
            assert_eq!(LogLevel::from_u8(level as u8), level);
        }
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    // Sinks and the level filter are process-global, so everything that
    // touches them lives in one test.
    #[test]
    fn sinks_receive_filtered_output() {
        // SAFETY: The capture functions only lock a host mutex.
        unsafe {
            set_log_fn(capture_log);
            set_print_fn(capture_print);
        }

        set_max_level(LogLevel::Info);
        finfo!("usart0 begin at {} baud", 115_200);
        fdebug!("dropped");
        fwarn!("baud clamped");
        fprintln!("raw {}", 7);

        set_max_level(LogLevel::Trace);
        ftrace!("trace visible");
        assert_eq!(max_level(), LogLevel::Trace);

        let captured = CAPTURED.lock().unwrap();
        assert_eq!(
            captured.as_slice(),
            [
                "[INFO ] usart0 begin at 115200 baud",
                "[WARN ] baud clamped",
                "raw 7\n",
                "[TRACE] trace visible",
            ]
        );
    }
}
