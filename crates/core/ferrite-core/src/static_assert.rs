//! Compile-time static assertion macro.

/// Asserts a condition at compile time.
///
/// # Examples
///
/// ```ignore
/// static_assert!(core::mem::size_of::<u16>() == 2);
/// static_assert!(validate_capacity(64).is_ok(), "64-byte rings must be valid");
/// ```
#[macro_export]
macro_rules! static_assert {
    ($cond:expr $(,)?) => {
        const _: () = assert!($cond);
    };
    ($cond:expr, $msg:expr $(,)?) => {
        const _: () = assert!($cond, $msg);
    };
}
