//! Test-only helpers: a well-formed sandbox key, a fast-retry config, and an
//! RAII guard for mutating environment variables.
//!
//! # Usage
//!
//! ```rust
//! use kb_async::test_support::EnvGuard;
//! use serial_test::serial;
//!
//! #[test]
//! #[serial(env)]
//! fn example() {
//!     let _env = EnvGuard::set("VK_API_KEY", kb_async::test_support::TEST_API_KEY);
//!     // ... test body ...
//! }
//! ```

use std::time::Duration;

use crate::config::KbConfig;

/// A syntactically valid sandbox key
pub const TEST_API_KEY: &str = "vk_test_abcdefghijklmnopqrstuvwxyz123456";

/// Config pointed at `base` with millisecond retry delays
#[must_use]
pub fn fast_config(base: impl Into<String>) -> KbConfig {
    KbConfig::new()
        .with_api_base(base)
        .with_api_key(TEST_API_KEY)
        .with_retry_delays(Duration::from_millis(5), Duration::from_millis(20))
}

/// RAII guard for temporarily setting an environment variable.
///
/// The previous value is restored (or the variable removed) on drop.
pub struct EnvGuard {
    key: &'static str,
    prev: Option<String>,
}

impl EnvGuard {
    /// Set an environment variable until the guard drops.
    ///
    /// # Safety
    ///
    /// Mutating the environment races with concurrent readers; only call this
    /// from tests marked `#[serial(env)]`.
    #[must_use]
    pub fn set(key: &'static str, val: &str) -> Self {
        let prev = std::env::var(key).ok();
        // SAFETY: callers serialize env access with `#[serial(env)]`.
        unsafe { std::env::set_var(key, val) };
        Self { key, prev }
    }

    /// Remove an environment variable until the guard drops.
    ///
    /// # Safety
    ///
    /// Same constraint as [`EnvGuard::set`].
    #[must_use]
    pub fn remove(key: &'static str) -> Self {
        let prev = std::env::var(key).ok();
        // SAFETY: see `EnvGuard::set`.
        unsafe { std::env::remove_var(key) };
        Self { key, prev }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: the guard lives inside the same serialized test.
        match self.prev.take() {
            Some(v) => unsafe { std::env::set_var(self.key, v) },
            None => unsafe { std::env::remove_var(self.key) },
        }
    }
}
