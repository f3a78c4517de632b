//! Shared utilities and error types

pub mod error;

pub use error::{ApostilaError, Result};

use std::cell::Cell;

/// Holds an in-flight flag for as long as the guard lives.
///
/// Async actions can be re-entered before their first call resolves; a second
/// acquire while the flag is set fails instead of issuing another request.
pub struct InFlight<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> InFlight<'a> {
    /// Set the flag, or return `None` if it is already set
    pub fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self { flag })
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}
