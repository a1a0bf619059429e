//! Field-by-field structural comparison support.
//!
//! Every revision export compares itself against the signed copy one field
//! at a time, accumulating an error per mismatch, so an operator sees the
//! full drift in one pass instead of one field per retry.

use crate::error::VerifyError;

/// Accumulator for a structural comparison.
pub(crate) struct FieldChecker {
    pass: bool,
    errs: Vec<VerifyError>,
}

impl FieldChecker {
    pub(crate) fn new() -> Self {
        Self {
            pass: true,
            errs: Vec::new(),
        }
    }

    /// Record a mismatch for `field` unless the values are equal.
    pub(crate) fn eq<T: PartialEq + ?Sized>(&mut self, a: &T, b: &T, field: &'static str) {
        if a != b {
            self.errs.push(VerifyError::FieldMismatch { field });
            self.pass = false;
        }
    }

    /// Record a mismatch for `field` unless `same` holds.
    pub(crate) fn check(&mut self, same: bool, field: &'static str) {
        if !same {
            self.errs.push(VerifyError::FieldMismatch { field });
            self.pass = false;
        }
    }

    pub(crate) fn finish(self) -> (bool, Vec<VerifyError>) {
        (self.pass, self.errs)
    }
}

/// Order-sensitive comparison of two reference lists by a key projection.
pub(crate) fn refs_match<T, K, F>(a: &[T], b: &[T], key: F) -> bool
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| key(x) == key(y))
}
