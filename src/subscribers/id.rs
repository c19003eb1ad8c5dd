//! # Subscriber identity.

use std::fmt;

/// Opaque, unique identity of a registered subscriber.
///
/// Assigned by [`Registry::register`](crate::Registry::register) from a monotonic
/// counter; an id is never reused for the lifetime of its registry. Ids are
/// ordered by registration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    #[inline]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value (for logs/metrics).
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_order() {
        let a = SubscriberId::from_raw(1);
        let b = SubscriberId::from_raw(2);
        assert!(a < b);
        assert_eq!(b.to_string(), "sub-2");
        assert_eq!(a.as_u64(), 1);
    }
}
