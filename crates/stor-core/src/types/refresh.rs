//! Outcome of a get-or-refresh lookup

/// Result of `get_or_refresh`
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshResult<T> {
    /// Entry was still fresh and returned as is
    Fresh(T),
    /// Entry was expired or missing and the callback produced a new value
    Refreshed(T),
    /// Callback produced nothing; the stale value (if any) was re-written and returned
    RefreshFailed(Option<T>),
    /// Store is disabled; nothing was read or written
    Disabled,
}

impl<T> RefreshResult<T> {
    /// Check if the callback failed to produce a value
    pub fn refresh_failed(&self) -> bool {
        matches!(self, RefreshResult::RefreshFailed(_))
    }

    /// Check if the value was recomputed
    pub fn is_refreshed(&self) -> bool {
        matches!(self, RefreshResult::Refreshed(_))
    }

    /// Borrow the value, if any
    pub fn as_value(&self) -> Option<&T> {
        match self {
            RefreshResult::Fresh(v) | RefreshResult::Refreshed(v) => Some(v),
            RefreshResult::RefreshFailed(v) => v.as_ref(),
            RefreshResult::Disabled => None,
        }
    }

    /// Extract the value, consuming the result
    pub fn value(self) -> Option<T> {
        match self {
            RefreshResult::Fresh(v) | RefreshResult::Refreshed(v) => Some(v),
            RefreshResult::RefreshFailed(v) => v,
            RefreshResult::Disabled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh() {
        let result = RefreshResult::Fresh(42);
        assert!(!result.refresh_failed());
        assert!(!result.is_refreshed());
        assert_eq!(result.value(), Some(42));
    }

    #[test]
    fn test_refresh_failed_keeps_stale_value() {
        let result = RefreshResult::RefreshFailed(Some("stale"));
        assert!(result.refresh_failed());
        assert_eq!(result.as_value(), Some(&"stale"));
        assert_eq!(result.value(), Some("stale"));
    }

    #[test]
    fn test_disabled() {
        let result: RefreshResult<i32> = RefreshResult::Disabled;
        assert!(result.as_value().is_none());
        assert!(result.value().is_none());
    }
}
