use crate::types::ErrorInfo;

/// Holds at most one error for display. Set by the controller on stream
/// failure, cleared by presentation-layer acknowledgment or at the next
/// generation start; a later failure overwrites an unacknowledged one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorReporter {
    last: Option<ErrorInfo>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&ErrorInfo> {
        self.last.as_ref()
    }

    pub fn record(&mut self, info: ErrorInfo) {
        self.last = Some(info);
    }

    pub fn acknowledge(&mut self) {
        self.last = None;
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorReporter;
    use crate::types::ErrorInfo;

    #[test]
    fn records_and_acknowledges() {
        let mut r = ErrorReporter::new();
        assert!(r.last().is_none());
        r.record(ErrorInfo::service_failure("first"));
        assert_eq!(r.last().expect("last").message, "first");
        r.acknowledge();
        assert!(r.last().is_none());
    }

    #[test]
    fn later_failure_overwrites() {
        let mut r = ErrorReporter::new();
        r.record(ErrorInfo::service_failure("first"));
        r.record(ErrorInfo::service_failure("second"));
        assert_eq!(r.last().expect("last").message, "second");
    }
}
