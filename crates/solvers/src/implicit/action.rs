/// Actions an observer can request from the implicit solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Abandon the integration attempt.
    ///
    /// The attempt ends as [`FailureReason::StoppedByObserver`]; no partial
    /// state is published.
    ///
    /// [`FailureReason::StoppedByObserver`]: super::FailureReason::StoppedByObserver
    StopEarly,
}
