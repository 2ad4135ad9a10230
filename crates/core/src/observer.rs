/// Receives solver events and may steer the solver in return.
///
/// A solver calls [`Observer::observe`] at well-defined points of its loop.
/// Returning `Some(action)` asks for a solver-specific action; returning
/// `None` leaves the iteration untouched. Observers are the hook for
/// tracing, convergence monitoring and early termination.
///
/// Any `FnMut(&E) -> Option<A>` closure is an observer, and `()` is the
/// observer that never acts.
pub trait Observer<E, A> {
    fn observe(&mut self, event: &E) -> Option<A>;
}

impl<E, A, F> Observer<E, A> for F
where
    F: FnMut(&E) -> Option<A>,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self(event)
    }
}

impl<E, A> Observer<E, A> for () {
    fn observe(&mut self, _event: &E) -> Option<A> {
        None
    }
}
