//! Step-count source consulted by the controller.
//!
//! The panel button that shortens the cycle is not built yet. The controller
//! asks a [`StepLimiter`] for the active cycle length at startup and on every
//! resync, so a button-driven implementation can be dropped in later without
//! touching the timeout logic.

use crate::config::Steps;

/// Supplies the active cycle length.
pub trait StepLimiter {
    fn steps(&self) -> Steps;
}

/// Limiter that always reports the configured cycle length.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FixedSteps(pub Steps);

impl StepLimiter for FixedSteps {
    fn steps(&self) -> Steps {
        self.0
    }
}

impl<T: StepLimiter + ?Sized> StepLimiter for &T {
    fn steps(&self) -> Steps {
        (**self).steps()
    }
}
