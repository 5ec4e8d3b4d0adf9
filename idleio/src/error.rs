use std::{fmt, io};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Read,
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Read => write!(f, "read"),
            Direction::Write => write!(f, "write"),
        }
    }
}

/// The controller could not arm the deadline, so the I/O call was never attempted.
///
/// Travels inside an [`io::Error`] that keeps the controller error's [`io::ErrorKind`]. Use
/// [`ArmDeadlineError::from_io`] to tell this layer's failure apart from the inner stream's.
#[derive(Debug, Error)]
#[error("idleio: failed to arm {direction} deadline")]
pub struct ArmDeadlineError {
    direction: Direction,
    #[source]
    source: io::Error,
}

impl ArmDeadlineError {
    pub fn new(direction: Direction, source: io::Error) -> Self {
        Self { direction, source }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The error returned by the deadline controller.
    pub fn controller_error(&self) -> &io::Error {
        &self.source
    }

    pub fn into_controller_error(self) -> io::Error {
        self.source
    }

    /// Recovers the arm failure from an error returned by an idle reader or writer.
    pub fn from_io(err: &io::Error) -> Option<&ArmDeadlineError> {
        err.get_ref()?.downcast_ref::<ArmDeadlineError>()
    }
}

impl From<ArmDeadlineError> for io::Error {
    fn from(e: ArmDeadlineError) -> Self {
        io::Error::new(e.source.kind(), e)
    }
}

/// Whether the error means a deadline elapsed without progress.
///
/// Blocking sockets report an elapsed timeout as [`io::ErrorKind::WouldBlock`] on Unix and
/// [`io::ErrorKind::TimedOut`] elsewhere; both count.
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
