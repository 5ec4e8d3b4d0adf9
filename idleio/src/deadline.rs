//! Capabilities for arming an absolute deadline on some transport.

use std::{io, net::TcpStream, sync::Arc, time::Duration};

use duplicate::duplicate_item;
use tokio::time::Instant;

/// Smallest timeout a blocking socket accepts; a zero timeout is rejected by the OS layer.
const MIN_SOCKET_TIMEOUT: Duration = Duration::from_nanos(1);

/// Arms the deadline of the next (and any pending) read on a transport.
pub trait ReadDeadline {
    fn set_read_deadline(&self, deadline: Instant) -> io::Result<()>;
}

/// Arms the deadline of the next (and any pending) write on a transport.
pub trait WriteDeadline {
    fn set_write_deadline(&self, deadline: Instant) -> io::Result<()>;
}

#[duplicate_item(
    wrapper ;
    [&T]    ;
    [Box<T>];
    [Arc<T>];
)]
impl<T> ReadDeadline for wrapper
where
    T: ReadDeadline + ?Sized,
{
    fn set_read_deadline(&self, deadline: Instant) -> io::Result<()> {
        (**self).set_read_deadline(deadline)
    }
}

#[duplicate_item(
    wrapper ;
    [&T]    ;
    [Box<T>];
    [Arc<T>];
)]
impl<T> WriteDeadline for wrapper
where
    T: WriteDeadline + ?Sized,
{
    fn set_write_deadline(&self, deadline: Instant) -> io::Result<()> {
        (**self).set_write_deadline(deadline)
    }
}

/// The operation a poll-based wrapper has armed a deadline for.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct InFlight {
    deadline: Option<Instant>,
}

impl InFlight {
    /// Whether a poll at `now` begins a new operation and must arm.
    ///
    /// A transport wakes an operation waiting on an expired deadline, so an operation still in
    /// flight a full window past its deadline was dropped while pending.
    pub(crate) fn starts_operation(&self, idle_timeout: Duration, now: Instant) -> bool {
        match self.deadline {
            None => true,
            Some(deadline) => deadline
                .checked_add(idle_timeout)
                .is_some_and(|abandoned| now >= abandoned),
        }
    }

    pub(crate) fn begin(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    pub(crate) fn end(&mut self) {
        self.deadline = None;
    }
}

fn socket_timeout(deadline: Instant) -> Duration {
    deadline
        .saturating_duration_since(Instant::now())
        .max(MIN_SOCKET_TIMEOUT)
}

impl ReadDeadline for TcpStream {
    fn set_read_deadline(&self, deadline: Instant) -> io::Result<()> {
        self.set_read_timeout(Some(socket_timeout(deadline)))
    }
}

impl WriteDeadline for TcpStream {
    fn set_write_deadline(&self, deadline: Instant) -> io::Result<()> {
        self.set_write_timeout(Some(socket_timeout(deadline)))
    }
}
