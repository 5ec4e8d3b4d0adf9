use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use pin_project_lite::pin_project;
use tokio::{
    io::{AsyncRead, ReadBuf},
    time::Instant,
};
use tracing::{error, trace};

use crate::{
    deadline::{InFlight, ReadDeadline},
    error::{ArmDeadlineError, Direction},
};

pin_project! {
    /// An `AsyncRead`er that bounds every read by `idle_timeout`, measured from the start of that read.
    ///
    /// A read spans one or more polls. The first poll pushes the read deadline to
    /// `now + idle_timeout` through the controller; later polls of the same pending read leave it
    /// alone, unless the read was dropped while pending and its deadline lapsed a full window ago.
    /// If arming fails the inner reader is never polled.
    #[derive(Debug)]
    pub struct IdleReader<C, R> {
        controller: C,
        #[pin]
        reader: R,
        idle_timeout: Duration,
        in_flight: InFlight,
    }
}

impl<C, R> IdleReader<C, R> {
    pub fn new(controller: C, reader: R, idle_timeout: Duration) -> Self {
        Self {
            controller,
            reader,
            idle_timeout,
            in_flight: InFlight::default(),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn get_pin_mut(self: Pin<&mut Self>) -> Pin<&mut R> {
        self.project().reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<C, R> AsyncRead for IdleReader<C, R>
where
    C: ReadDeadline,
    R: AsyncRead,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();
        let now = Instant::now();
        if this.in_flight.starts_operation(*this.idle_timeout, now) {
            let deadline = now + *this.idle_timeout;
            if let Err(e) = this.controller.set_read_deadline(deadline) {
                error!(?e, "Failed to arm read deadline");
                return Poll::Ready(Err(ArmDeadlineError::new(Direction::Read, e).into()));
            }
            trace!(?deadline, "Read deadline armed");
            this.in_flight.begin(deadline);
        }
        let r = this.reader.poll_read(cx, buf);
        if r.is_ready() {
            this.in_flight.end();
        }
        r
    }
}
