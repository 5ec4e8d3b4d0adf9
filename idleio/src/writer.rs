use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use pin_project_lite::pin_project;
use tokio::{io::AsyncWrite, time::Instant};
use tracing::{error, trace};

use crate::{
    deadline::{InFlight, WriteDeadline},
    error::{ArmDeadlineError, Direction},
};

pin_project! {
    /// An `AsyncWrite`er that bounds every write by `idle_timeout`, measured from the start of that
    /// write.
    ///
    /// Writes, vectored writes, flushes and shutdowns all count as write operations. The first poll
    /// of an operation arms the write deadline, and so does the next poll after an operation was
    /// dropped while pending. The inner writer is never polled after a failed arm.
    #[derive(Debug)]
    pub struct IdleWriter<C, W> {
        controller: C,
        #[pin]
        writer: W,
        idle_timeout: Duration,
        in_flight: InFlight,
    }
}

impl<C, W> IdleWriter<C, W> {
    pub fn new(controller: C, writer: W, idle_timeout: Duration) -> Self {
        Self {
            controller,
            writer,
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

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn get_pin_mut(self: Pin<&mut Self>) -> Pin<&mut W> {
        self.project().writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<C, W> IdleWriter<C, W>
where
    C: WriteDeadline,
    W: AsyncWrite,
{
    fn poll_armed<T>(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        op: impl FnOnce(Pin<&mut W>, &mut Context<'_>) -> Poll<io::Result<T>>,
    ) -> Poll<io::Result<T>> {
        let this = self.project();
        let now = Instant::now();
        if this.in_flight.starts_operation(*this.idle_timeout, now) {
            let deadline = now + *this.idle_timeout;
            if let Err(e) = this.controller.set_write_deadline(deadline) {
                error!(?e, "Failed to arm write deadline");
                return Poll::Ready(Err(ArmDeadlineError::new(Direction::Write, e).into()));
            }
            trace!(?deadline, "Write deadline armed");
            this.in_flight.begin(deadline);
        }
        let r = op(this.writer, cx);
        if r.is_ready() {
            this.in_flight.end();
        }
        r
    }
}

impl<C, W> AsyncWrite for IdleWriter<C, W>
where
    C: WriteDeadline,
    W: AsyncWrite,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.poll_armed(cx, |w, cx| w.poll_write(cx, buf))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.poll_armed(cx, |w, cx| w.poll_flush(cx))
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.poll_armed(cx, |w, cx| w.poll_shutdown(cx))
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        self.poll_armed(cx, |w, cx| w.poll_write_vectored(cx, bufs))
    }

    fn is_write_vectored(&self) -> bool {
        self.writer.is_write_vectored()
    }
}
