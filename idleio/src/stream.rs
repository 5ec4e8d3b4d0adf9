//! Absolute read and write deadlines for tokio streams.
//!
//! Tokio streams carry no deadlines of their own. [`DeadlineStream`] adds them: a [`DeadlineHandle`]
//! arms an absolute deadline per direction, and once that deadline passes, a read or write that would
//! otherwise stay [`Poll::Pending`] fails with an [`io::Error`] of kind
//! [`TimedOut`](io::ErrorKind::TimedOut). Setting a deadline affects pending as well as future
//! operations.
#![warn(missing_docs)]

use pin_project_lite::pin_project;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll, Waker};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{Instant, Sleep, sleep_until};
use tracing::trace;

use crate::deadline::{ReadDeadline, WriteDeadline};
use crate::error::Direction;

#[derive(Debug, Default)]
struct Slot {
    deadline: Option<Instant>,
    waker: Option<Waker>,
}

#[derive(Debug, Default)]
struct Deadlines {
    read: Slot,
    write: Slot,
}

impl Deadlines {
    fn slot(&mut self, direction: Direction) -> &mut Slot {
        match direction {
            Direction::Read => &mut self.read,
            Direction::Write => &mut self.write,
        }
    }
}

fn lock(deadlines: &Mutex<Deadlines>) -> MutexGuard<'_, Deadlines> {
    deadlines.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct DeadlineTimer {
    direction: Direction,
    armed: Option<Instant>,
    sleep: Pin<Box<Sleep>>,
}

impl DeadlineTimer {
    fn new(direction: Direction) -> Self {
        Self {
            direction,
            armed: None,
            sleep: Box::pin(sleep_until(Instant::now())),
        }
    }

    /// Only called once the inner stream has returned [`Poll::Pending`].
    fn poll_check(&mut self, deadlines: &Mutex<Deadlines>, cx: &mut Context<'_>) -> io::Result<()> {
        let deadline = {
            let mut deadlines = lock(deadlines);
            let slot = deadlines.slot(self.direction);
            if !slot
                .waker
                .as_ref()
                .is_some_and(|waker| waker.will_wake(cx.waker()))
            {
                slot.waker = Some(cx.waker().clone());
            }
            slot.deadline
        };

        let Some(deadline) = deadline else {
            self.armed = None;
            return Ok(());
        };
        if self.armed != Some(deadline) {
            self.sleep.as_mut().reset(deadline);
            self.armed = Some(deadline);
        }

        match self.sleep.as_mut().poll(cx) {
            Poll::Ready(()) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{} deadline exceeded", self.direction),
            )),
            Poll::Pending => Ok(()),
        }
    }
}

pin_project! {
    /// An `AsyncRead` and `AsyncWrite`er which fails operations still pending past their deadline.
    #[derive(Debug)]
    pub struct DeadlineStream<S> {
        #[pin]
        stream: S,
        deadlines: Arc<Mutex<Deadlines>>,
        read_timer: DeadlineTimer,
        write_timer: DeadlineTimer,
    }
}

impl<S> DeadlineStream<S> {
    /// Returns a new `DeadlineStream` wrapping the specified stream.
    ///
    /// There is initially no deadline in either direction. Must be called from within a tokio
    /// runtime.
    pub fn new(stream: S) -> DeadlineStream<S> {
        DeadlineStream {
            stream,
            deadlines: Arc::new(Mutex::new(Deadlines::default())),
            read_timer: DeadlineTimer::new(Direction::Read),
            write_timer: DeadlineTimer::new(Direction::Write),
        }
    }

    /// Returns a controller arming this stream's deadlines.
    ///
    /// Handles outlive the stream, but arming fails with
    /// [`NotConnected`](io::ErrorKind::NotConnected) once the stream is dropped.
    pub fn handle(&self) -> DeadlineHandle {
        DeadlineHandle {
            deadlines: Arc::downgrade(&self.deadlines),
        }
    }

    /// Returns the current read deadline.
    pub fn read_deadline(&self) -> Option<Instant> {
        lock(&self.deadlines).read.deadline
    }

    /// Returns the current write deadline.
    pub fn write_deadline(&self) -> Option<Instant> {
        lock(&self.deadlines).write.deadline
    }

    /// Returns a shared reference to the inner stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Returns a mutable reference to the inner stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Returns a pinned mutable reference to the inner stream.
    pub fn get_pin_mut(self: Pin<&mut Self>) -> Pin<&mut S> {
        self.project().stream
    }

    /// Consumes the `DeadlineStream`, returning the inner stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<R> AsyncRead for DeadlineStream<R>
where
    R: AsyncRead,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<Result<(), io::Error>> {
        let this = self.project();
        let r = this.stream.poll_read(cx, buf);
        if r.is_pending() {
            this.read_timer.poll_check(this.deadlines, cx)?;
        }
        r
    }
}

impl<W> AsyncWrite for DeadlineStream<W>
where
    W: AsyncWrite,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context,
        buf: &[u8],
    ) -> Poll<Result<usize, io::Error>> {
        let this = self.project();
        let r = this.stream.poll_write(cx, buf);
        if r.is_pending() {
            this.write_timer.poll_check(this.deadlines, cx)?;
        }
        r
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Result<(), io::Error>> {
        let this = self.project();
        let r = this.stream.poll_flush(cx);
        if r.is_pending() {
            this.write_timer.poll_check(this.deadlines, cx)?;
        }
        r
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Result<(), io::Error>> {
        let this = self.project();
        let r = this.stream.poll_shutdown(cx);
        if r.is_pending() {
            this.write_timer.poll_check(this.deadlines, cx)?;
        }
        r
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        let this = self.project();
        let r = this.stream.poll_write_vectored(cx, bufs);
        if r.is_pending() {
            this.write_timer.poll_check(this.deadlines, cx)?;
        }
        r
    }

    fn is_write_vectored(&self) -> bool {
        self.stream.is_write_vectored()
    }
}

/// Arms the deadlines of a [`DeadlineStream`].
#[derive(Debug, Clone)]
pub struct DeadlineHandle {
    deadlines: Weak<Mutex<Deadlines>>,
}

impl DeadlineHandle {
    fn set(&self, direction: Direction, deadline: Option<Instant>) -> io::Result<()> {
        let Some(deadlines) = self.deadlines.upgrade() else {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "deadline stream is closed",
            ));
        };
        let waker = {
            let mut deadlines = lock(&deadlines);
            let slot = deadlines.slot(direction);
            // A later or cleared deadline is picked up when the armed timer fires
            let earlier = match (slot.deadline, deadline) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(old), Some(new)) => new < old,
            };
            slot.deadline = deadline;
            earlier.then(|| slot.waker.take()).flatten()
        };
        trace!(%direction, ?deadline, "Deadline set");
        if let Some(waker) = waker {
            waker.wake();
        }
        Ok(())
    }

    /// Removes the read deadline; pending and future reads may block indefinitely.
    pub fn clear_read_deadline(&self) -> io::Result<()> {
        self.set(Direction::Read, None)
    }

    /// Removes the write deadline; pending and future writes may block indefinitely.
    pub fn clear_write_deadline(&self) -> io::Result<()> {
        self.set(Direction::Write, None)
    }
}

impl ReadDeadline for DeadlineHandle {
    fn set_read_deadline(&self, deadline: Instant) -> io::Result<()> {
        self.set(Direction::Read, Some(deadline))
    }
}

impl WriteDeadline for DeadlineHandle {
    fn set_write_deadline(&self, deadline: Instant) -> io::Result<()> {
        self.set(Direction::Write, Some(deadline))
    }
}
