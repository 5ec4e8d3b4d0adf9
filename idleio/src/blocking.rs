//! Blocking counterparts of [`IdleReader`](crate::IdleReader) and [`IdleWriter`](crate::IdleWriter)
//! over [`std::io::Read`] and [`std::io::Write`].
//!
//! A blocking call is one operation, so every call arms the deadline afresh.

use std::{
    io::{self, IoSlice, Read, Write},
    time::Duration,
};

use tokio::time::Instant;
use tracing::{error, trace};

use crate::{
    deadline::{ReadDeadline, WriteDeadline},
    error::{ArmDeadlineError, Direction},
};

#[derive(Debug)]
pub struct IdleReader<C, R> {
    controller: C,
    reader: R,
    idle_timeout: Duration,
}

impl<C, R> IdleReader<C, R> {
    pub fn new(controller: C, reader: R, idle_timeout: Duration) -> Self {
        Self {
            controller,
            reader,
            idle_timeout,
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

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<C, R> IdleReader<C, R>
where
    C: ReadDeadline,
{
    fn arm(&self) -> io::Result<()> {
        let deadline = Instant::now() + self.idle_timeout;
        self.controller
            .set_read_deadline(deadline)
            .inspect_err(|e| error!(?e, "Failed to arm read deadline"))
            .map_err(|e| ArmDeadlineError::new(Direction::Read, e))?;
        trace!(?deadline, "Read deadline armed");
        Ok(())
    }
}

impl<C, R> Read for IdleReader<C, R>
where
    C: ReadDeadline,
    R: Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.arm()?;
        self.reader.read(buf)
    }
}

#[derive(Debug)]
pub struct IdleWriter<C, W> {
    controller: C,
    writer: W,
    idle_timeout: Duration,
}

impl<C, W> IdleWriter<C, W> {
    pub fn new(controller: C, writer: W, idle_timeout: Duration) -> Self {
        Self {
            controller,
            writer,
            idle_timeout,
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

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<C, W> IdleWriter<C, W>
where
    C: WriteDeadline,
{
    fn arm(&self) -> io::Result<()> {
        let deadline = Instant::now() + self.idle_timeout;
        self.controller
            .set_write_deadline(deadline)
            .inspect_err(|e| error!(?e, "Failed to arm write deadline"))
            .map_err(|e| ArmDeadlineError::new(Direction::Write, e))?;
        trace!(?deadline, "Write deadline armed");
        Ok(())
    }
}

impl<C, W> Write for IdleWriter<C, W>
where
    C: WriteDeadline,
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.arm()?;
        self.writer.write(buf)
    }

    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        self.arm()?;
        self.writer.write_vectored(bufs)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.arm()?;
        self.writer.flush()
    }
}
