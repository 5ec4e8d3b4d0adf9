//! Idle-timeout enforcement for streaming I/O.
//!
//! Every read or write is bounded by a fixed idle window measured from the moment that operation
//! begins. Before each operation the wrapper pushes the transport's deadline to `now + idle_timeout`
//! through a [`ReadDeadline`] or [`WriteDeadline`] controller, then delegates to the inner stream.
//! A transfer may therefore run indefinitely as long as it makes progress at least once per window.

pub mod blocking;
pub mod config;
pub mod deadline;
pub mod error;
pub mod reader;
pub mod stream;
pub mod writer;

pub use deadline::{ReadDeadline, WriteDeadline};
pub use error::{ArmDeadlineError, Direction, is_timeout};
pub use reader::IdleReader;
pub use stream::{DeadlineHandle, DeadlineStream};
pub use writer::IdleWriter;
