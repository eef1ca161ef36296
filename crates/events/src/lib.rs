//! Domain events, commands and the envelope they are stored in.

pub mod command;
pub mod envelope;
pub mod event;

pub use command::Command;
pub use envelope::EventEnvelope;
pub use event::Event;
