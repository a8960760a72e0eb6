//! Synchronisation primitives shared by the engines
//!
//! - StartGate: one-shot barrier releasing all actors at once
//! - TicketLock: strictly FIFO exclusive lock used for the forks

pub mod gate;
pub mod ticket;

pub use gate::StartGate;
pub use ticket::{TicketGuard, TicketLock};
