//! # polybridge-cli
//!
//! The interactive front end: a command loop that drives a guest repl
//! script and dispatches tokenized commands against a guest cli script,
//! synchronized through a single-slot rendezvous.

pub mod rendezvous;
pub mod repl;

pub use rendezvous::RendezvousSlot;
pub use repl::{check_for_exception, CommandLoop, InspectReport};
