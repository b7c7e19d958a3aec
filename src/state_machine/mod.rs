//! # Status State Machine
//!
//! Published health moves between `healthy`, `warning` and `critical` only through the named
//! rules in [`transitions`], each with its own evidence requirement. There is no terminal
//! state; the machine is re-evaluated on every sample.

pub mod debouncer;
pub mod transitions;

pub use debouncer::StateDebouncer;
pub use transitions::{Evidence, TransitionRule};
