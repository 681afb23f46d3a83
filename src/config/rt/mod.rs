//! Runtime config
//!
//! The configuration model, with paths resolved and patterns compiled, ready to be handed to the
//! systems.

mod generate;
mod run;
mod watch;

pub use generate::*;
pub use run::*;
pub use watch::*;
