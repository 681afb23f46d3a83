mod duration;
mod signal;

pub use duration::*;
pub use signal::*;
