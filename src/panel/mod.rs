//! Control panel core: lifecycle state machine and the tasks it drives.

mod announcer;
mod blink;
mod outputs;
mod runner;
mod state;

pub use announcer::*;
pub use blink::*;
pub use outputs::*;
pub use runner::*;
pub use state::*;
