pub mod gate;

pub use gate::{LoginGate, LoginOutcome, LoginPrompt};
