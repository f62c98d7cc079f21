mod runner;

pub use runner::{ExitStatus, Interpreter, RuntimeError};
