mod breakpoints;
mod context;
mod error;
mod input;
mod session;
mod source;
mod stepping;

pub use breakpoints::{Breakpoint, BreakpointRegistry};
pub use context::DebugContext;
pub use error::SessionError;
pub use input::{CommandSource, ConsoleInput, ScriptedInput};
pub use session::{DebugSession, Flow};
pub use source::{SourceError, SourceFile};
pub use stepping::{ContinueState, StepCommand, StepController, StepDecision, StepEvent, StopPoint};
