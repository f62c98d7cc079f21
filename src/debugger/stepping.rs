//! Pause decisions, one instruction event at a time.

use super::breakpoints::BreakpointRegistry;
use crate::vm::MethodId;
use tracing::{debug, trace};

/// Resuming commands accepted while paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepCommand {
    Continue,
    StepInto,
    NextLine,
    StepOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDecision {
    Continue,
    Stop,
}

/// Progress of a `continue` away from the line it was issued on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContinueState {
    #[default]
    Idle,
    /// Still on the stopped line.
    Leaving,
    /// A different line of the stopped method has executed.
    Left,
}

/// One line-mapped instruction about to execute.
#[derive(Debug, Clone, Copy)]
pub struct StepEvent<'a> {
    pub method: MethodId,
    pub call_stack_pos: usize,
    pub line: i32,
    pub file: &'a str,
}

/// Where the program last stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopPoint {
    pub line: i32,
    pub file: String,
    pub method: MethodId,
    pub call_stack_pos: usize,
}

#[derive(Debug, Default)]
pub struct StepController {
    continue_state: ContinueState,
    step_into: bool,
    step_out: bool,
    next_line: bool,
    jump_stack_pos: usize,
    current: Option<StopPoint>,
}

impl StepController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&StopPoint> {
        self.current.as_ref()
    }

    pub fn continue_state(&self) -> ContinueState {
        self.continue_state
    }

    pub fn observe(&mut self, event: &StepEvent<'_>, breakpoints: &BreakpointRegistry) -> StepDecision {
        if event.line <= 0 {
            return StepDecision::Continue;
        }

        let cur = self.current.as_ref();
        let same_method = cur.is_some_and(|stop| stop.method == event.method);
        let same_line =
            cur.is_some_and(|stop| stop.line == event.line && stop.file == event.file);
        let same_depth = cur.is_some_and(|stop| stop.call_stack_pos == event.call_stack_pos);

        if self.continue_state == ContinueState::Leaving && same_method && !same_line {
            self.continue_state = ContinueState::Left;
        }

        let step_out = self.step_out && event.call_stack_pos < self.jump_stack_pos;
        let step_into = self.step_into && (!same_method || !same_line);
        let next_line = self.next_line && same_method && !same_line;
        let at_break = (self.continue_state == ContinueState::Left || !same_line || !same_depth)
            && breakpoints.find(event.line, event.file).is_some();

        trace!(
            target: "svdb::step",
            line = event.line,
            file = event.file,
            depth = event.call_stack_pos,
            state = ?self.continue_state
        );

        if !(at_break || next_line || step_into || step_out) {
            return StepDecision::Continue;
        }

        debug!(
            file = event.file,
            line = event.line,
            at_break,
            next_line,
            step_into,
            step_out,
            "stopping"
        );
        self.current = Some(StopPoint {
            line: event.line,
            file: event.file.to_string(),
            method: event.method,
            call_stack_pos: event.call_stack_pos,
        });
        self.continue_state = ContinueState::Idle;
        self.step_into = false;
        self.step_out = false;
        self.next_line = false;
        StepDecision::Stop
    }

    pub fn arm(&mut self, command: StepCommand) {
        match command {
            StepCommand::Continue => self.continue_state = ContinueState::Leaving,
            StepCommand::StepInto => self.step_into = true,
            StepCommand::NextLine => self.next_line = true,
            StepCommand::StepOut => {
                self.step_out = true;
                self.jump_stack_pos = self.current.as_ref().map_or(0, |stop| stop.call_stack_pos);
            }
        }
        debug!(?command, jump_stack_pos = self.jump_stack_pos, "resuming");
    }

    /// Forget the stop point and any armed step, e.g. when the program ends.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
