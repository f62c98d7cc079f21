//! The interactive debugger: command loop, program runs, and pausing.

use super::context::DebugContext;
use super::error::SessionError;
use super::input::CommandSource;
use super::source::SourceFile;
use super::stepping::{StepCommand, StepDecision, StepEvent};
use crate::config::{normalize_base_path, SessionConfig};
use crate::eval::{EvalScope, ExpressionEvaluator};
use crate::executor::{ExitStatus, Interpreter, RuntimeError};
use crate::parser::{parse_command, Command, Expression, FilePosition, COMMAND_PREFIX};
use crate::vm::{DebugHook, ExecState, Loader, MethodId, Resume, StackDclr};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PROMPT: &str = "> ";
const CLEAR_PROMPT: &str = "  are sure you want to clear all breakpoints? [y/n] ";

/// What the command loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next command.
    Prompt,
    /// Let the paused program run.
    Resume,
    /// End the session.
    Quit,
}

pub struct DebugSession<I, W> {
    context: DebugContext,
    loader: Box<dyn Loader>,
    input: I,
    out: W,
}

impl<I: CommandSource, W: Write> DebugSession<I, W> {
    pub fn new(config: SessionConfig, loader: Box<dyn Loader>, input: I, out: W) -> Self {
        Self {
            context: DebugContext::new(config),
            loader,
            input,
            out,
        }
    }

    pub fn context(&self) -> &DebugContext {
        &self.context
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs the command loop until `quit` or end of input.
    pub fn debug(&mut self) -> Result<(), SessionError> {
        writeln!(self.out, "-------------------------------------")?;
        writeln!(self.out, "StackVM Debugger v{}", env!("CARGO_PKG_VERSION"))?;
        writeln!(self.out, "-------------------------------------")?;

        if !self.context.program_file.is_file() || !Path::new(&self.context.base_path).is_dir() {
            return Err(SessionError::Startup);
        }
        writeln!(
            self.out,
            "loaded executable: file='{}'",
            self.context.program_file.display()
        )?;
        writeln!(self.out, "source files: path='{}'", self.context.base_path)?;

        loop {
            let flow = match self.input.read_line(PROMPT) {
                Some(line) => self.process_command(&line, None)?,
                None => self.process_command("quit", None)?,
            };
            if flow == Flow::Quit {
                return Ok(());
            }
        }
    }

    /// Parses and executes one command line. `state` is present while the
    /// program is paused.
    ///
    /// Command failures are reported on the output; only console IO
    /// failures are returned.
    pub fn process_command(
        &mut self,
        line: &str,
        state: Option<&ExecState<'_>>,
    ) -> io::Result<Flow> {
        self.context.is_error = false;
        let line = line.trim();
        if line.is_empty() {
            return Ok(Flow::Prompt);
        }

        let command = match parse_command(&format!("{COMMAND_PREFIX}{line}")) {
            Ok(command) => command,
            Err(err) => {
                debug!(%err, line, "command rejected");
                writeln!(self.out, "-- Unable to process command --")?;
                self.context.is_error = true;
                return Ok(Flow::Prompt);
            }
        };

        match self.dispatch(command, state) {
            Ok(flow) => Ok(flow),
            Err(SessionError::Io(err)) | Err(SessionError::Runtime(RuntimeError::Io(err))) => {
                Err(err)
            }
            Err(err) => {
                writeln!(self.out, "{err}")?;
                self.context.is_error = true;
                Ok(Flow::Prompt)
            }
        }
    }

    fn dispatch(
        &mut self,
        command: Command,
        state: Option<&ExecState<'_>>,
    ) -> Result<Flow, SessionError> {
        match command {
            Command::LoadExecutable(file) => self.load_executable(&file, state.is_some())?,
            Command::SourceDirectory(dir) => self.source_directory(&dir, state.is_some())?,
            Command::Arguments(text) => {
                self.context.arguments = shlex::split(&text).unwrap_or_else(|| {
                    text.split_whitespace().map(str::to_string).collect()
                });
                writeln!(self.out, "program arguments set.")?;
            }
            Command::Break(position) => self.add_breakpoint(position)?,
            Command::Delete(position) => self.delete_breakpoint(position)?,
            Command::Breaks => self.list_breakpoints()?,
            Command::Clear => self.clear_breakpoints()?,
            Command::Print(expression) => self.print(&expression, state)?,
            Command::Run => return self.run(state.is_some()),
            Command::StepInto => return self.resume(StepCommand::StepInto, state),
            Command::NextLine => return self.resume(StepCommand::NextLine, state),
            Command::StepOut => return self.resume(StepCommand::StepOut, state),
            Command::Continue => return self.resume(StepCommand::Continue, state),
            Command::Memory => {
                let state = state.ok_or(SessionError::NotRunning)?;
                writeln!(
                    self.out,
                    "memory: allocated={} bytes, collected={} bytes",
                    state.heap.allocated_bytes(),
                    state.heap.collected_bytes()
                )?;
            }
            Command::Info { class, method } => {
                let state = state.ok_or(SessionError::NotRunning)?;
                self.info(state, class.as_deref(), method.as_deref())?;
            }
            Command::Stack => self.stack(state.ok_or(SessionError::NotRunning)?)?,
            Command::List(position) => self.list(position)?,
            Command::Quit => {
                self.context.breakpoints.clear();
                writeln!(self.out, "breakpoints cleared.")?;
                writeln!(self.out, "\nGoodbye...")?;
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Prompt)
    }

    fn load_executable(&mut self, file: &str, running: bool) -> Result<(), SessionError> {
        if running {
            return Err(SessionError::LoadWhileRunning);
        }
        let path = PathBuf::from(file);
        if !path.is_file() {
            return Err(SessionError::ExecutableNotFound);
        }
        self.context.program_file = path;
        self.context.stepper.reset();
        self.context.breakpoints.clear();
        self.context.arguments.clear();
        info!(file, "executable selected");
        writeln!(self.out, "loaded executable: file='{file}'")?;
        Ok(())
    }

    fn source_directory(&mut self, dir: &str, running: bool) -> Result<(), SessionError> {
        if running {
            return Err(SessionError::SourceWhileRunning);
        }
        if !Path::new(dir).is_dir() {
            return Err(SessionError::BasePathNotFound);
        }
        let base = normalize_base_path(dir);
        self.context.stepper.reset();
        self.context.breakpoints.set_source_root(base.clone());
        writeln!(self.out, "source files: path='{base}'")?;
        self.context.base_path = base;
        Ok(())
    }

    /// Fills in a `[file:]line` argument from the current stop and checks
    /// that the file is present under the source root.
    fn resolve_position(&self, position: FilePosition) -> Result<(String, i32), SessionError> {
        let current = self.context.stepper.current();
        let file = position
            .file
            .or_else(|| current.map(|stop| stop.file.clone()))
            .ok_or(SessionError::FileNotFound)?;
        let line = position
            .line
            .or_else(|| current.map(|stop| stop.line))
            .ok_or(SessionError::InvalidLine)?;
        if !self.context.source_path(&file).is_file() {
            return Err(SessionError::FileNotFound);
        }
        if line <= 0 {
            return Err(SessionError::InvalidLine);
        }
        Ok((file, line))
    }

    fn add_breakpoint(&mut self, position: FilePosition) -> Result<(), SessionError> {
        let (file, line) = self.resolve_position(position)?;
        if self.context.breakpoints.add(line, &file) {
            writeln!(self.out, "added breakpoint: file='{file}:{line}'")?;
        } else {
            writeln!(self.out, "breakpoint already exist.")?;
        }
        Ok(())
    }

    fn delete_breakpoint(&mut self, position: FilePosition) -> Result<(), SessionError> {
        let (file, line) = self.resolve_position(position)?;
        if self.context.breakpoints.remove(line, &file) {
            writeln!(self.out, "removed breakpoint: file='{file}:{line}'")?;
        } else {
            writeln!(self.out, "breakpoint doesn't exist.")?;
        }
        Ok(())
    }

    fn list_breakpoints(&mut self) -> Result<(), SessionError> {
        let points = self.context.breakpoints.list();
        if points.is_empty() {
            writeln!(self.out, "no breakpoints defined.")?;
            return Ok(());
        }
        writeln!(self.out, "breaks:")?;
        for point in points {
            writeln!(
                self.out,
                "  break: file='{}:{}'",
                point.file_name, point.line_number
            )?;
        }
        Ok(())
    }

    fn clear_breakpoints(&mut self) -> Result<(), SessionError> {
        let answer = self.input.read_line(CLEAR_PROMPT).unwrap_or_default();
        if matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            self.context.breakpoints.clear();
            writeln!(self.out, "breakpoints cleared.")?;
        }
        Ok(())
    }

    fn print(
        &mut self,
        expression: &Expression,
        state: Option<&ExecState<'_>>,
    ) -> Result<(), SessionError> {
        let scope = state.map(EvalScope::from);
        let value = ExpressionEvaluator::new(scope).evaluate(expression)?;
        if expression.is_boolean() {
            writeln!(self.out, "print: type=Bool, value={}", value.is_truthy())?;
        } else {
            writeln!(self.out, "print: {}", value.describe(scope.as_ref()))?;
        }
        Ok(())
    }

    fn run(&mut self, running: bool) -> Result<Flow, SessionError> {
        if running {
            return Err(SessionError::AlreadyRunning);
        }
        if self.context.program_file.as_os_str().is_empty() {
            return Err(SessionError::NoProgram);
        }
        let program = self.loader.load(&self.context.program_file)?;
        let arguments = self.context.arguments.clone();
        let mut interpreter = Interpreter::new(program);

        self.context.stepper.reset();
        let status = interpreter.execute(&arguments, self);
        self.context.stepper.reset();

        match status? {
            ExitStatus::Halted => Ok(Flow::Quit),
            ExitStatus::Completed => {
                info!(
                    allocated = interpreter.heap().allocated_bytes(),
                    "program completed"
                );
                Ok(Flow::Prompt)
            }
        }
    }

    fn resume(
        &mut self,
        command: StepCommand,
        state: Option<&ExecState<'_>>,
    ) -> Result<Flow, SessionError> {
        if state.is_none() {
            return Err(SessionError::NotRunning);
        }
        self.context.stepper.arm(command);
        Ok(Flow::Resume)
    }

    fn info(
        &mut self,
        state: &ExecState<'_>,
        class: Option<&str>,
        method: Option<&str>,
    ) -> Result<(), SessionError> {
        let Some(class_name) = class else {
            writeln!(self.out, "general info:")?;
            writeln!(
                self.out,
                "  program executable: file='{}'",
                self.context.program_file.display()
            )?;
            writeln!(
                self.out,
                "  current file='{}:{}', method='{}'",
                state.file,
                state.line,
                state.program.method_label(state.frame.method)
            )?;
            return Ok(());
        };

        let klass = state
            .program
            .class_by_name(class_name)
            .ok_or(SessionError::UnknownClass)?;
        let Some(method_name) = method else {
            writeln!(self.out, "  class: type={}", klass.name)?;
            self.declarations("instance", &klass.instance_declarations)?;
            self.declarations("class", &klass.class_declarations)?;
            return Ok(());
        };

        let mut methods = klass.methods_named(method_name).peekable();
        if methods.peek().is_none() {
            return Err(SessionError::UnknownMethod);
        }
        for method in methods {
            writeln!(
                self.out,
                "  class: type={}, method={}",
                klass.name,
                method.display_name()
            )?;
            self.declarations("local", &method.declarations)?;
        }
        Ok(())
    }

    fn declarations(&mut self, title: &str, declarations: &[StackDclr]) -> io::Result<()> {
        if declarations.is_empty() {
            return Ok(());
        }
        writeln!(self.out, "  {title} declarations:")?;
        for dclr in declarations {
            writeln!(
                self.out,
                "    {title}: name='{}', type={}",
                dclr.short_name(),
                dclr.kind
            )?;
        }
        Ok(())
    }

    fn stack(&mut self, state: &ExecState<'_>) -> Result<(), SessionError> {
        let program = state.program;
        let frame_line = |pos: usize, method: MethodId, line: i32| {
            let class = program.class(method.class);
            let name = program
                .method(method)
                .map_or_else(|| String::from("?"), |method| method.display_name());
            format!(
                "  frame: pos={pos}, class={}, method={name}, file={}:{line}",
                class.map_or("?", |klass| klass.name.as_str()),
                class.map_or("", |klass| klass.file_name.as_str()),
            )
        };

        writeln!(self.out, "stack:")?;
        writeln!(
            self.out,
            "{}",
            frame_line(state.call_stack_pos(), state.frame.method, state.line)
        )?;
        for (pos, caller) in state.call_stack.iter().enumerate().rev() {
            // callers have already advanced past their call instruction
            let line = program
                .method(caller.method)
                .and_then(|method| method.line_at(caller.ip.saturating_sub(1)))
                .unwrap_or(-1);
            writeln!(self.out, "{}", frame_line(pos, caller.method, line))?;
        }
        Ok(())
    }

    fn list(&mut self, position: FilePosition) -> Result<(), SessionError> {
        let current = self.context.stepper.current().cloned();
        let file = position
            .file
            .or_else(|| current.as_ref().map(|stop| stop.file.clone()))
            .ok_or(SessionError::SourceNotAvailable)?;
        let line = position
            .line
            .or_else(|| current.as_ref().map(|stop| stop.line))
            .ok_or(SessionError::SourceNotAvailable)?;

        let source = SourceFile::load(&self.context.source_path(&file))
            .map_err(|_| SessionError::SourceNotAvailable)?;
        let breakpoints = &self.context.breakpoints;
        let current_line = current
            .filter(|stop| breakpoints.same_file(&stop.file, &file))
            .map(|stop| stop.line);
        let lines = source.window(line, current_line, |number| {
            breakpoints.find(number, &file).is_some()
        })?;
        for text in lines {
            writeln!(self.out, "{text}")?;
        }
        Ok(())
    }
}

impl<I: CommandSource, W: Write> DebugHook for DebugSession<I, W> {
    fn on_instruction(&mut self, state: &ExecState<'_>) -> io::Result<Resume> {
        let event = StepEvent {
            method: state.frame.method,
            call_stack_pos: state.call_stack_pos(),
            line: state.line,
            file: state.file,
        };
        if self.context.stepper.observe(&event, &self.context.breakpoints) == StepDecision::Continue
        {
            return Ok(Resume::Continue);
        }

        debug!(
            breakpoint = self.context.breakpoint_at(state.line).is_some(),
            depth = event.call_stack_pos,
            "paused"
        );
        writeln!(
            self.out,
            "break: file='{}:{}', method='{}'",
            state.file,
            state.line,
            state.program.method_label(state.frame.method)
        )?;
        loop {
            let flow = match self.input.read_line(PROMPT) {
                Some(line) => self.process_command(&line, Some(state))?,
                None => self.process_command("quit", Some(state))?,
            };
            match flow {
                Flow::Prompt => {}
                Flow::Resume => return Ok(Resume::Continue),
                Flow::Quit => return Ok(Resume::Halt),
            }
        }
    }
}
