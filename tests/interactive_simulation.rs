// tests/interactive_simulation.rs
// Simulates interactive debugging sessions end to end

mod common;

use common::Project;
use stackvm_debugger::config::SessionConfig;
use stackvm_debugger::debugger::{DebugSession, ScriptedInput, SessionError, StopPoint};
use stackvm_debugger::executor::Interpreter;
use stackvm_debugger::vm::{DebugHook, ExecState, ImageLoader, Loader, Resume};
use std::io;

// Helper to run a scripted session and capture everything it printed
fn run_session(project: &Project, commands: &[&str]) -> String {
    let config = SessionConfig::new(project.image(), &project.src());
    let input = ScriptedInput::new(commands.iter().copied());
    let mut session = DebugSession::new(config, Box::new(ImageLoader), input, Vec::new());
    session.debug().expect("session should end cleanly");
    String::from_utf8(session.into_output()).expect("output is utf-8")
}

// Helper to find the line following a marker in the output
fn line_after<'a>(output: &'a str, marker: &str) -> Option<&'a str> {
    let mut lines = output.lines();
    lines.find(|line| line.contains(marker))?;
    lines.next()
}

/// Forwards every instruction to a session, then runs one more command
/// the first time the session has stopped on `file:line`.
struct AfterStop<'s> {
    session: &'s mut DebugSession<ScriptedInput, Vec<u8>>,
    file: &'static str,
    line: i32,
    command: &'static str,
    // stop point before and after the command, and whether it failed
    seen: Option<(Option<StopPoint>, Option<StopPoint>, bool)>,
}

impl DebugHook for AfterStop<'_> {
    fn on_instruction(&mut self, state: &ExecState<'_>) -> io::Result<Resume> {
        let resume = self.session.on_instruction(state)?;
        if self.seen.is_none() && state.file == self.file && state.line == self.line {
            let before = self.session.context().stepper().current().cloned();
            self.session.process_command(self.command, Some(state))?;
            let failed = self.session.context().is_error();
            let after = self.session.context().stepper().current().cloned();
            self.seen = Some((before, after, failed));
        }
        Ok(resume)
    }
}

#[cfg(test)]
mod session_tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_startup_requires_program_and_sources() {
        let project = Project::new("startup");
        let config = SessionConfig::new(project.path("missing.json"), &project.src());
        let mut session = DebugSession::new(
            config,
            Box::new(ImageLoader),
            ScriptedInput::new(["quit"]),
            Vec::new(),
        );
        assert_matches!(session.debug(), Err(SessionError::Startup));

        let config = SessionConfig::new(project.image(), "/no/such/source/dir");
        let mut session = DebugSession::new(
            config,
            Box::new(ImageLoader),
            ScriptedInput::new(["quit"]),
            Vec::new(),
        );
        assert_matches!(session.debug(), Err(SessionError::Startup));
    }

    #[test]
    fn test_banner_and_quit() {
        let project = Project::new("quit");
        let output = run_session(&project, &["quit"]);

        assert!(output.contains("StackVM Debugger v"));
        assert!(output.contains(&format!(
            "loaded executable: file='{}'",
            project.image().display()
        )));
        assert!(output.contains("source files: path='"));
        assert!(output.contains("breakpoints cleared."));
        assert!(output.trim_end().ends_with("Goodbye..."));
    }

    #[test]
    fn test_end_of_input_behaves_like_quit() {
        let project = Project::new("eof");
        let output = run_session(&project, &["break main.obs:10"]);
        assert!(output.contains("added breakpoint: file='main.obs:10'"));
        assert!(output.trim_end().ends_with("Goodbye..."));
    }

    #[test]
    fn test_breakpoint_management() {
        let project = Project::new("breaks");
        let output = run_session(
            &project,
            &[
                "breaks",
                "break main.obs:10",
                "break main.obs:10",
                "b point.obs:4",
                "breaks",
                "delete main.obs:10",
                "delete main.obs:10",
                "break nowhere.obs:3",
                "break main.obs:0",
                "clear",
                "n",
                "breaks",
                "clear",
                "yes",
                "breaks",
                "quit",
            ],
        );

        assert!(output.contains("added breakpoint: file='main.obs:10'"));
        assert!(output.contains("breakpoint already exist."));
        assert!(output.contains("added breakpoint: file='point.obs:4'"));
        assert_eq!(
            line_after(&output, "breaks:"),
            Some("  break: file='main.obs:10'")
        );
        assert!(output.contains("  break: file='point.obs:4'"));
        assert!(output.contains("removed breakpoint: file='main.obs:10'"));
        assert!(output.contains("breakpoint doesn't exist."));
        assert!(output.contains("file doesn't exist or isn't loaded."));
        assert!(output.contains("invalid line number."));
        assert!(output.contains("breakpoints cleared."));
        assert_eq!(output.matches("no breakpoints defined.").count(), 2);
    }

    #[test]
    fn test_commands_needing_a_running_program() {
        let project = Project::new("idle");
        let output = run_session(
            &project,
            &["step", "next", "out", "cont", "stack", "memory", "info", "print a", "quit"],
        );
        assert_eq!(output.matches("program is not running.").count(), 8);
    }

    #[test]
    fn test_literal_print_and_bad_syntax() {
        let project = Project::new("literals");
        let output = run_session(
            &project,
            &["print 2 + 3.0", "print 1 < 2", "print 5 % 0", "print (1 +", "frobnicate", "quit"],
        );
        assert!(output.contains("print: type=Float, value=5"));
        assert!(output.contains("print: type=Bool, value=true"));
        assert!(output.contains("modulus operation requires integer values."));
        assert_eq!(output.matches("-- Unable to process command --").count(), 2);
    }

    #[test]
    fn test_load_and_source_commands() {
        let project = Project::new("load");
        let image = project.image();
        let output = run_session(
            &project,
            &[
                &format!("exe \"{}\"", image.display()),
                "exe \"/no/such/program.json\"",
                &format!("src \"{}\"", project.src()),
                "src \"/no/such/dir\"",
                "args \"alpha 'beta gamma'\"",
                "quit",
            ],
        );
        assert!(output.contains(&format!("loaded executable: file='{}'", image.display())));
        assert!(output.contains("program file doesn't exist."));
        assert!(output.contains(&format!("source files: path='{}/'", project.src())));
        assert!(output.contains("unable to locate base path."));
        assert!(output.contains("program arguments set."));
    }

    #[test]
    fn test_source_directory_forgets_last_stop() {
        let project = Project::new("resrc");
        let config = SessionConfig::new(project.image(), &project.src());
        let script = [
            "break main.obs:10".to_string(),
            "run".to_string(),
            "cont".to_string(),
            format!("src \"{}\"", project.src()),
            "list".to_string(),
            "quit".to_string(),
        ];
        let mut session = DebugSession::new(
            config,
            Box::new(ImageLoader),
            ScriptedInput::new(script),
            Vec::new(),
        );
        session.debug().expect("session should end cleanly");

        assert!(session.context().stepper().current().is_none());
        assert_eq!(
            session.context().base_path(),
            format!("{}/", project.src())
        );
        let output = String::from_utf8(session.into_output()).expect("output is utf-8");
        assert!(output.contains("break: file='main.obs:10'"));
        assert!(output
            .contains("source file or line number doesn't exist, ensure the program is running."));
    }
}

#[cfg(test)]
mod debugging_tests {
    use super::*;

    #[test]
    fn test_break_inspect_and_continue() {
        let project = Project::new("inspect");
        let output = run_session(
            &project,
            &[
                "break main.obs:10",
                "break main.obs:12",
                "run",
                "info",
                "print a",
                "print grid",
                "print grid[1, 2]",
                "print grid[2, 0]",
                "print grid[1]",
                "print total",
                "print Main->total",
                "print a > 3",
                "run",
                "cont",
                "print p->x",
                "print name",
                "memory",
                "cont",
                "quit",
            ],
        );

        assert!(output.contains("break: file='main.obs:10', method='Main->main(..)'"));
        assert_eq!(
            line_after(&output, "general info:"),
            Some(format!("  program executable: file='{}'", project.image().display()).as_str())
        );
        assert!(output.contains("  current file='main.obs:10', method='Main->main(..)'"));
        assert!(output.contains("print: type=Int, value=5"));
        assert!(output.contains("dimension=2, size=6"));
        assert!(output.contains("print: type=Int, value=7"));
        assert!(output.contains("array index out of bounds."));
        assert!(output.contains("array dimension mismatch."));
        assert_eq!(output.matches("print: type=Int, value=42").count(), 2);
        assert!(output.contains("print: type=Bool, value=true"));
        assert!(output.contains("instance already running."));

        // the second instruction on line 10 must not re-trigger the breakpoint
        assert_eq!(output.matches("break: file='main.obs:10'").count(), 1);
        assert!(output.contains("break: file='main.obs:12', method='Main->main(..)'"));
        assert!(output.contains("print: type=Int, value=3"));
        assert!(output.contains("print: type=System.String, value=\"hello\""));
        assert!(output.contains("memory: allocated="));
    }

    #[test]
    fn test_step_next_and_out() {
        let project = Project::new("stepping");
        let output = run_session(
            &project,
            &[
                "break main.obs:9",
                "run",
                "step",
                "step",
                "print dx",
                "stack",
                "out",
                "next",
                "cont",
                "quit",
            ],
        );

        let stops: Vec<&str> = output
            .lines()
            .filter(|line| line.starts_with("break: "))
            .collect();
        assert_eq!(
            stops,
            vec![
                "break: file='main.obs:9', method='Main->main(..)'",
                "break: file='main.obs:10', method='Main->main(..)'",
                "break: file='point.obs:3', method='Point->move(..)'",
                "break: file='main.obs:10', method='Main->main(..)'",
                "break: file='main.obs:11', method='Main->main(..)'",
            ]
        );
        assert!(output.contains("print: type=Int, value=3"));
        assert_eq!(
            line_after(&output, "stack:"),
            Some("  frame: pos=1, class=Point, method=move(dx:Int), file=point.obs:3")
        );
        assert!(output
            .contains("  frame: pos=0, class=Main, method=main(args:String[]), file=main.obs:10"));
    }

    #[test]
    fn test_list_marks_current_line_and_breakpoints() {
        let project = Project::new("listing");
        let output = run_session(
            &project,
            &[
                "break main.obs:10",
                "break main.obs:12",
                "run",
                "list",
                "list point.obs:3",
                "list main.obs:40",
                "quit",
            ],
        );

        assert!(output.contains("=>   10:         p->Move(3);"));
        assert!(output.contains(" #   12:     }"));
        assert!(output.contains("      5:         a := 5; total := 42;"));
        assert!(output.contains("     13: }"));
        // listing another file shows no current-line marker
        assert!(output.contains("      3:         @x := dx;"));
        assert!(output.contains("      1: class Point {"));
        assert!(output.contains("invalid line number."));
    }

    #[test]
    fn test_failed_print_keeps_stop_point() {
        let project = Project::new("keepstop");
        let config = SessionConfig::new(project.image(), &project.src());
        let mut session = DebugSession::new(
            config,
            Box::new(ImageLoader),
            ScriptedInput::new(["cont"]),
            Vec::new(),
        );
        session
            .process_command("break main.obs:10", None)
            .expect("output is writable");

        let program = ImageLoader.load(&project.image()).expect("fixture loads");
        let mut hook = AfterStop {
            session: &mut session,
            file: "main.obs",
            line: 10,
            command: "print grid[1]",
            seen: None,
        };
        Interpreter::new(program)
            .execute(&[], &mut hook)
            .expect("fixture runs");
        let (before, after, failed) = hook.seen.expect("program stopped on main.obs:10");

        assert!(failed);
        assert_eq!(
            before.as_ref().map(|stop| (stop.file.as_str(), stop.line)),
            Some(("main.obs", 10))
        );
        assert_eq!(before, after);
        let output = String::from_utf8(session.into_output()).expect("output is utf-8");
        assert!(output.contains("array dimension mismatch."));
    }

    #[test]
    fn test_list_without_position_needs_a_stop() {
        let project = Project::new("nolist");
        let output = run_session(&project, &["list", "quit"]);
        assert!(output
            .contains("source file or line number doesn't exist, ensure the program is running."));
    }

    #[test]
    fn test_info_for_classes_and_methods() {
        let project = Project::new("info");
        let output = run_session(
            &project,
            &[
                "break main.obs:5",
                "run",
                "info class=Point",
                "info class=Point method=move",
                "info class=Nope",
                "info class=Point method=nope",
                "quit",
            ],
        );

        assert!(output.contains("  class: type=Point"));
        assert!(output.contains("    instance: name='x', type=Int"));
        assert!(output.contains("  class: type=Point, method=move(dx:Int)"));
        assert!(output.contains("    local: name='dx', type=Int"));
        assert!(output.contains("unable to find class."));
        assert!(output.contains("unable to find method."));
    }

    #[test]
    fn test_quit_while_paused_halts_program() {
        let project = Project::new("halt");
        let output = run_session(&project, &["break main.obs:6", "run", "quit", "print 1"]);
        assert!(output.contains("break: file='main.obs:6'"));
        assert!(output.trim_end().ends_with("Goodbye..."));
        assert!(!output.contains("print: type=Int, value=1"));
    }
}
