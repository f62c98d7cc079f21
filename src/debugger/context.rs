use super::breakpoints::{Breakpoint, BreakpointRegistry};
use super::stepping::StepController;
use crate::config::SessionConfig;
use std::path::{Path, PathBuf};

/// State that outlives a single run: breakpoints, stepping, and what to run.
#[derive(Debug)]
pub struct DebugContext {
    pub(super) breakpoints: BreakpointRegistry,
    pub(super) stepper: StepController,
    pub(super) program_file: PathBuf,
    pub(super) base_path: String,
    pub(super) arguments: Vec<String>,
    pub(super) is_error: bool,
}

impl DebugContext {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            breakpoints: BreakpointRegistry::new(config.base_path.clone()),
            stepper: StepController::new(),
            program_file: config.program_file,
            base_path: config.base_path,
            arguments: config.arguments,
            is_error: false,
        }
    }

    /// Whether the last processed command failed.
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    pub fn breakpoints(&self) -> &BreakpointRegistry {
        &self.breakpoints
    }

    pub fn stepper(&self) -> &StepController {
        &self.stepper
    }

    pub fn program_file(&self) -> &Path {
        &self.program_file
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Breakpoint on `line` of the file the program is stopped in.
    pub fn breakpoint_at(&self, line: i32) -> Option<&Breakpoint> {
        let stop = self.stepper.current()?;
        self.breakpoints.find(line, &stop.file)
    }

    /// `file` joined onto the source directory unless it is already absolute
    /// or already carries the source directory.
    pub fn source_path(&self, file: &str) -> PathBuf {
        if Path::new(file).is_absolute() || file.starts_with(&self.base_path) {
            PathBuf::from(file)
        } else {
            PathBuf::from(format!("{}{file}", self.base_path))
        }
    }
}
