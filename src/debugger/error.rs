use super::source::SourceError;
use crate::eval::EvalError;
use crate::executor::RuntimeError;
use crate::vm::LoadError;
use std::io;
use thiserror::Error;

/// Failures of a debugger command. The message is what the user sees.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("program is not running.")]
    NotRunning,

    #[error("instance already running.")]
    AlreadyRunning,

    #[error("unable to load executable while program is running.")]
    LoadWhileRunning,

    #[error("unable to change source path while program is running.")]
    SourceWhileRunning,

    #[error("program file doesn't exist.")]
    ExecutableNotFound,

    #[error("unable to locate base path.")]
    BasePathNotFound,

    #[error("file doesn't exist or isn't loaded.")]
    FileNotFound,

    #[error("source file or line number doesn't exist, ensure the program is running.")]
    SourceNotAvailable,

    #[error("program file not specified.")]
    NoProgram,

    #[error("unable to load executable or locate base path.")]
    Startup,

    #[error("unable to find class.")]
    UnknownClass,

    #[error("unable to find method.")]
    UnknownMethod,

    #[error("invalid line number.")]
    InvalidLine,

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Source(#[from] SourceError),

    /// Console failure; ends the session.
    #[error(transparent)]
    Io(#[from] io::Error),
}
