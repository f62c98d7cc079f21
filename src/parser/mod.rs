mod commands;
mod scanner;
mod types;

pub use commands::parse_command;
pub use scanner::{tokenize, Keyword, ParseError, Token, COMMAND_PREFIX};
pub use types::{BinaryOp, Command, Expression, FilePosition, Reference};
