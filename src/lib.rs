pub mod config;
pub mod debugger;
pub mod eval;
pub mod executor;
pub mod parser;
pub mod vm;
