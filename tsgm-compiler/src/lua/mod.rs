//! Lua syntax tree and printer

pub mod ast;
pub mod printer;

pub use ast::{Block, Expression, Statement};
pub use printer::LuaPrinter;
