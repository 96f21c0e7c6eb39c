//! Lexer, AST and parser for the typed source language
//!
//! The language is a statically typed superset of JavaScript. This crate
//! turns source text into [`SourceFile`] trees; name resolution and typing
//! live in `tsgm-checker`.

pub mod ast;
pub mod error;
pub mod jsdoc;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod token;

pub use ast::*;
pub use error::{ParseError, Result};
pub use jsdoc::{jsdoc_of, parse_jsdoc};
pub use lexer::Lexer;
pub use parser::{parse_source_file, Parser};
pub use span::{ByteOffset, FileId, LineMap, Position, Span};
pub use token::{Comment, Token, TokenKind};
