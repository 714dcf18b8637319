// src/lexer/mod.rs
pub mod scan;
pub mod source;
pub mod tables;

pub use scan::{Position, Token, Tokenizer, scan_all};
pub use source::{CharSource, ReaderSource, StrSource, open_file};
