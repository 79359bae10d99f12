pub mod ast;
pub mod config;
pub mod error;
pub mod error_handler;
pub mod lexer;
pub mod parser;
pub mod phpdoc;
pub mod recovery;
pub mod source;
pub mod span;

pub use config::ParserConfig;
pub use error::{Error, Result};
pub use phpdoc::{PhpDocBlock, PhpDocParser};
pub use recovery::{ParseResult, RecoveringParser, Sanitize};
pub use source::{FileSnapshot, SourceHolder, StringSource};
pub use span::Span;
