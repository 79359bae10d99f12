//! Error-tolerant parsing.
//!
//! The source is parsed as-is first. When that fails (no tree, or a tree
//! whose error statements swallowed declarations) the source is patched
//! and parsed again, trying one [`Sanitize`] strategy after the other. The
//! last resort is a tree holding a single error statement, so a caller
//! always gets a program back.

pub mod context;
pub mod sanitize;
pub mod validity;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use bumpalo::Bump;
use serde::Serialize;
use tracing::{debug, trace};

use crate::ast::{Program, Stmt, StmtId};
use crate::config::ParserConfig;
use crate::error_handler::{Diagnostic, ErrorHandler, Severity};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::source::SourceHolder;
use crate::span::Span;

pub use context::{Context, SanitizedPart};

pub const FATAL_ERROR_MESSAGE: &str = "Unable to parse the source: fatal syntax error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Sanitize {
    None,
    MissingCurly,
    RequireFunctionIncomplete,
    SyntaxErrorCurrent,
    SyntaxErrorPrevious,
    SyntaxErrorPreviousLine,
    EditedLine,
    SyntaxErrorBlock,
    /// Nothing worked; the tree is a single error statement.
    Fatal,
}

impl Sanitize {
    pub fn next(self) -> Sanitize {
        match self {
            Sanitize::None => Sanitize::MissingCurly,
            Sanitize::MissingCurly => Sanitize::RequireFunctionIncomplete,
            Sanitize::RequireFunctionIncomplete => Sanitize::SyntaxErrorCurrent,
            Sanitize::SyntaxErrorCurrent => Sanitize::SyntaxErrorPrevious,
            Sanitize::SyntaxErrorPrevious => Sanitize::SyntaxErrorPreviousLine,
            Sanitize::SyntaxErrorPreviousLine => Sanitize::EditedLine,
            Sanitize::EditedLine => Sanitize::SyntaxErrorBlock,
            Sanitize::SyntaxErrorBlock | Sanitize::Fatal => Sanitize::Fatal,
        }
    }

    /// Strategies that work from the recorded syntax errors.
    fn needs_errors(self) -> bool {
        self >= Sanitize::RequireFunctionIncomplete && self <= Sanitize::SyntaxErrorBlock
    }
}

#[derive(Debug, Serialize)]
pub struct ParseResult<'ast> {
    #[serde(skip)]
    pub program: Program<'ast>,
    pub diagnostics: Vec<Diagnostic>,
    /// Strategy that produced `program`.
    pub sanitize: Sanitize,
    pub sanitized_part: Option<SanitizedPart>,
    /// Text the spans of `program` refer to.
    pub source: String,
    /// Number of parses run.
    pub rounds: usize,
}

impl ParseResult<'_> {
    pub fn is_clean(&self) -> bool {
        self.sanitize == Sanitize::None && self.diagnostics.is_empty()
    }
}

pub struct RecoveringParser {
    config: ParserConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl RecoveringParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config, cancel: None }
    }

    /// Polled while scanning error statements. Once raised, the tree at hand
    /// is accepted.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse a source holder. Unregistered file extensions yield an empty
    /// program without parsing.
    pub fn parse_source<'ast>(&self, holder: &dyn SourceHolder, arena: &'ast Bump) -> ParseResult<'ast> {
        let registered = holder.file_extension().is_some_and(|ext| self.config.is_registered(ext));
        if !registered {
            debug!(extension = ?holder.file_extension(), "skipping unregistered extension");
            return ParseResult {
                program: Program { statements: &[], span: Span::empty_at(0) },
                diagnostics: Vec::new(),
                sanitize: Sanitize::None,
                sanitized_part: None,
                source: holder.text().to_string(),
                rounds: 0,
            };
        }
        self.parse(holder.text(), holder.caret_offset(), arena)
    }

    pub fn parse<'ast>(&self, source: &str, caret: Option<usize>, arena: &'ast Bump) -> ParseResult<'ast> {
        let mut ctx = Context::new(source, caret);
        let mut outer = ErrorHandler::new();

        let (program, balance) = self.parse_round(ctx.source(), arena, &mut outer);
        let mut rounds = 1;
        let accepted = program.filter(|p| self.is_acceptable(p, ctx.source()));
        debug!(state = ?Sanitize::None, parsed = accepted.is_some(), balance, "parse round");

        if balance == 0 {
            if let Some(program) = accepted {
                return self.finish(&ctx, program, &outer, Sanitize::None, rounds);
            }
        }

        let mut state = Sanitize::MissingCurly;
        if balance != 0 {
            if let Some(program) = self.attempt(&mut ctx, Sanitize::MissingCurly, &outer, arena, &mut rounds) {
                return self.finish(&ctx, program, &outer, Sanitize::MissingCurly, rounds);
            }
            if let Some(program) = accepted {
                return self.finish(&ctx, program, &outer, Sanitize::None, rounds);
            }
            state = state.next();
        }

        while state != Sanitize::Fatal {
            if state.needs_errors() && outer.syntax_errors().is_empty() {
                break;
            }
            if let Some(program) = self.attempt(&mut ctx, state, &outer, arena, &mut rounds) {
                return self.finish(&ctx, program, &outer, state, rounds);
            }
            state = state.next();
        }

        debug!(rounds, "recovery exhausted");
        self.fatal(source, arena, rounds)
    }

    /// Compute the patch for `state` and parse the patched source with a
    /// disabled handler. `None` when the strategy declines or the parse
    /// still fails.
    fn attempt<'ast>(
        &self,
        ctx: &mut Context<'_>,
        state: Sanitize,
        outer: &ErrorHandler,
        arena: &'ast Bump,
        rounds: &mut usize,
    ) -> Option<Program<'ast>> {
        let part = self.sanitized_part(ctx, state, outer)?;
        trace!(?state, span = ?part.span(), replacement = part.replacement(), "sanitized part");
        ctx.set_sanitized_part(part);

        let mut handler = ErrorHandler::disabled();
        let (program, _) = self.parse_round(ctx.source(), arena, &mut handler);
        *rounds += 1;
        let accepted = program.filter(|p| self.is_acceptable(p, ctx.source()));
        debug!(?state, parsed = accepted.is_some(), errors = handler.syntax_errors().len(), "parse round");
        accepted
    }

    fn sanitized_part(&self, ctx: &Context<'_>, state: Sanitize, outer: &ErrorHandler) -> Option<SanitizedPart> {
        let base = ctx.base();
        let options = self.config.lexer_options();
        if state == Sanitize::MissingCurly {
            return sanitize::missing_curly(base, options);
        }
        let error = outer.first_error()?;
        match state {
            Sanitize::RequireFunctionIncomplete => sanitize::require_function_incomplete(base, error),
            Sanitize::SyntaxErrorCurrent => sanitize::syntax_error_current(base, error),
            Sanitize::SyntaxErrorPrevious => sanitize::syntax_error_previous(base, error),
            Sanitize::SyntaxErrorPreviousLine => sanitize::syntax_error_previous_line(base, error),
            Sanitize::EditedLine => sanitize::edited_line(base, ctx.caret_offset()),
            Sanitize::SyntaxErrorBlock => sanitize::syntax_error_block(base, options, error),
            Sanitize::None | Sanitize::MissingCurly | Sanitize::Fatal => None,
        }
    }

    fn parse_round<'ast>(
        &self,
        source: &str,
        arena: &'ast Bump,
        handler: &mut ErrorHandler,
    ) -> (Option<Program<'ast>>, isize) {
        let lexer = Lexer::with_options(source.as_bytes(), self.config.lexer_options());
        let mut parser = Parser::new(lexer, arena, handler);
        let program = parser.parse_program();
        (program, parser.curly_balance())
    }

    fn is_acceptable(&self, program: &Program<'_>, source: &str) -> bool {
        validity::is_acceptable(program, source, self.config.lexer_options(), self.cancel.as_deref())
    }

    fn finish<'ast>(
        &self,
        ctx: &Context<'_>,
        program: Program<'ast>,
        outer: &ErrorHandler,
        sanitize: Sanitize,
        rounds: usize,
    ) -> ParseResult<'ast> {
        // A declined MissingCurly patch may still sit in the context
        let (sanitized_part, source) = match sanitize {
            Sanitize::None => (None, ctx.base()),
            _ => (ctx.sanitized_part().cloned(), ctx.source()),
        };
        ParseResult {
            program,
            diagnostics: outer.diagnostics(ctx.base()),
            sanitize,
            sanitized_part,
            source: source.to_string(),
            rounds,
        }
    }

    fn fatal<'ast>(&self, source: &str, arena: &'ast Bump, rounds: usize) -> ParseResult<'ast> {
        let span = Span::new(0, source.len());
        let error: StmtId<'ast> = arena.alloc(Stmt::Error { span });
        ParseResult {
            program: Program { statements: arena.alloc_slice_copy(&[error]), span },
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                message: FATAL_ERROR_MESSAGE.to_string(),
                start: span.start,
                end: span.end,
                payload: None,
            }],
            sanitize: Sanitize::Fatal,
            sanitized_part: None,
            source: source.to_string(),
            rounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_run_in_order() {
        let mut state = Sanitize::None;
        let mut seen = vec![state];
        while state != Sanitize::Fatal {
            state = state.next();
            seen.push(state);
        }
        assert_eq!(seen.len(), 9);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn error_driven_states() {
        assert!(!Sanitize::MissingCurly.needs_errors());
        assert!(Sanitize::RequireFunctionIncomplete.needs_errors());
        assert!(Sanitize::SyntaxErrorBlock.needs_errors());
        assert!(!Sanitize::Fatal.needs_errors());
    }
}
