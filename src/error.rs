use thiserror::Error;

use crate::token::{Span, Spanned, TokenKind};

/// The first error found by the pipeline. Each variant belongs to one stage.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("parse error at {0:#}")]
    Parse(Spanned<ParseError>),
    #[error("bind error at {0:#}")]
    Bind(Spanned<BindError>),
    #[error("type error at {0:#}")]
    Type(Spanned<TypeError>),
    #[error("lower error: {0}")]
    Lower(#[from] LowerError),
}

impl CompileError {
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Parse(e) => Some(e.span),
            CompileError::Bind(e) => Some(e.span),
            CompileError::Type(e) => Some(e.span),
            CompileError::Lower(_) => None,
        }
    }
}

impl From<Spanned<ParseError>> for CompileError {
    fn from(value: Spanned<ParseError>) -> Self {
        CompileError::Parse(value)
    }
}

impl From<Spanned<BindError>> for CompileError {
    fn from(value: Spanned<BindError>) -> Self {
        CompileError::Bind(value)
    }
}

impl From<Spanned<TypeError>> for CompileError {
    fn from(value: Spanned<TypeError>) -> Self {
        CompileError::Type(value)
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum ParseError {
    #[error("expected token {expected:?}, but got {actual:?}")]
    Unexpected {
        actual: TokenKind,
        expected: TokenKind,
    },
    #[error("expected one of {expected:?}, but got {actual:?}")]
    UnexpectedAny {
        actual: TokenKind,
        expected: Box<[TokenKind]>,
    },
    #[error("unexpected token {token:?} in expression")]
    UnexpectedTokenInExpr { token: TokenKind },
    #[error("expected a function or type declaration, but got {actual:?}")]
    ExpectedDeclaration { actual: TokenKind },
    #[error("the first body of a let cannot be an if without else or a foreach")]
    SelfAssigningFirstBody,
    #[error("invalid number literal")]
    InvalidNumber,
    #[error("{0}")]
    Lexer(LexError),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unexpected character")]
    UnexpectedChar,
    #[error("unclosed string")]
    UnclosedString,
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum BindError {
    #[error("{name} is not defined")]
    UndefinedName { name: Box<str> },
    #[error("type {name} is not defined")]
    UndefinedType { name: Box<str> },
    #[error("{name} is a {actual}, but a {expected} was expected")]
    WrongKind {
        name: Box<str>,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("{name} is already declared in this scope")]
    Duplicate { name: Box<str> },
    #[error("type {name} takes {expected} type arguments, but got {actual}")]
    GenericArity {
        name: Box<str>,
        expected: usize,
        actual: usize,
    },
    #[error("{name} takes {expected} arguments, but got {actual}")]
    Arity {
        name: Box<str>,
        expected: usize,
        actual: usize,
    },
    #[error("type {record} has no field {field}")]
    UndefinedField { record: Box<str>, field: Box<str> },
    #[error("{name} belongs to an enclosing function and cannot be captured")]
    Captured { name: Box<str> },
    #[error("too many {what}")]
    TooMany { what: &'static str },
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum TypeError {
    #[error("operator {op} cannot be applied to {lhs} and {rhs}")]
    Operands {
        op: &'static str,
        lhs: String,
        rhs: String,
    },
    #[error("argument {position} of {name}: expected type {expected}, but got {actual}")]
    Argument {
        name: Box<str>,
        position: usize,
        expected: String,
        actual: String,
    },
    #[error("field {field} of {record}: expected type {expected}, but got {actual}")]
    Field {
        record: Box<str>,
        field: Box<str>,
        expected: String,
        actual: String,
    },
    #[error("condition must be Boolean, but got {actual}")]
    Condition { actual: String },
    #[error("if branches disagree: then is {then}, but else is {otherwise}")]
    Branches { then: String, otherwise: String },
    #[error("foreach expects a sequence, but got {actual}")]
    NotASequence { actual: String },
    #[error("foreach element declared as {declared}, but the sequence holds {actual}")]
    Element { declared: String, actual: String },
    #[error("range bounds must be Number, but got {actual}")]
    RangeBound { actual: String },
    #[error("let {name} is declared as {expected}, but is assigned {actual}")]
    Let {
        name: Box<str>,
        expected: String,
        actual: String,
    },
    #[error("function {name} returns {expected}, but its body is {actual}")]
    Return {
        name: Box<str>,
        expected: String,
        actual: String,
    },
    #[error("block has no value")]
    MissingValue,
    #[error("member access on {actual}, which is not a record")]
    NotARecord { actual: String },
    #[error("an if without else or a foreach is only allowed after where")]
    MisplacedSelfAssignment,
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum LowerError {
    #[error("no equality instruction for type {ty}")]
    NoEquality { ty: String },
    #[error("no top-level function Main")]
    MissingEntryPoint,
    #[error("Main must take no parameters, but takes {count}")]
    EntryPointParameters { count: usize },
    #[error("an if without else or a foreach can only be lowered as a let body")]
    MisplacedSelfAssignment,
    #[error("{name} has no storage in the current function")]
    Unresolved { name: Box<str> },
    #[error("too many {what}")]
    TooMany { what: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_span() {
        let error: CompileError = Span::new_of_bounds(4..9)
            .wrap(BindError::Arity {
                name: "add".into(),
                expected: 2,
                actual: 3,
            })
            .into();
        assert_eq!(
            error.to_string(),
            "bind error at 4..9: add takes 2 arguments, but got 3"
        );
        assert_eq!(error.span(), Some(Span::new_of_bounds(4..9)));
    }

    #[test]
    fn lower_errors_have_no_span() {
        let error = CompileError::from(LowerError::MissingEntryPoint);
        assert_eq!(error.to_string(), "lower error: no top-level function Main");
        assert_eq!(error.span(), None);
    }
}
