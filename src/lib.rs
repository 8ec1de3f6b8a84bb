/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into an AST.
pub mod parser;

/// The binder takes an untyped AST, resolves its names, checks the soundness
/// of its types, and maps it into a typed AST.
pub mod binder;

/// The code generator lowers a typed AST into a stack machine program.
pub mod codegen;

/// The machine executes a lowered program.
pub mod vm;

pub mod pipeline;

pub mod ast;
pub mod error;
pub mod symbols;
pub mod target;
pub mod token;
pub mod types;

pub mod util {
    pub mod fmt;
    pub mod intern;
    #[cfg(test)]
    pub(crate) mod test_utils;
}
