use crate::{
    ast::{Module, Typed},
    binder, codegen,
    error::CompileError,
    parser,
    symbols::Symbols,
    target::Program,
    util::intern::Interner,
};

/// Everything produced by a successful compilation.
#[derive(Debug)]
pub struct Compilation {
    pub interner: Interner<str>,
    pub module: Module<Typed>,
    pub symbols: Symbols,
    pub program: Program,
}

/// Runs every stage over `src`, stopping at the first error.
pub fn compile(src: &str) -> Result<Compilation, CompileError> {
    let mut interner = Interner::with_capacity(64);
    let mut tokens = Vec::with_capacity(src.len() / 4);

    let module = parser::parse_module(src, &mut tokens, &mut interner)?;
    tracing::debug!(tokens = tokens.len(), stmts = module.stmts.len(), "parsed");

    let binder::Bound { module, symbols } = binder::bind(module, &interner)?;
    let program = codegen::generate(&module, &symbols, &interner)?;
    tracing::debug!(
        functions = program.functions.len(),
        records = program.records.len(),
        "generated"
    );

    Ok(Compilation {
        interner,
        module,
        symbols,
        program,
    })
}
