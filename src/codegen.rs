//! Lowers the typed tree into a [`Program`] for the stack machine.
//!
//! A first pass lays out every function (nested ones included) and every
//! record type, so that calls and constructions can be resolved regardless
//! of declaration order. Each function body is then lowered on its own.

use std::{
    collections::{HashMap, HashSet},
    rc::Rc,
};

use crate::{
    ast::{BinaryOperator, Block, Expr, ExprKind, Function, Let, Module, Record, Stmt, Typed},
    error::LowerError,
    symbols::{SymbolId, SymbolKind, Symbols},
    target::{
        BinaryInstr, FieldRef, FunctionBuilder, FunctionId, Instr, Intrinsic, Program, RecordId,
        RecordLayout,
    },
    types::{well_known, TypeDetail},
    util::intern::Interner,
};

type Result<T, E = LowerError> = std::result::Result<T, E>;

/// Name of the synthetic function that calls `Main` and prints its result.
const ENTRY: &str = "Execute";

pub fn generate(
    module: &Module<Typed>,
    symbols: &Symbols,
    idents: &Interner<str>,
) -> Result<Program> {
    let main = find_entry_point(module)?;

    let mut layout = Layout::new(symbols, idents);
    layout.collect_stmts(&module.stmts, None)?;

    let mut functions = Vec::with_capacity(layout.functions.len());
    for (function, name) in &layout.functions {
        functions.push(lower_function(&layout, function, name.clone())?);
    }

    let main = layout.function_id(main.sym)?;
    let mut entry = FunctionBuilder::new(ENTRY.to_owned(), 0);
    entry.emit(Instr::Call(main));
    entry.emit(Instr::Intrinsic(Intrinsic::WriteLine));
    entry.emit(Instr::Return);

    Ok(Program {
        functions,
        records: layout.records,
        entry: entry.finish(),
    })
}

fn find_entry_point(module: &Module<Typed>) -> Result<&Function<Typed>> {
    let main = module.stmts.iter().find_map(|stmt| match stmt {
        Stmt::Function(function) if function.name.name == well_known::MAIN => Some(function),
        _ => None,
    });
    match main {
        None => Err(LowerError::MissingEntryPoint),
        Some(main) if !main.params.is_empty() => Err(LowerError::EntryPointParameters {
            count: main.params.len(),
        }),
        Some(main) => Ok(main),
    }
}

/// Every function and record of the module, wherever it was declared.
struct Layout<'m> {
    symbols: &'m Symbols,
    idents: &'m Interner<str>,
    functions: Vec<(&'m Function<Typed>, String)>,
    function_ids: HashMap<SymbolId, FunctionId>,
    records: Vec<RecordLayout>,
    record_ids: HashMap<SymbolId, RecordId>,
    taken: HashSet<String>,
}

impl<'m> Layout<'m> {
    fn new(symbols: &'m Symbols, idents: &'m Interner<str>) -> Layout<'m> {
        Layout {
            symbols,
            idents,
            functions: Vec::new(),
            function_ids: HashMap::new(),
            records: Vec::new(),
            record_ids: HashMap::new(),
            taken: HashSet::from([ENTRY.to_owned()]),
        }
    }

    fn collect_stmts(&mut self, stmts: &'m [Stmt<Typed>], outer: Option<&str>) -> Result<()> {
        for stmt in stmts {
            match stmt {
                Stmt::Function(function) => self.collect_function(function, outer)?,
                Stmt::Record(record) => self.collect_record(record)?,
                Stmt::Let(Let { assignments, .. }) => {
                    for body in assignments {
                        self.collect_expr(body, outer)?;
                    }
                }
                Stmt::Expr(expr) => self.collect_expr(expr, outer)?,
            }
        }
        Ok(())
    }

    fn collect_function(
        &mut self,
        function: &'m Function<Typed>,
        outer: Option<&str>,
    ) -> Result<()> {
        let base = match outer {
            Some(outer) => format!("{outer}.{}", self.idents.get(function.name)),
            None => self.idents.get(function.name).to_owned(),
        };
        let mut name = base.clone();
        let mut suffix = 2;
        while self.taken.contains(&name) {
            name = format!("{base}#{suffix}");
            suffix += 1;
        }
        self.taken.insert(name.clone());

        let id = u32::try_from(self.functions.len())
            .map(FunctionId)
            .map_err(|_| LowerError::TooMany { what: "functions" })?;
        self.function_ids.insert(function.sym, id);
        self.functions.push((function, name.clone()));
        self.collect_block(&function.body, Some(name.as_str()))
    }

    fn collect_record(&mut self, record: &Record<Typed>) -> Result<()> {
        let fields: Rc<[Rc<str>]> = self
            .symbols
            .fields(record.sym)
            .iter()
            .map(|&field| Rc::from(self.idents.get(self.symbols.get(field).name)))
            .collect();
        let constructor = (0..fields.len())
            .map(|index| u16::try_from(index).map_err(|_| LowerError::TooMany { what: "fields" }))
            .collect::<Result<_>>()?;

        let id = u32::try_from(self.records.len())
            .map(RecordId)
            .map_err(|_| LowerError::TooMany { what: "records" })?;
        self.record_ids.insert(record.sym, id);
        self.records.push(RecordLayout {
            name: Rc::from(self.idents.get(record.name)),
            fields,
            constructor,
        });
        Ok(())
    }

    fn collect_block(&mut self, block: &'m Block<Typed>, outer: Option<&str>) -> Result<()> {
        self.collect_stmts(&block.stmts, outer)
    }

    fn collect_expr(&mut self, expr: &'m Expr<Typed>, outer: Option<&str>) -> Result<()> {
        match &expr.kind {
            ExprKind::Number(_)
            | ExprKind::String(_)
            | ExprKind::Bool(_)
            | ExprKind::Named(..) => {}
            ExprKind::Binary { lhs, rhs, .. } => {
                self.collect_expr(lhs, outer)?;
                self.collect_expr(rhs, outer)?;
            }
            ExprKind::Range { from, to, step } => {
                self.collect_expr(from, outer)?;
                self.collect_expr(to, outer)?;
                if let Some(step) = step {
                    self.collect_expr(step, outer)?;
                }
            }
            ExprKind::Call { args, .. } | ExprKind::Construct { args, .. } => {
                for arg in args {
                    self.collect_expr(arg, outer)?;
                }
            }
            ExprKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.collect_expr(cond, outer)?;
                self.collect_block(then_block, outer)?;
                if let Some(else_block) = else_block {
                    self.collect_block(else_block, outer)?;
                }
            }
            ExprKind::Foreach { range, body, .. } => {
                self.collect_expr(range, outer)?;
                self.collect_block(body, outer)?;
            }
            ExprKind::Member { base, .. } => self.collect_expr(base, outer)?,
            ExprKind::Block(block) => self.collect_block(block, outer)?,
        }
        Ok(())
    }

    fn function_id(&self, sym: SymbolId) -> Result<FunctionId> {
        self.function_ids
            .get(&sym)
            .copied()
            .ok_or_else(|| self.unresolved(sym))
    }

    fn record_id(&self, sym: SymbolId) -> Result<RecordId> {
        self.record_ids
            .get(&sym)
            .copied()
            .ok_or_else(|| self.unresolved(sym))
    }

    fn unresolved(&self, sym: SymbolId) -> LowerError {
        LowerError::Unresolved {
            name: self.idents.get(self.symbols.get(sym).name).into(),
        }
    }
}

fn lower_function(
    layout: &Layout<'_>,
    function: &Function<Typed>,
    name: String,
) -> Result<crate::target::Function> {
    let params = u16::try_from(function.params.len())
        .map_err(|_| LowerError::TooMany { what: "parameters" })?;
    let mut lowerer = Lowerer {
        layout,
        builder: FunctionBuilder::new(name, params),
        locals: HashMap::new(),
    };
    lowerer.lower_block(&function.body)?;
    lowerer.builder.emit(Instr::Return);

    let function = lowerer.builder.finish();
    tracing::debug!(
        name = %function.name,
        instrs = function.code.len(),
        locals = function.locals,
        iterators = function.iterators,
        "lowered function"
    );
    Ok(function)
}

struct Lowerer<'l, 'm> {
    layout: &'l Layout<'m>,
    builder: FunctionBuilder,
    /// Slot of each local (let or foreach element) of this function.
    locals: HashMap<SymbolId, u16>,
}

impl Lowerer<'_, '_> {
    /// Leaves the value of the last statement on the stack, if it is an
    /// expression. Every other expression statement is popped.
    fn lower_block(&mut self, block: &Block<Typed>) -> Result<()> {
        let last = block.stmts.len().saturating_sub(1);
        for (index, stmt) in block.stmts.iter().enumerate() {
            match stmt {
                Stmt::Let(let_) => self.lower_let(let_)?,
                Stmt::Function(_) | Stmt::Record(_) => {}
                Stmt::Expr(expr) => {
                    self.lower_expr(expr)?;
                    if index != last {
                        self.emit(Instr::Pop);
                    }
                }
            }
        }
        Ok(())
    }

    fn lower_let(&mut self, let_: &Let<Typed>) -> Result<()> {
        let slot = self.builder.alloc_local()?;
        self.locals.insert(let_.sym, slot);

        for body in &let_.assignments {
            match &body.kind {
                ExprKind::If {
                    cond,
                    then_block,
                    else_block: None,
                } => {
                    let end = self.builder.new_label()?;
                    self.lower_expr(cond)?;
                    self.emit(Instr::BranchIfFalse(end));
                    self.lower_block(then_block)?;
                    self.emit(Instr::StoreLocal(slot));
                    self.builder.mark(end);
                }
                ExprKind::Foreach {
                    range, body, sym, ..
                } => {
                    let iterator = self.builder.alloc_iterator()?;
                    let element = self.builder.alloc_local()?;
                    self.locals.insert(*sym, element);
                    let top = self.builder.new_label()?;
                    let exit = self.builder.new_label()?;

                    self.lower_expr(range)?;
                    self.emit(Instr::AcquireIterator(iterator));
                    self.builder.mark(top);
                    self.emit(Instr::AdvanceIterator {
                        slot: iterator,
                        exit,
                    });
                    self.emit(Instr::StoreLocal(element));
                    self.lower_block(body)?;
                    self.emit(Instr::StoreLocal(slot));
                    self.emit(Instr::Branch(top));
                    self.builder.mark(exit);
                    self.emit(Instr::ReleaseIterator(iterator));
                }
                _ => {
                    self.lower_expr(body)?;
                    self.emit(Instr::StoreLocal(slot));
                }
            }
        }
        Ok(())
    }

    fn lower_expr(&mut self, expr: &Expr<Typed>) -> Result<()> {
        match &expr.kind {
            ExprKind::Number(n) => self.emit(Instr::PushNumber(*n)),
            ExprKind::String(s) => self.emit(Instr::PushString(Rc::from(&**s))),
            ExprKind::Bool(b) => self.emit(Instr::PushBool(*b)),
            ExprKind::Named(_, sym) => {
                let instr = match self.layout.symbols.get(*sym).kind {
                    SymbolKind::Param { index } => Instr::LoadParam(index),
                    _ => match self.locals.get(sym) {
                        Some(&slot) => Instr::LoadLocal(slot),
                        None => return Err(self.layout.unresolved(*sym)),
                    },
                };
                self.emit(instr);
            }
            ExprKind::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs)?,
            ExprKind::Range { from, to, step } => {
                self.lower_expr(from)?;
                self.lower_expr(to)?;
                match step {
                    Some(step) => self.lower_expr(step)?,
                    None => self.emit(Instr::PushNumber(1.0)),
                }
                self.emit(Instr::Intrinsic(Intrinsic::GenerateList));
            }
            ExprKind::Call { args, sym, .. } => {
                for arg in args {
                    self.lower_expr(arg)?;
                }
                let id = self.layout.function_id(*sym)?;
                self.emit(Instr::Call(id));
            }
            ExprKind::If {
                cond,
                then_block,
                else_block: Some(else_block),
            } => {
                let otherwise = self.builder.new_label()?;
                let end = self.builder.new_label()?;
                self.lower_expr(cond)?;
                self.emit(Instr::BranchIfFalse(otherwise));
                self.lower_block(then_block)?;
                self.emit(Instr::Branch(end));
                self.builder.mark(otherwise);
                self.lower_block(else_block)?;
                self.builder.mark(end);
            }
            ExprKind::If {
                else_block: None, ..
            }
            | ExprKind::Foreach { .. } => return Err(LowerError::MisplacedSelfAssignment),
            ExprKind::Member { base, sym, .. } => {
                self.lower_expr(base)?;
                let SymbolKind::Field { record, index } = self.layout.symbols.get(*sym).kind else {
                    return Err(self.layout.unresolved(*sym));
                };
                let record = self.layout.record_id(record)?;
                self.emit(Instr::LoadField(FieldRef { record, index }));
            }
            ExprKind::Construct { args, sym, .. } => {
                for arg in args {
                    self.lower_expr(arg)?;
                }
                let id = self.layout.record_id(*sym)?;
                self.emit(Instr::Construct(id));
            }
            ExprKind::Block(block) => self.lower_block(block)?,
        }
        Ok(())
    }

    fn lower_binary(
        &mut self,
        op: BinaryOperator,
        lhs: &Expr<Typed>,
        rhs: &Expr<Typed>,
    ) -> Result<()> {
        if op == BinaryOperator::Concat {
            for operand in [lhs, rhs] {
                self.lower_expr(operand)?;
                if operand.info == TypeDetail::Number {
                    self.emit(Instr::Box);
                }
            }
            self.emit(Instr::Binary(BinaryInstr::Concat));
            return Ok(());
        }

        let instr = match op {
            BinaryOperator::Or => BinaryInstr::Or,
            BinaryOperator::And => BinaryInstr::And,
            BinaryOperator::Eq | BinaryOperator::Ne => self.equality(op, &lhs.info)?,
            BinaryOperator::Greater => BinaryInstr::Gt,
            BinaryOperator::Less => BinaryInstr::Lt,
            BinaryOperator::Add => BinaryInstr::Add,
            BinaryOperator::Sub => BinaryInstr::Sub,
            BinaryOperator::Mul => BinaryInstr::Mul,
            BinaryOperator::Div => BinaryInstr::Div,
            BinaryOperator::Rem => BinaryInstr::Rem,
            BinaryOperator::Concat => unreachable!("lowered above"),
        };
        self.lower_expr(lhs)?;
        self.lower_expr(rhs)?;
        self.emit(Instr::Binary(instr));
        Ok(())
    }

    /// Picks the equality instruction for the operand type.
    fn equality(&self, op: BinaryOperator, ty: &TypeDetail) -> Result<BinaryInstr> {
        let negated = op == BinaryOperator::Ne;
        let instr = match ty {
            TypeDetail::Number | TypeDetail::Boolean if negated => BinaryInstr::Ne,
            TypeDetail::Number | TypeDetail::Boolean => BinaryInstr::Eq,
            TypeDetail::String if negated => BinaryInstr::StrNe,
            TypeDetail::String => BinaryInstr::StrEq,
            TypeDetail::Record { .. } if negated => BinaryInstr::RefNe,
            TypeDetail::Record { .. } => BinaryInstr::RefEq,
            TypeDetail::Function | TypeDetail::Unbound(_) | TypeDetail::Bound { .. } => {
                return Err(LowerError::NoEquality {
                    ty: ty.display(self.layout.idents).to_string(),
                });
            }
        };
        Ok(instr)
    }

    fn emit(&mut self, instr: Instr) {
        self.builder.emit(instr);
    }
}

#[cfg(test)]
mod tests {
    use crate::{error::CompileError, error::LowerError, pipeline::compile};

    fn listing(src: &str) -> String {
        compile(src).unwrap().program.listing()
    }

    fn lower_error(src: &str) -> LowerError {
        match compile(src) {
            Err(CompileError::Lower(error)) => error,
            other => panic!("expected a lower error, got {other:?}"),
        }
    }

    #[test]
    fn foreach_accumulates_into_let_slot() {
        let listing = listing(
            "func Main() -> Number { let x Number = 0 where foreach i Number in [1 to 4] do x + i x }",
        );
        let expected = indoc::indoc! {"
            .func Main params=0 locals=2 iterators=1
                push.num 0
                store.local 0
                push.num 1
                push.num 4
                push.num 1
                intrinsic generate_list
                iter.acquire 0
            L0:
                iter.advance 0 L1
                store.local 1
                load.local 0
                load.local 1
                add
                store.local 0
                br L0
            L1:
                iter.release 0
                load.local 0
                ret

            .func Execute params=0 locals=0 iterators=0
                call Main
                intrinsic write_line
                ret
        "};
        pretty_assertions::assert_eq!(listing.trim_end(), expected.trim_end());
    }

    #[test]
    fn else_less_if_skips_the_store() {
        let listing = listing(
            "func Main() -> Number { let x Number = 10 where if x > 100 then 999 x }",
        );
        let expected = indoc::indoc! {"
            .func Main params=0 locals=1 iterators=0
                push.num 10
                store.local 0
                load.local 0
                push.num 100
                gt
                br.false L0
                push.num 999
                store.local 0
            L0:
                load.local 0
                ret
        "};
        assert!(listing.starts_with(expected), "{listing}");
    }

    #[test]
    fn concat_boxes_numbers_and_strings_compare_by_value() {
        let listing = listing(r#"func Main() -> Boolean { "n=" .. 1 == "n=1" }"#);
        let expected = indoc::indoc! {r#"
            .func Main params=0 locals=0 iterators=0
                push.str "n="
                push.num 1
                box
                concat
                push.str "n=1"
                str.eq
                ret
        "#};
        assert!(listing.starts_with(expected), "{listing}");
    }

    #[test]
    fn records_compare_by_reference() {
        let listing = listing("type P { a Number } func Main() -> Boolean { P{1} != P{1} }");
        assert!(listing.starts_with(".record P { a }\n"), "{listing}");
        assert!(listing.contains("construct P\n    ref.ne\n"), "{listing}");
    }

    #[test]
    fn intermediate_values_are_popped() {
        let listing = listing("func Main() -> Number { 1 2 }");
        assert!(listing.contains("push.num 1\n    pop\n    push.num 2\n    ret\n"), "{listing}");
    }

    #[test]
    fn nested_functions_get_qualified_names() {
        let listing = listing(
            "func Main() -> Number { func f() -> Number { 1 } { func f() -> Number { 2 } f() } }",
        );
        assert!(listing.contains(".func Main.f params=0"), "{listing}");
        assert!(listing.contains(".func Main.f#2 params=0"), "{listing}");
        assert!(listing.contains("call Main.f#2\n"), "{listing}");
    }

    #[test]
    fn user_execute_does_not_clash_with_entry() {
        let listing = listing("func Execute() -> Number { 1 } func Main() -> Number { Execute() }");
        assert!(listing.contains(".func Execute#2 params=0"), "{listing}");
        assert!(listing.contains("call Execute#2\n"), "{listing}");
        assert_eq!(listing.matches(".func Execute params=0").count(), 1, "{listing}");
    }

    #[test]
    fn parameters_load_by_position() {
        let listing = listing(
            "func sub(a Number, b Number) -> Number { b - a } func Main() -> Number { sub(1, 2) }",
        );
        assert!(listing.contains("load.param 1\n    load.param 0\n    sub\n"), "{listing}");
    }

    #[test]
    fn no_equality_over_sequences() {
        let error = lower_error("func Main() -> Boolean { [1 to 2] == [1 to 2] }");
        assert_eq!(
            error,
            LowerError::NoEquality {
                ty: "Seq<Number>".into()
            }
        );
    }

    #[test]
    fn entry_point_is_required() {
        assert_eq!(
            lower_error("func main() -> Number { 1 }"),
            LowerError::MissingEntryPoint
        );
        assert_eq!(
            lower_error("func Main(a Number) -> Number { a }"),
            LowerError::EntryPointParameters { count: 1 }
        );
    }
}
