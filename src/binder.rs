//! Name resolution and type checking, in a single pass over the untyped tree.
//!
//! Every block hoists its declarations before its statements are bound:
//! record names first (so records may reference each other), then record
//! fields, then function signatures. Bodies are bound afterwards, in source
//! order.

use crate::{
    ast::{
        BinaryOperator, Binding, Block, Expr, ExprKind, Function, Ident, Let, Module, Record,
        Stmt, TypeName, Typed, Untyped,
    },
    error::{BindError, CompileError, TypeError},
    symbols::{Symbol, SymbolId, SymbolKind, Symbols, Scopes},
    token::Span,
    types::{builtins, TypeDetail},
    util::intern::{Interned, Interner},
};

type Result<T, E = CompileError> = std::result::Result<T, E>;

/// The typed tree and the symbols it refers to.
#[derive(Debug)]
pub struct Bound {
    pub module: Module<Typed>,
    pub symbols: Symbols,
}

pub fn bind(module: Module<Untyped>, idents: &Interner<str>) -> Result<Bound> {
    let mut binder = Binder::new(idents);
    let stmts = binder.bind_stmts(module.stmts)?;
    tracing::debug!(symbols = binder.symbols.len(), "bound module");
    Ok(Bound {
        module: Module { stmts },
        symbols: binder.symbols,
    })
}

struct Binder<'ident> {
    idents: &'ident Interner<str>,
    symbols: Symbols,
    scopes: Scopes,
    /// Function whose body is being bound. Parameters and locals owned by any
    /// other function are out of reach.
    current_function: Option<SymbolId>,
}

impl<'ident> Binder<'ident> {
    fn new(idents: &'ident Interner<str>) -> Binder<'ident> {
        let mut scopes = Scopes::new();
        for &(name, _) in builtins::ALL {
            if let Some(ty) = builtins::detail(name) {
                let _ = scopes.declare_type(name, ty);
            }
        }
        Binder {
            idents,
            symbols: Symbols::with_capacity(64),
            scopes,
            current_function: None,
        }
    }

    fn bind_stmts(&mut self, stmts: Vec<Stmt<Untyped>>) -> Result<Vec<Stmt<Typed>>> {
        let hoisted = self.hoist(&stmts)?;
        stmts
            .into_iter()
            .zip(hoisted)
            .map(|(stmt, sym)| self.bind_stmt(stmt, sym))
            .collect()
    }

    /// Declares the records and functions of one block in the current scope.
    /// Returns, for each statement, the symbol it declares.
    fn hoist(&mut self, stmts: &[Stmt<Untyped>]) -> Result<Vec<Option<SymbolId>>> {
        let mut hoisted = vec![None; stmts.len()];

        for (slot, stmt) in hoisted.iter_mut().zip(stmts) {
            if let Stmt::Record(record) = stmt {
                *slot = Some(self.hoist_record_name(record)?);
            }
        }
        for (slot, stmt) in hoisted.iter().zip(stmts) {
            if let (Some(id), Stmt::Record(record)) = (slot, stmt) {
                self.hoist_record_fields(*id, record)?;
            }
        }
        for (slot, stmt) in hoisted.iter_mut().zip(stmts) {
            if let Stmt::Function(function) = stmt {
                *slot = Some(self.hoist_function(function)?);
            }
        }

        Ok(hoisted)
    }

    fn hoist_record_name(&mut self, record: &Record<Untyped>) -> Result<SymbolId> {
        let name = record.name;
        let id = self.symbols.push(Symbol {
            name: name.name,
            ty: TypeDetail::Function,
            kind: SymbolKind::Type { fields: Vec::new() },
            span: record.span,
            owner: None,
        });
        let ty = TypeDetail::Record {
            symbol: id,
            name: name.name,
        };
        self.symbols.get_mut(id).ty = ty.clone();

        self.declare(name, id)?;
        if self.scopes.declare_type(name.name, ty).is_err() {
            return Err(self.duplicate(name));
        }
        tracing::trace!(name = self.idents.get(name), "hoisted record");
        Ok(id)
    }

    fn hoist_record_fields(&mut self, id: SymbolId, record: &Record<Untyped>) -> Result<()> {
        let mut fields: Vec<SymbolId> = Vec::with_capacity(record.fields.len());
        for (index, field) in record.fields.iter().enumerate() {
            if fields
                .iter()
                .any(|&other| self.symbols.get(other).name == field.name.name)
            {
                return Err(self.duplicate(field.name));
            }
            let ty = self.resolve_type(&field.ty)?;
            fields.push(self.symbols.push(Symbol {
                name: field.name.name,
                ty,
                kind: SymbolKind::Field {
                    record: id,
                    index: position(index, field.name, "fields")?,
                },
                span: field.name.span,
                owner: None,
            }));
        }
        self.symbols.get_mut(id).kind = SymbolKind::Type { fields };
        Ok(())
    }

    fn hoist_function(&mut self, function: &Function<Untyped>) -> Result<SymbolId> {
        let return_ty = self.resolve_type(&function.return_ty)?;
        let scope = self.scopes.create_child();
        let id = self.symbols.push(Symbol {
            name: function.name.name,
            ty: TypeDetail::Function,
            kind: SymbolKind::Function {
                params: Vec::new(),
                return_ty,
                scope,
            },
            span: function.span,
            owner: None,
        });
        self.declare(function.name, id)?;

        let mut params = Vec::with_capacity(function.params.len());
        let mut param_tys = Vec::with_capacity(function.params.len());
        for param in &function.params {
            param_tys.push(self.resolve_type(&param.ty)?);
        }

        let previous = self.scopes.enter(scope);
        for (index, (param, ty)) in function.params.iter().zip(param_tys).enumerate() {
            let param_id = self.symbols.push(Symbol {
                name: param.name.name,
                ty,
                kind: SymbolKind::Param {
                    index: position(index, param.name, "parameters")?,
                },
                span: param.name.span,
                owner: Some(id),
            });
            self.declare(param.name, param_id)?;
            params.push(param_id);
        }
        self.scopes.enter(previous);

        if let SymbolKind::Function { params: slot, .. } = &mut self.symbols.get_mut(id).kind {
            *slot = params;
        }
        tracing::trace!(
            name = self.idents.get(function.name),
            params = function.params.len(),
            "hoisted function"
        );
        Ok(id)
    }

    fn bind_stmt(
        &mut self,
        stmt: Stmt<Untyped>,
        hoisted: Option<SymbolId>,
    ) -> Result<Stmt<Typed>> {
        let stmt = match (stmt, hoisted) {
            (Stmt::Function(function), Some(id)) => {
                Stmt::Function(self.bind_function(function, id)?)
            }
            (Stmt::Record(record), Some(id)) => Stmt::Record(self.bind_record(record, id)),
            (Stmt::Let(let_), _) => Stmt::Let(self.bind_let(let_)?),
            (Stmt::Expr(expr), _) => Stmt::Expr(self.bind_expr(expr)?),
            (Stmt::Function(_) | Stmt::Record(_), None) => {
                unreachable!("declarations are hoisted before binding")
            }
        };
        Ok(stmt)
    }

    fn bind_record(&self, record: Record<Untyped>, id: SymbolId) -> Record<Typed> {
        let field_syms = self.symbols.fields(id);
        let fields = record
            .fields
            .into_iter()
            .zip(field_syms)
            .map(|(field, &sym)| Binding {
                name: field.name,
                ty: field.ty,
                sym,
            })
            .collect();
        Record {
            name: record.name,
            fields,
            span: record.span,
            sym: id,
        }
    }

    fn bind_function(
        &mut self,
        function: Function<Untyped>,
        id: SymbolId,
    ) -> Result<Function<Typed>> {
        let SymbolKind::Function {
            params,
            return_ty,
            scope,
        } = self.symbols.get(id).kind.clone()
        else {
            unreachable!("function symbol was hoisted as a function");
        };

        let previous_scope = self.scopes.enter(scope);
        let previous_function = self.current_function.replace(id);
        let body = self.bind_block(function.body)?;
        self.current_function = previous_function;
        self.scopes.enter(previous_scope);

        let body_ty = self.block_value(&body)?;
        if body_ty != return_ty {
            return Err(body.span.wrap(TypeError::Return {
                name: self.name(function.name),
                expected: self.show(&return_ty),
                actual: self.show(&body_ty),
            })
            .into());
        }

        let params = function
            .params
            .into_iter()
            .zip(params)
            .map(|(param, sym)| Binding {
                name: param.name,
                ty: param.ty,
                sym,
            })
            .collect();
        Ok(Function {
            name: function.name,
            params,
            return_ty: function.return_ty,
            body,
            span: function.span,
            sym: id,
        })
    }

    /// Binds a block in a fresh child scope. The block's type is the type of
    /// its last statement, if that is an expression.
    fn bind_block(&mut self, block: Block<Untyped>) -> Result<Block<Typed>> {
        self.scopes.push();
        let stmts = self.bind_stmts(block.stmts)?;
        self.scopes.pop();

        let info = match stmts.last() {
            Some(Stmt::Expr(expr)) => Some(expr.info.clone()),
            _ => None,
        };
        Ok(Block {
            stmts,
            span: block.span,
            info,
        })
    }

    fn block_value(&self, block: &Block<Typed>) -> Result<TypeDetail> {
        match &block.info {
            Some(ty) => Ok(ty.clone()),
            None => Err(block.span.wrap(TypeError::MissingValue).into()),
        }
    }

    fn bind_let(&mut self, let_: Let<Untyped>) -> Result<Let<Typed>> {
        let declared = self.resolve_type(&let_.ty)?;
        let mut bodies = let_.assignments.into_iter();
        let mut assignments = Vec::with_capacity(bodies.len());

        // The first body cannot see the name being declared.
        if let Some(first) = bodies.next() {
            self.scopes.push();
            let first = self.bind_expr(first)?;
            self.scopes.pop();
            self.check_let_body(let_.name, &declared, &first)?;
            assignments.push(first);
        }

        let sym = self.declare_local(let_.name, declared.clone())?;

        for chained in bodies {
            let chained = self.bind_chained(chained)?;
            self.check_let_body(let_.name, &declared, &chained)?;
            assignments.push(chained);
        }

        Ok(Let {
            name: let_.name,
            ty: let_.ty,
            assignments,
            span: let_.span,
            sym,
        })
    }

    fn check_let_body(
        &self,
        name: Ident,
        declared: &TypeDetail,
        body: &Expr<Typed>,
    ) -> Result<()> {
        if body.info == *declared {
            return Ok(());
        }
        Err(body
            .span
            .wrap(TypeError::Let {
                name: self.name(name),
                expected: self.show(declared),
                actual: self.show(&body.info),
            })
            .into())
    }

    /// Binds a `where` body, which may also be an `if` without `else` or a
    /// `foreach`.
    fn bind_chained(&mut self, expr: Expr<Untyped>) -> Result<Expr<Typed>> {
        let span = expr.span;
        match expr.kind {
            ExprKind::If {
                cond,
                then_block,
                else_block: None,
            } => {
                let cond = self.bind_condition(*cond)?;
                let then_block = self.bind_block(then_block)?;
                let ty = self.block_value(&then_block)?;
                Ok(Expr {
                    kind: ExprKind::If {
                        cond: Box::new(cond),
                        then_block,
                        else_block: None,
                    },
                    span,
                    info: ty,
                })
            }
            ExprKind::Foreach {
                element,
                element_ty,
                range,
                body,
                sym: (),
            } => self.bind_foreach(span, element, element_ty, *range, body),
            kind => self.bind_expr(Expr {
                kind,
                span,
                info: (),
            }),
        }
    }

    fn bind_foreach(
        &mut self,
        span: Span,
        element: Ident,
        element_ty: TypeName,
        range: Expr<Untyped>,
        body: Block<Untyped>,
    ) -> Result<Expr<Typed>> {
        let declared = self.resolve_type(&element_ty)?;
        let range = self.bind_expr(range)?;
        let Some(actual) = range.info.seq_element() else {
            return Err(range
                .span
                .wrap(TypeError::NotASequence {
                    actual: self.show(&range.info),
                })
                .into());
        };
        if *actual != declared {
            return Err(element_ty
                .span
                .wrap(TypeError::Element {
                    declared: self.show(&declared),
                    actual: self.show(actual),
                })
                .into());
        }

        self.scopes.push();
        let sym = self.declare_local(element, declared)?;
        let body = self.bind_block(body)?;
        self.scopes.pop();
        let ty = self.block_value(&body)?;

        Ok(Expr {
            kind: ExprKind::Foreach {
                element,
                element_ty,
                range: Box::new(range),
                body,
                sym,
            },
            span,
            info: ty,
        })
    }

    fn bind_condition(&mut self, cond: Expr<Untyped>) -> Result<Expr<Typed>> {
        let cond = self.bind_expr(cond)?;
        if cond.info != TypeDetail::Boolean {
            return Err(cond
                .span
                .wrap(TypeError::Condition {
                    actual: self.show(&cond.info),
                })
                .into());
        }
        Ok(cond)
    }

    fn bind_expr(&mut self, expr: Expr<Untyped>) -> Result<Expr<Typed>> {
        let span = expr.span;
        let (kind, ty) = match expr.kind {
            ExprKind::Number(n) => (ExprKind::Number(n), TypeDetail::Number),
            ExprKind::String(s) => (ExprKind::String(s), TypeDetail::String),
            ExprKind::Bool(b) => (ExprKind::Bool(b), TypeDetail::Boolean),
            ExprKind::Named(ident, ()) => {
                let sym = self.resolve_value(ident)?;
                let ty = self.symbols.get(sym).ty.clone();
                (ExprKind::Named(ident, sym), ty)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.bind_expr(*lhs)?;
                let rhs = self.bind_expr(*rhs)?;
                let ty = self.check_operands(span, op, &lhs.info, &rhs.info)?;
                let kind = ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                };
                (kind, ty)
            }
            ExprKind::Range { from, to, step } => {
                let from = self.bind_range_bound(*from)?;
                let to = self.bind_range_bound(*to)?;
                let step = match step {
                    Some(step) => Some(Box::new(self.bind_range_bound(*step)?)),
                    None => None,
                };
                let kind = ExprKind::Range {
                    from: Box::new(from),
                    to: Box::new(to),
                    step,
                };
                (kind, TypeDetail::seq_of(TypeDetail::Number))
            }
            ExprKind::Call { name, args, sym: () } => {
                let sym = self.resolve_kind(name, "function", |kind| {
                    matches!(kind, SymbolKind::Function { .. })
                })?;
                let SymbolKind::Function {
                    params, return_ty, ..
                } = self.symbols.get(sym).kind.clone()
                else {
                    unreachable!("resolved as a function");
                };
                let expected: Vec<_> = params
                    .iter()
                    .map(|&p| self.symbols.get(p).ty.clone())
                    .collect();
                let mismatch = |name, position, expected, actual| TypeError::Argument {
                    name,
                    position,
                    expected,
                    actual,
                };
                let args = self.bind_args(span, name, &expected, args, mismatch)?;
                (ExprKind::Call { name, args, sym }, return_ty)
            }
            ExprKind::Construct { ty, args, sym: () } => {
                let sym = self.resolve_kind(ty, "type", |kind| {
                    matches!(kind, SymbolKind::Type { .. })
                })?;
                let fields = self.symbols.fields(sym).to_vec();
                let expected: Vec<_> = fields
                    .iter()
                    .map(|&f| self.symbols.get(f).ty.clone())
                    .collect();
                let field_names: Vec<Box<str>> = fields
                    .iter()
                    .map(|&f| self.name(self.symbols.get(f).name))
                    .collect();
                let mismatch = |record, position: usize, expected, actual| TypeError::Field {
                    record,
                    field: field_names[position - 1].clone(),
                    expected,
                    actual,
                };
                let args = self.bind_args(span, ty, &expected, args, mismatch)?;
                let record_ty = self.symbols.get(sym).ty.clone();
                (ExprKind::Construct { ty, args, sym }, record_ty)
            }
            ExprKind::If {
                cond,
                then_block,
                else_block: Some(else_block),
            } => {
                let cond = self.bind_condition(*cond)?;
                let then_block = self.bind_block(then_block)?;
                let then_ty = self.block_value(&then_block)?;
                let else_block = self.bind_block(else_block)?;
                let else_ty = self.block_value(&else_block)?;
                if then_ty != else_ty {
                    return Err(span
                        .wrap(TypeError::Branches {
                            then: self.show(&then_ty),
                            otherwise: self.show(&else_ty),
                        })
                        .into());
                }
                let kind = ExprKind::If {
                    cond: Box::new(cond),
                    then_block,
                    else_block: Some(else_block),
                };
                (kind, then_ty)
            }
            ExprKind::If {
                else_block: None, ..
            }
            | ExprKind::Foreach { .. } => {
                return Err(span.wrap(TypeError::MisplacedSelfAssignment).into());
            }
            ExprKind::Member { base, field, sym: () } => {
                let base = self.bind_expr(*base)?;
                let &TypeDetail::Record { symbol, name } = &base.info else {
                    return Err(base
                        .span
                        .wrap(TypeError::NotARecord {
                            actual: self.show(&base.info),
                        })
                        .into());
                };
                let Some(&sym) = self
                    .symbols
                    .fields(symbol)
                    .iter()
                    .find(|&&f| self.symbols.get(f).name == field.name)
                else {
                    return Err(field
                        .span
                        .wrap(BindError::UndefinedField {
                            record: self.name(name),
                            field: self.name(field),
                        })
                        .into());
                };
                let ty = self.symbols.get(sym).ty.clone();
                let kind = ExprKind::Member {
                    base: Box::new(base),
                    field,
                    sym,
                };
                (kind, ty)
            }
            ExprKind::Block(block) => {
                let block = self.bind_block(block)?;
                let ty = self.block_value(&block)?;
                (ExprKind::Block(block), ty)
            }
        };
        Ok(Expr {
            kind,
            span,
            info: ty,
        })
    }

    fn bind_range_bound(&mut self, bound: Expr<Untyped>) -> Result<Expr<Typed>> {
        let bound = self.bind_expr(bound)?;
        if bound.info != TypeDetail::Number {
            return Err(bound
                .span
                .wrap(TypeError::RangeBound {
                    actual: self.show(&bound.info),
                })
                .into());
        }
        Ok(bound)
    }

    /// Checks the argument count before binding anything, then binds each
    /// argument and checks it against the positional type.
    fn bind_args(
        &mut self,
        span: Span,
        callee: Ident,
        expected: &[TypeDetail],
        args: Vec<Expr<Untyped>>,
        mismatch: impl Fn(Box<str>, usize, String, String) -> TypeError,
    ) -> Result<Vec<Expr<Typed>>> {
        if args.len() != expected.len() {
            return Err(span
                .wrap(BindError::Arity {
                    name: self.name(callee),
                    expected: expected.len(),
                    actual: args.len(),
                })
                .into());
        }

        let mut bound = Vec::with_capacity(args.len());
        for (index, (arg, expected)) in args.into_iter().zip(expected).enumerate() {
            let arg = self.bind_expr(arg)?;
            if arg.info != *expected {
                let error = mismatch(
                    self.name(callee),
                    index + 1,
                    self.show(expected),
                    self.show(&arg.info),
                );
                return Err(arg.span.wrap(error).into());
            }
            bound.push(arg);
        }
        Ok(bound)
    }

    fn check_operands(
        &self,
        span: Span,
        op: BinaryOperator,
        lhs: &TypeDetail,
        rhs: &TypeDetail,
    ) -> Result<TypeDetail> {
        use BinaryOperator::*;
        use TypeDetail::{Boolean, Number, String};

        let result = match op {
            Add | Sub | Mul | Div | Rem if *lhs == Number && *rhs == Number => Some(Number),
            Greater | Less if *lhs == Number && *rhs == Number => Some(Boolean),
            And | Or if *lhs == Boolean && *rhs == Boolean => Some(Boolean),
            Eq | Ne if lhs == rhs => Some(Boolean),
            Concat if [lhs, rhs].iter().all(|ty| matches!(ty, Number | String)) => Some(String),
            _ => None,
        };

        result.ok_or_else(|| {
            span.wrap(TypeError::Operands {
                op: op.symbol(),
                lhs: self.show(lhs),
                rhs: self.show(rhs),
            })
            .into()
        })
    }

    /// Resolves a named value. Only parameters and locals of the function
    /// being bound qualify.
    fn resolve_value(&self, ident: Ident) -> Result<SymbolId> {
        let Some(id) = self.scopes.lookup(ident.name) else {
            return Err(ident
                .span
                .wrap(BindError::UndefinedName {
                    name: self.name(ident),
                })
                .into());
        };
        let symbol = self.symbols.get(id);
        match symbol.kind {
            SymbolKind::Param { .. } | SymbolKind::Local => {}
            ref other => {
                return Err(ident
                    .span
                    .wrap(BindError::WrongKind {
                        name: self.name(ident),
                        expected: "value",
                        actual: other.describe(),
                    })
                    .into());
            }
        }
        if symbol.owner.is_some() && symbol.owner != self.current_function {
            return Err(ident
                .span
                .wrap(BindError::Captured {
                    name: self.name(ident),
                })
                .into());
        }
        Ok(id)
    }

    fn resolve_kind(
        &self,
        ident: Ident,
        expected: &'static str,
        accept: impl Fn(&SymbolKind) -> bool,
    ) -> Result<SymbolId> {
        let Some(id) = self.scopes.lookup(ident.name) else {
            return Err(ident
                .span
                .wrap(BindError::UndefinedName {
                    name: self.name(ident),
                })
                .into());
        };
        let kind = &self.symbols.get(id).kind;
        if !accept(kind) {
            return Err(ident
                .span
                .wrap(BindError::WrongKind {
                    name: self.name(ident),
                    expected,
                    actual: kind.describe(),
                })
                .into());
        }
        Ok(id)
    }

    /// Resolves a type annotation into a concrete type. Generics must receive
    /// exactly as many arguments as their arity; other types take none.
    fn resolve_type(&self, ty: &TypeName) -> Result<TypeDetail> {
        let Some(detail) = self.scopes.lookup_type(ty.name.name) else {
            return Err(ty
                .span
                .wrap(BindError::UndefinedType {
                    name: self.name(ty.name),
                })
                .into());
        };

        let expected = match detail {
            TypeDetail::Unbound(generic) => generic.arity(),
            _ => 0,
        };
        if ty.args.len() != expected {
            return Err(ty
                .span
                .wrap(BindError::GenericArity {
                    name: self.name(ty.name),
                    expected,
                    actual: ty.args.len(),
                })
                .into());
        }

        match detail {
            TypeDetail::Unbound(generic) => {
                let generic = *generic;
                let args = ty
                    .args
                    .iter()
                    .map(|arg| self.resolve_type(arg))
                    .collect::<Result<Vec<_>>>()?;
                Ok(TypeDetail::Bound { generic, args })
            }
            other => Ok(other.clone()),
        }
    }

    fn declare_local(&mut self, ident: Ident, ty: TypeDetail) -> Result<SymbolId> {
        let id = self.symbols.push(Symbol {
            name: ident.name,
            ty,
            kind: SymbolKind::Local,
            span: ident.span,
            owner: self.current_function,
        });
        self.declare(ident, id)?;
        Ok(id)
    }

    fn declare(&mut self, ident: Ident, id: SymbolId) -> Result<()> {
        self.scopes
            .declare(ident.name, id)
            .map_err(|_| self.duplicate(ident))
    }

    fn duplicate(&self, ident: Ident) -> CompileError {
        ident
            .span
            .wrap(BindError::Duplicate {
                name: self.name(ident),
            })
            .into()
    }

    fn name(&self, name: impl Into<Interned<str>>) -> Box<str> {
        self.idents.get(name).into()
    }

    fn show(&self, ty: &TypeDetail) -> String {
        ty.display(self.idents).to_string()
    }
}

fn position(index: usize, ident: Ident, what: &'static str) -> Result<u16> {
    u16::try_from(index).map_err(|_| ident.span.wrap(BindError::TooMany { what }).into())
}
