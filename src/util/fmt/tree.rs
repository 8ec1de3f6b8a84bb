use std::io::Write;

use crate::{ast::*, types::TypeDetail, util::intern::Interner};

const INDENT_WIDTH: usize = 2;

pub fn print_module_string<I: InfoWriter>(idents: &Interner<str>, module: &Module<I>) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_module(&mut buf, idents, module).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_expr_string<I: InfoWriter>(idents: &Interner<str>, expr: &Expr<I>) -> String {
    let mut buf = Vec::with_capacity(512);
    print_expr(&mut buf, idents, 0, expr).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_module<I: InfoWriter>(
    w: &mut impl Write,
    idents: &Interner<str>,
    module: &Module<I>,
) -> std::io::Result<()> {
    for stmt in &module.stmts {
        print_stmt(w, idents, 0, stmt)?;
    }
    Ok(())
}

fn print_stmt<I: InfoWriter>(
    w: &mut impl Write,
    idents: &Interner<str>,
    i: usize,
    stmt: &Stmt<I>,
) -> std::io::Result<()> {
    match stmt {
        Stmt::Let(Let {
            name,
            ty,
            assignments,
            span,
            sym: _,
        }) => {
            sp(w, i)?;
            let ty = type_name(idents, ty);
            writeln!(w, "let {}: {ty} ({span})", idents.get(name))?;
            for (idx, body) in assignments.iter().enumerate() {
                if idx == 0 {
                    print_expr(w, idents, i + 1, body)?;
                } else {
                    sp(w, i + 1)?;
                    writeln!(w, "where")?;
                    print_expr(w, idents, i + 2, body)?;
                }
            }
        }
        Stmt::Function(Function {
            name,
            params,
            return_ty,
            body,
            ..
        }) => {
            sp(w, i)?;
            write!(w, "func {}(", idents.get(name))?;
            for (idx, param) in params.iter().enumerate() {
                if idx > 0 {
                    write!(w, ", ")?;
                }
                let ty = type_name(idents, &param.ty);
                write!(w, "{}: {ty}", idents.get(param.name))?;
            }
            writeln!(w, ") -> {}", type_name(idents, return_ty))?;
            print_block(w, idents, i + 1, body)?;
        }
        Stmt::Record(Record { name, fields, .. }) => {
            sp(w, i)?;
            writeln!(w, "type {}", idents.get(name))?;
            for field in fields {
                sp(w, i + 1)?;
                let ty = type_name(idents, &field.ty);
                writeln!(w, "field {}: {ty}", idents.get(field.name))?;
            }
        }
        Stmt::Expr(expr) => print_expr(w, idents, i, expr)?,
    }
    Ok(())
}

fn print_block<I: InfoWriter>(
    w: &mut impl Write,
    idents: &Interner<str>,
    i: usize,
    block: &Block<I>,
) -> std::io::Result<()> {
    sp(w, i)?;
    let info = block.info.write_resolved(idents);
    writeln!(w, "block ({}{info})", block.span)?;
    for stmt in &block.stmts {
        print_stmt(w, idents, i + 1, stmt)?;
    }
    Ok(())
}

pub fn print_expr<I: InfoWriter>(
    w: &mut impl Write,
    idents: &Interner<str>,
    i: usize,
    expr: &Expr<I>,
) -> std::io::Result<()> {
    let info = expr.info.write_resolved(idents); // inferred type, for typed trees
    let span = expr.span;
    if let ExprKind::Block(block) = &expr.kind {
        return print_block(w, idents, i, block);
    }
    sp(w, i)?;
    match &expr.kind {
        ExprKind::Number(val) => {
            writeln!(w, "number {val} ({span}{info})")?;
        }
        ExprKind::String(val) => {
            writeln!(w, "string {val:?} ({span}{info})")?;
        }
        ExprKind::Bool(val) => {
            writeln!(w, "bool {val} ({span}{info})")?;
        }
        ExprKind::Named(ident, _) => {
            writeln!(w, "named {} ({span}{info})", idents.get(ident))?;
        }
        ExprKind::Binary { op, lhs, rhs } => {
            writeln!(w, "binary {op:?} ({span}{info})")?;
            print_expr(w, idents, i + 1, lhs)?;
            print_expr(w, idents, i + 1, rhs)?;
        }
        ExprKind::Range { from, to, step } => {
            writeln!(w, "range ({span}{info})")?;
            print_expr(w, idents, i + 1, from)?;
            print_expr(w, idents, i + 1, to)?;
            if let Some(step) = step {
                print_expr(w, idents, i + 1, step)?;
            }
        }
        ExprKind::Call { name, args, .. } => {
            writeln!(w, "call {} ({span}{info})", idents.get(name))?;
            for arg in args {
                print_expr(w, idents, i + 1, arg)?;
            }
        }
        ExprKind::If {
            cond,
            then_block,
            else_block,
        } => {
            writeln!(w, "if ({span}{info})")?;
            print_expr(w, idents, i + 1, cond)?;
            print_block(w, idents, i + 1, then_block)?;
            if let Some(else_block) = else_block {
                print_block(w, idents, i + 1, else_block)?;
            }
        }
        ExprKind::Foreach {
            element,
            element_ty,
            range,
            body,
            ..
        } => {
            let ty = type_name(idents, element_ty);
            writeln!(w, "foreach {}: {ty} ({span}{info})", idents.get(element))?;
            print_expr(w, idents, i + 1, range)?;
            print_block(w, idents, i + 1, body)?;
        }
        ExprKind::Member { base, field, .. } => {
            writeln!(w, "member {} ({span}{info})", idents.get(field))?;
            print_expr(w, idents, i + 1, base)?;
        }
        ExprKind::Construct { ty, args, .. } => {
            writeln!(w, "construct {} ({span}{info})", idents.get(ty))?;
            for arg in args {
                print_expr(w, idents, i + 1, arg)?;
            }
        }
        ExprKind::Block(_) => unreachable!("printed above"),
    }
    Ok(())
}

fn type_name(idents: &Interner<str>, ty: &TypeName) -> String {
    let mut out = idents.get(ty).to_owned();
    if !ty.args.is_empty() {
        out.push('<');
        for (idx, arg) in ty.args.iter().enumerate() {
            if idx > 0 {
                out.push_str(", ");
            }
            out.push_str(&type_name(idents, arg));
        }
        out.push('>');
    }
    out
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}

pub trait InfoWriter: Info<Ty: NameWriter, BlockTy: NameWriter> {}

impl<I> InfoWriter for I
where
    I: Info,
    I::Ty: NameWriter,
    I::BlockTy: NameWriter,
{
}

pub trait NameWriter {
    fn write_resolved<'i>(&self, idents: &'i Interner<str>) -> impl std::fmt::Display + 'i {
        _ = idents;
        ""
    }
}

impl NameWriter for () {}

impl NameWriter for TypeDetail {
    fn write_resolved<'i>(&self, idents: &'i Interner<str>) -> impl std::fmt::Display + 'i {
        format!(" %: {}", self.display(idents))
    }
}

impl NameWriter for Option<TypeDetail> {
    fn write_resolved<'i>(&self, idents: &'i Interner<str>) -> impl std::fmt::Display + 'i {
        match self {
            Some(ty) => format!(" %: {}", ty.display(idents)),
            None => String::new(),
        }
    }
}
