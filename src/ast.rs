// module ::= (func | record)*
// func ::= 'func' ID '(' [ID type (',' ID type)*] ')' '->' type block
// record ::= 'type' ID '{' [ID type (',' ID type)*] '}'
// type ::= ID ['<' type (',' type)* '>']
// block ::= '{' stmt* '}'
// stmt ::= func | record | let | expr
// let ::= 'let' ID type '=' body ('where' chained)*
// chained ::= body | if-without-else | foreach
// body ::= block | expr
// expr ::= operand (binop operand)*
// operand ::= (number | string | true | false
//            | ID | ID '(' args ')' | ID '{' args '}'
//            | '(' expr ')' | block | if | range) ('.' ID)*
// if ::= 'if' expr 'then' body ['else' body]
// foreach ::= 'foreach' ID type 'in' expr 'do' body
// range ::= '[' expr 'to' expr ['step' expr] ']'

// Precedence
//
// * / %
// + -
// ..
// < >
// == !=
// and
// or

use std::fmt::Debug;

use crate::{
    symbols::SymbolId,
    token::Span,
    types::TypeDetail,
    util::intern::Interned,
};

/// Decoration carried by the tree. The parser produces [`Untyped`] trees, and
/// the binder maps them into [`Typed`] ones.
pub trait Info: Debug + PartialEq {
    /// Resolved type of an expression.
    type Ty: Debug + PartialEq + Clone;
    /// Resolved type of a block, which may have no value.
    type BlockTy: Debug + PartialEq + Clone;
    /// Resolved symbol reference.
    type Sym: Debug + PartialEq + Copy;
}

#[derive(Debug, PartialEq)]
pub struct Untyped;

impl Info for Untyped {
    type Ty = ();
    type BlockTy = ();
    type Sym = ();
}

#[derive(Debug, PartialEq)]
pub struct Typed;

impl Info for Typed {
    type Ty = TypeDetail;
    type BlockTy = Option<TypeDetail>;
    type Sym = SymbolId;
}

#[derive(Debug, PartialEq)]
pub struct Module<I: Info> {
    /// Only [`Stmt::Function`] and [`Stmt::Record`] appear at this level.
    pub stmts: Vec<Stmt<I>>,
}

impl<I: Info> Default for Module<I> {
    fn default() -> Self {
        Module { stmts: Vec::new() }
    }
}

#[derive(Debug, PartialEq)]
pub enum Stmt<I: Info> {
    Let(Let<I>),
    Function(Function<I>),
    Record(Record<I>),
    Expr(Expr<I>),
}

impl<I: Info> Stmt<I> {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Let(l) => l.span,
            Stmt::Function(f) => f.span,
            Stmt::Record(r) => r.span,
            Stmt::Expr(e) => e.span,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct Let<I: Info> {
    pub name: Ident,
    pub ty: TypeName,
    /// Non empty list of assignment bodies, in `where` chain order.
    pub assignments: Vec<Expr<I>>,
    pub span: Span,
    pub sym: I::Sym,
}

#[derive(Debug, PartialEq)]
pub struct Function<I: Info> {
    pub name: Ident,
    pub params: Vec<Binding<I>>,
    pub return_ty: TypeName,
    pub body: Block<I>,
    pub span: Span,
    pub sym: I::Sym,
}

#[derive(Debug, PartialEq)]
pub struct Record<I: Info> {
    pub name: Ident,
    pub fields: Vec<Binding<I>>,
    pub span: Span,
    pub sym: I::Sym,
}

/// A typed name, used for function parameters and record fields.
#[derive(Debug, PartialEq)]
pub struct Binding<I: Info> {
    pub name: Ident,
    pub ty: TypeName,
    pub sym: I::Sym,
}

#[derive(Debug, PartialEq)]
pub struct Block<I: Info> {
    pub stmts: Vec<Stmt<I>>,
    pub span: Span,
    pub info: I::BlockTy,
}

#[derive(Debug, PartialEq)]
pub struct Expr<I: Info> {
    pub kind: ExprKind<I>,
    pub span: Span,
    pub info: I::Ty,
}

#[derive(Debug, PartialEq)]
pub enum ExprKind<I: Info> {
    Number(f64),
    String(Box<str>),
    Bool(bool),
    Named(Ident, I::Sym),
    Binary {
        op: BinaryOperator,
        lhs: Box<Expr<I>>,
        rhs: Box<Expr<I>>,
    },
    Range {
        from: Box<Expr<I>>,
        to: Box<Expr<I>>,
        step: Option<Box<Expr<I>>>,
    },
    Call {
        name: Ident,
        args: Vec<Expr<I>>,
        sym: I::Sym,
    },
    If {
        cond: Box<Expr<I>>,
        then_block: Block<I>,
        else_block: Option<Block<I>>,
    },
    Foreach {
        element: Ident,
        element_ty: TypeName,
        range: Box<Expr<I>>,
        body: Block<I>,
        sym: I::Sym,
    },
    Member {
        base: Box<Expr<I>>,
        field: Ident,
        sym: I::Sym,
    },
    Construct {
        ty: Ident,
        args: Vec<Expr<I>>,
        sym: I::Sym,
    },
    Block(Block<I>),
}

impl<I: Info> ExprKind<I> {
    /// Whether this is one of the forms only accepted as a chained let body:
    /// an `if` without `else`, or a `foreach`.
    pub fn is_self_assigning(&self) -> bool {
        matches!(
            self,
            ExprKind::If {
                else_block: None,
                ..
            } | ExprKind::Foreach { .. }
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    And,
    Eq,
    Ne,
    Greater,
    Less,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOperator {
    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        use BinaryOperator::*;
        match self {
            Or => 1,
            And => 2,
            Eq | Ne => 3,
            Greater | Less => 4,
            Concat => 5,
            Add | Sub => 6,
            Mul | Div | Rem => 7,
        }
    }

    pub fn symbol(self) -> &'static str {
        use BinaryOperator::*;
        match self {
            Or => "or",
            And => "and",
            Eq => "==",
            Ne => "!=",
            Greater => ">",
            Less => "<",
            Concat => "..",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Rem => "%",
        }
    }
}

/// A type annotation, such as `Number` or `Seq<Seq<Number>>`.
#[derive(Debug, PartialEq)]
pub struct TypeName {
    pub name: Ident,
    pub args: Vec<TypeName>,
    pub span: Span,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ident {
    pub name: Interned<str>,
    pub span: Span,
}

impl From<Ident> for Interned<str> {
    fn from(value: Ident) -> Self {
        value.name
    }
}

impl From<&Ident> for Interned<str> {
    fn from(value: &Ident) -> Self {
        value.name
    }
}

impl From<&TypeName> for Interned<str> {
    fn from(value: &TypeName) -> Self {
        value.name.name
    }
}
