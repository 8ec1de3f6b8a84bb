use std::{fmt, num::NonZeroU32};

use crate::{
    symbols::SymbolId,
    util::intern::{Interned, Interner},
};

/// The resolved type of a value or declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeDetail {
    Number,
    String,
    Boolean,
    /// Marker type of function symbols; never the type of a value.
    Function,
    /// A generic that still lacks its type arguments, e.g. `Seq`.
    Unbound(Generic),
    /// A generic applied to as many arguments as its arity, e.g.
    /// `Seq<Number>`.
    Bound { generic: Generic, args: Vec<TypeDetail> },
    /// A user record type. Two record types are equal iff they were declared
    /// by the same type symbol.
    Record { symbol: SymbolId, name: Interned<str> },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Generic {
    Seq,
}

impl Generic {
    pub fn arity(self) -> usize {
        match self {
            Generic::Seq => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Generic::Seq => "Seq",
        }
    }
}

impl TypeDetail {
    pub fn seq_of(element: TypeDetail) -> TypeDetail {
        TypeDetail::Bound {
            generic: Generic::Seq,
            args: vec![element],
        }
    }

    /// Returns the element type if this is a bound sequence.
    pub fn seq_element(&self) -> Option<&TypeDetail> {
        match self {
            TypeDetail::Bound {
                generic: Generic::Seq,
                args,
            } => args.first(),
            _ => None,
        }
    }

    pub fn display<'a>(&'a self, idents: &'a Interner<str>) -> impl fmt::Display + 'a {
        TypeDisplay { ty: self, idents }
    }
}

struct TypeDisplay<'a> {
    ty: &'a TypeDetail,
    idents: &'a Interner<str>,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            TypeDetail::Number => f.write_str("Number"),
            TypeDetail::String => f.write_str("String"),
            TypeDetail::Boolean => f.write_str("Boolean"),
            TypeDetail::Function => f.write_str("Function"),
            TypeDetail::Unbound(generic) => f.write_str(generic.name()),
            TypeDetail::Bound { generic, args } => {
                write!(f, "{}<", generic.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg.display(self.idents))?;
                }
                f.write_str(">")
            }
            TypeDetail::Record { name, .. } => f.write_str(self.idents.get(*name)),
        }
    }
}

const fn fixed(handle: u32) -> Interned<str> {
    match NonZeroU32::new(handle) {
        Some(handle) => Interned::unchecked_new(handle),
        None => panic!("handles start at one"),
    }
}

/// Built-in type names, registered in the module scope.
pub mod builtins {
    use super::*;

    pub const NUMBER: Interned<str> = fixed(1);
    pub const STRING: Interned<str> = fixed(2);
    pub const BOOLEAN: Interned<str> = fixed(3);
    pub const SEQ: Interned<str> = fixed(4);

    pub const ALL: &[(Interned<str>, &str)] = &[
        (NUMBER, "Number"),
        (STRING, "String"),
        (BOOLEAN, "Boolean"),
        (SEQ, "Seq"),
    ];

    /// The type each built-in name denotes.
    pub fn detail(name: Interned<str>) -> Option<TypeDetail> {
        match name {
            n if n == NUMBER => Some(TypeDetail::Number),
            n if n == STRING => Some(TypeDetail::String),
            n if n == BOOLEAN => Some(TypeDetail::Boolean),
            n if n == SEQ => Some(TypeDetail::Unbound(Generic::Seq)),
            _ => None,
        }
    }
}

/// Names with a special meaning to the pipeline.
pub mod well_known {
    use super::*;

    /// The entry point function.
    pub const MAIN: Interned<str> = fixed(5);

    pub const ALL: &[(Interned<str>, &str)] = &[(MAIN, "Main")];
}

/// Registers the built-in and well-known names, so that their handles match
/// the constants in [`builtins`] and [`well_known`]. Does nothing if the
/// interner was already used.
pub fn preregister(idents: &mut Interner<str>) {
    if !idents.is_empty() {
        return;
    }
    for &(expected, name) in builtins::ALL.iter().chain(well_known::ALL) {
        let handle = idents.intern(name);
        assert_eq!(handle, expected);
    }
}
