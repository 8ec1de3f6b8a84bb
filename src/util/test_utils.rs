use crate::{
    binder, parser,
    util::{fmt::tree, intern::Interner},
    vm::{Limits, Machine},
};

/// Each variant contains the input.
pub enum Test {
    ParserModule(&'static str),
    ParserExpr(&'static str),
    BinderModule(&'static str),
}

pub enum Assertion {
    TreeOk(&'static str),
    ExpectedErrors(&'static [&'static str]),
}

#[track_caller]
pub fn run_pipeline(test: Test) -> (String, Vec<String>) {
    let tokens_buf = &mut Vec::with_capacity(1024);
    let interner = &mut Interner::with_capacity(128);

    match test {
        Test::ParserModule(input) => match parser::parse_module(input, tokens_buf, interner) {
            Ok(module) => (tree::print_module_string(interner, &module), vec![]),
            Err(error) => (String::new(), vec![format!("{error:#}")]),
        },
        Test::ParserExpr(input) => match parser::parse_expr(input, tokens_buf, interner) {
            Ok(expr) => (tree::print_expr_string(interner, &expr), vec![]),
            Err(error) => (String::new(), vec![format!("{error:#}")]),
        },
        Test::BinderModule(input) => {
            let module = match parser::parse_module(input, tokens_buf, interner) {
                Ok(module) => module,
                Err(error) => return (String::new(), vec![format!("{error:#}")]),
            };
            match binder::bind(module, interner) {
                Ok(bound) => (tree::print_module_string(interner, &bound.module), vec![]),
                Err(error) => (String::new(), vec![error.to_string()]),
            }
        }
    }
}

/// Compiles `src` and executes it, returning what the entry point writes.
/// Compile and runtime errors are rendered into the returned string.
#[track_caller]
pub fn run_program(src: &str) -> String {
    run_program_with(src, Limits::default())
}

#[track_caller]
pub fn run_program_with(src: &str, limits: Limits) -> String {
    let compilation = match crate::pipeline::compile(src) {
        Ok(compilation) => compilation,
        Err(error) => return format!("error: {error}"),
    };
    let mut machine = Machine::new(&compilation.program, limits);
    let mut out = Vec::new();
    match machine.execute(&mut out) {
        Ok(()) => String::from_utf8(out).unwrap().trim_end().to_owned(),
        Err(error) => format!("runtime error: {error}"),
    }
}

#[track_caller]
pub fn run_assertion(
    assertion: Assertion,
    formatted_actual_tree: &str,
    formatted_actual_errors: &[String],
) {
    match assertion {
        Assertion::TreeOk(expected_tree) => {
            let expected_errors: &[&str] = &[];
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim());
        }
        Assertion::ExpectedErrors(expected_errors) => {
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors)
        }
    }
}

macro_rules! tree_tests {
    (
        use $test_kind:ident;

        $(
            fn $test_name:ident() {
                let $source_kind:ident = $source:expr;
                $($assertions_tt:tt)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let test: crate::util::test_utils::Test =
                    tree_tests!(@@get_test($test_kind, $source_kind), $source);
                let (formatted_actual_tree, formatted_actual_errors) =
                    crate::util::test_utils::run_pipeline(test);
                let ctx = (&formatted_actual_tree, &formatted_actual_errors);
                tree_tests!(@@expand_assertions, ctx, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $ctx:expr, []) => {};
    (@@expand_assertions, $ctx:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            tree_tests!(@@assertion, $assertion, $assertion_expected),
            $ctx.0,
            $ctx.1,
        );
        tree_tests!(@@expand_assertions, $ctx, [$($rest_assertions_tt)*]);
    };

    (@@assertion, tree_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, expected_errors, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedErrors($expected)
    };

    (@@get_test(parser, module), $source:expr) => {
        crate::util::test_utils::Test::ParserModule($source)
    };
    (@@get_test(parser, expr), $source:expr) => {
        crate::util::test_utils::Test::ParserExpr($source)
    };
    (@@get_test(binder, module), $source:expr) => {
        crate::util::test_utils::Test::BinderModule($source)
    };
}
pub(crate) use tree_tests;
