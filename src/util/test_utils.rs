use crate::{parser, util::fmt::tree};

/// Each variant contains the input.
pub enum Test {
    ParserProgram(&'static str),
    ParserExpr(&'static str),
}

pub enum Assertion {
    TreeOk(&'static str),
    ExpectedError(&'static str),
}

/// Returns the printed tree, or the formatted parse error.
pub fn run_pipeline(test: Test) -> Result<String, String> {
    match test {
        Test::ParserProgram(input) => parser::parse_program(input)
            .map(|program| tree::print_program_string(&program))
            .map_err(|error| error.to_string()),
        Test::ParserExpr(input) => parser::parse_expr(input)
            .map(|expr| tree::print_node_string(&expr))
            .map_err(|error| error.to_string()),
    }
}

#[track_caller]
pub fn run_assertion(assertion: Assertion, actual: &Result<String, String>) {
    match assertion {
        Assertion::TreeOk(expected_tree) => match actual {
            Ok(tree) => ::pretty_assertions::assert_eq!(tree.trim(), expected_tree.trim()),
            Err(error) => panic!("unexpected parse error: {error}"),
        },
        Assertion::ExpectedError(expected_error) => {
            ::pretty_assertions::assert_eq!(actual.as_ref().err(), Some(&expected_error.to_owned()));
        }
    }
}

macro_rules! tree_tests {
    (
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
                    tree_tests!(@@get_test($source_kind), ::indoc::indoc! { $source });
                let actual = crate::util::test_utils::run_pipeline(test);
                tree_tests!(@@expand_assertions, &actual, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $actual:expr, []) => {};
    (@@expand_assertions, $actual:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            tree_tests!(@@assertion, $assertion, $assertion_expected),
            $actual,
        );
        tree_tests!(@@expand_assertions, $actual, [$($rest_assertions_tt)*]);
    };

    (@@assertion, tree_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, expected_error, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedError($expected)
    };

    (@@get_test(program), $source:expr) => {
        crate::util::test_utils::Test::ParserProgram($source)
    };
    (@@get_test(expr), $source:expr) => {
        crate::util::test_utils::Test::ParserExpr($source)
    };
}
pub(crate) use tree_tests;
