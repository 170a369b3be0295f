use crate::ast::BinaryOperator;

/// Binding strength of the operators that may appear inside an expression.
/// Greater binds tighter.
pub fn precedence(op: BinaryOperator) -> u8 {
    use BinaryOperator::*;
    match op {
        Mul | Div | Mod => 4,
        Add | Sub => 3,
        Lt | Le | Gt | Ge | Eq | Ne => 2,
        And | Or => 1,
        Assign => 0,
    }
}

/// Folds a flat, left to right list of operands and the operators between
/// them into a single tree.
///
/// Each round combines the leftmost operator that binds at least as tight
/// as its right neighbour (the last operator always qualifies), so equal
/// precedences group to the left. Quadratic in the worst case, which is fine
/// for hand-written expressions.
pub fn reduce<T>(
    mut operands: Vec<T>,
    mut operators: Vec<BinaryOperator>,
    mut combine: impl FnMut(BinaryOperator, T, T) -> T,
) -> T {
    assert_eq!(
        operands.len(),
        operators.len() + 1,
        "every operator must sit between two operands"
    );
    while !operators.is_empty() {
        let i = (1..operators.len())
            .find(|&i| precedence(operators[i - 1]) >= precedence(operators[i]))
            .unwrap_or(operators.len());
        let op = operators.remove(i - 1);
        let rhs = operands.remove(i);
        let lhs = operands.remove(i - 1);
        operands.insert(i - 1, combine(op, lhs, rhs));
    }
    operands.pop().expect("at least one operand")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use BinaryOperator::*;

    /// Renders the grouping with explicit parentheses.
    fn group(operands: &[&str], operators: &[BinaryOperator]) -> String {
        let operands = operands.iter().map(ToString::to_string).collect();
        reduce(operands, operators.to_vec(), |op, lhs, rhs| {
            format!("{op:?}({lhs}, {rhs})")
        })
    }

    #[test]
    fn test_single_operand() {
        assert_eq!(group(&["7"], &[]), "7");
    }

    #[test]
    fn test_multiplicative_over_additive() {
        assert_eq!(group(&["2", "3", "4"], &[Add, Mul]), "Add(2, Mul(3, 4))");
        assert_eq!(group(&["2", "3", "4"], &[Mul, Add]), "Add(Mul(2, 3), 4)");
    }

    #[test]
    fn test_left_associative_ties() {
        assert_eq!(group(&["1", "2", "3"], &[Sub, Sub]), "Sub(Sub(1, 2), 3)");
        assert_eq!(
            group(&["8", "4", "2", "1"], &[Div, Mod, Mul]),
            "Mul(Mod(Div(8, 4), 2), 1)"
        );
    }

    #[test]
    fn test_relational_over_logical() {
        assert_eq!(
            group(&["1", "2", "3", "4"], &[Eq, And, Lt]),
            "And(Eq(1, 2), Lt(3, 4))"
        );
        assert_eq!(
            group(&["a", "b", "c", "d", "e"], &[Or, Add, Mul, Ge]),
            "Or(a, Ge(Add(b, Mul(c, d)), e))"
        );
    }

    #[test]
    fn test_climbing_then_falling() {
        assert_eq!(
            group(&["a", "b", "c", "d"], &[Add, Mul, Sub]),
            "Sub(Add(a, Mul(b, c)), d)"
        );
    }
}
