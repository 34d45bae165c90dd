//! Polymorphic comparison and arithmetic primitives.
//!
//! Dispatch inspects both operand kinds: matching built-in kinds use the
//! native operation, a pair of class instances defers to the left operand's
//! dunder method, anything else is an error. `greater`, `less_or_equal` and
//! `greater_or_equal` are derived from `equal` and `less`.

use std::slice;

use crate::runtime::{Context, Object, ObjectHolder, RuntimeError};

/// Comparison operators dispatched over runtime values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equal,
    NotEqual,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
}

pub fn compare(
    comparator: Comparator,
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    match comparator {
        Comparator::Equal => equal(lhs, rhs, ctx),
        Comparator::NotEqual => not_equal(lhs, rhs, ctx),
        Comparator::Less => less(lhs, rhs, ctx),
        Comparator::Greater => greater(lhs, rhs, ctx),
        Comparator::LessOrEqual => less_or_equal(lhs, rhs, ctx),
        Comparator::GreaterOrEqual => greater_or_equal(lhs, rhs, ctx),
    }
}

/// Equality over `{Number, String, Bool, ClassInstance}`; two empty handles
/// are equal.
pub fn equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    if lhs.is_none() && rhs.is_none() {
        return Ok(true);
    }
    if let (Some(lhs), Some(rhs)) = (lhs.as_string(), rhs.as_string()) {
        return Ok(lhs == rhs);
    }
    if let (Some(lhs), Some(rhs)) = (lhs.as_number(), rhs.as_number()) {
        return Ok(lhs == rhs);
    }
    if let (Some(lhs), Some(rhs)) = (lhs.as_bool(), rhs.as_bool()) {
        return Ok(lhs == rhs);
    }
    if lhs.is_class_instance() && rhs.is_class_instance() && lhs.has_method("__eq__", 1) {
        return dunder_comparison(lhs, "__eq__", rhs, ctx);
    }
    Err(unsupported("equality", lhs, rhs))
}

pub fn less(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    if let (Some(lhs), Some(rhs)) = (lhs.as_string(), rhs.as_string()) {
        return Ok(lhs < rhs);
    }
    if let (Some(lhs), Some(rhs)) = (lhs.as_number(), rhs.as_number()) {
        return Ok(lhs < rhs);
    }
    if let (Some(lhs), Some(rhs)) = (lhs.as_bool(), rhs.as_bool()) {
        return Ok(lhs < rhs);
    }
    if lhs.is_class_instance() && rhs.is_class_instance() && lhs.has_method("__lt__", 1) {
        return dunder_comparison(lhs, "__lt__", rhs, ctx);
    }
    Err(unsupported("ordering", lhs, rhs))
}

pub fn not_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(!equal(lhs, rhs, ctx)?)
}

pub fn greater(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(not_equal(lhs, rhs, ctx)? && !less(lhs, rhs, ctx)?)
}

pub fn less_or_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(less(lhs, rhs, ctx)? || equal(lhs, rhs, ctx)?)
}

pub fn greater_or_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(!less(lhs, rhs, ctx)?)
}

/// Addition: numbers add, strings concatenate, a class instance defers to its
/// `__add__` method.
pub fn add(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<ObjectHolder, RuntimeError> {
    if let (Some(lhs), Some(rhs)) = (lhs.as_number(), rhs.as_number()) {
        let sum = lhs
            .checked_add(rhs)
            .ok_or(RuntimeError::IntegerOverflow {
                operation: "addition",
            })?;
        return Ok(ObjectHolder::own(Object::Number(sum)));
    }
    if let (Some(lhs), Some(rhs)) = (lhs.as_string(), rhs.as_string()) {
        return Ok(ObjectHolder::own(Object::String(lhs + &rhs)));
    }
    if lhs.has_method("__add__", 1) {
        return lhs.call_method("__add__", slice::from_ref(rhs), ctx);
    }
    Err(unsupported("addition", lhs, rhs))
}

pub fn sub(lhs: &ObjectHolder, rhs: &ObjectHolder) -> Result<ObjectHolder, RuntimeError> {
    if let (Some(lhs), Some(rhs)) = (lhs.as_number(), rhs.as_number()) {
        let difference = lhs
            .checked_sub(rhs)
            .ok_or(RuntimeError::IntegerOverflow {
                operation: "subtraction",
            })?;
        return Ok(ObjectHolder::own(Object::Number(difference)));
    }
    Err(unsupported("subtraction", lhs, rhs))
}

pub fn mul(lhs: &ObjectHolder, rhs: &ObjectHolder) -> Result<ObjectHolder, RuntimeError> {
    if let (Some(lhs), Some(rhs)) = (lhs.as_number(), rhs.as_number()) {
        let product = lhs
            .checked_mul(rhs)
            .ok_or(RuntimeError::IntegerOverflow {
                operation: "multiplication",
            })?;
        return Ok(ObjectHolder::own(Object::Number(product)));
    }
    Err(unsupported("multiplication", lhs, rhs))
}

pub fn div(lhs: &ObjectHolder, rhs: &ObjectHolder) -> Result<ObjectHolder, RuntimeError> {
    if let (Some(lhs), Some(rhs)) = (lhs.as_number(), rhs.as_number()) {
        if rhs == 0 {
            return Err(RuntimeError::DivisionByZero);
        }
        let quotient = lhs
            .checked_div(rhs)
            .ok_or(RuntimeError::IntegerOverflow {
                operation: "division",
            })?;
        return Ok(ObjectHolder::own(Object::Number(quotient)));
    }
    Err(unsupported("division", lhs, rhs))
}

fn dunder_comparison(
    lhs: &ObjectHolder,
    method: &str,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    let result = lhs.call_method(method, slice::from_ref(rhs), ctx)?;
    result
        .as_bool()
        .ok_or_else(|| RuntimeError::NonBoolComparison {
            method: method.to_string(),
        })
}

fn unsupported(operation: &'static str, lhs: &ObjectHolder, rhs: &ObjectHolder) -> RuntimeError {
    RuntimeError::UnsupportedOperands {
        operation,
        lhs: lhs.type_name().to_string(),
        rhs: rhs.type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Statement;
    use crate::runtime::{Class, ClassInstance, Method, StreamContext};
    use std::rc::Rc;

    fn number(value: i32) -> ObjectHolder {
        ObjectHolder::own(Object::Number(value))
    }

    fn string(value: &str) -> ObjectHolder {
        ObjectHolder::own(Object::String(value.to_string()))
    }

    fn boolean(value: bool) -> ObjectHolder {
        ObjectHolder::own(Object::Bool(value))
    }

    fn ctx() -> StreamContext<Vec<u8>> {
        StreamContext::buffered()
    }

    fn method(name: &str, params: &[&str], body: Statement) -> Method {
        Method {
            name: name.to_string(),
            formal_params: params.iter().map(|param| param.to_string()).collect(),
            body: Box::new(Statement::MethodBody {
                body: Box::new(body),
            }),
        }
    }

    fn instance_of(class: &Rc<Class>) -> ObjectHolder {
        ObjectHolder::own(Object::ClassInstance(ClassInstance::new(class)))
    }

    /// A class whose `__eq__`/`__lt__` compare the `rank` field.
    fn ranked_class() -> Rc<Class> {
        let compare_rank = |comparator| Statement::Return {
            value: Box::new(Statement::Comparison {
                comparator,
                lhs: Box::new(Statement::VariableValue {
                    path: vec!["self".to_string(), "rank".to_string()],
                }),
                rhs: Box::new(Statement::VariableValue {
                    path: vec!["other".to_string(), "rank".to_string()],
                }),
            }),
        };
        Class::new(
            "Ranked".to_string(),
            vec![
                method("__eq__", &["other"], compare_rank(Comparator::Equal)),
                method("__lt__", &["other"], compare_rank(Comparator::Less)),
            ],
            None,
        )
    }

    fn ranked(class: &Rc<Class>, rank: i32) -> ObjectHolder {
        let instance = instance_of(class);
        instance
            .set_field("rank", number(rank))
            .expect("set_field should succeed");
        instance
    }

    #[test]
    fn compares_builtin_kinds() {
        let mut ctx = ctx();
        assert!(equal(&number(3), &number(3), &mut ctx).expect("equal"));
        assert!(!equal(&number(3), &number(4), &mut ctx).expect("equal"));
        assert!(equal(&string("ab"), &string("ab"), &mut ctx).expect("equal"));
        assert!(equal(&boolean(false), &boolean(false), &mut ctx).expect("equal"));

        assert!(less(&number(3), &number(4), &mut ctx).expect("less"));
        assert!(less(&string("ab"), &string("b"), &mut ctx).expect("less"));
        assert!(less(&boolean(false), &boolean(true), &mut ctx).expect("less"));
        assert!(!less(&boolean(true), &boolean(true), &mut ctx).expect("less"));
    }

    #[test]
    fn two_empty_handles_are_equal() {
        let mut ctx = ctx();
        assert!(equal(&ObjectHolder::none(), &ObjectHolder::none(), &mut ctx).expect("equal"));
        assert!(
            !greater(&ObjectHolder::none(), &ObjectHolder::none(), &mut ctx).expect("greater")
        );
    }

    #[test]
    fn derived_comparisons_follow_equal_and_less() {
        let mut ctx = ctx();
        assert!(greater(&number(5), &number(4), &mut ctx).expect("greater"));
        assert!(!greater(&number(4), &number(4), &mut ctx).expect("greater"));
        assert!(less_or_equal(&number(4), &number(4), &mut ctx).expect("le"));
        assert!(less_or_equal(&number(3), &number(4), &mut ctx).expect("le"));
        assert!(!less_or_equal(&number(5), &number(4), &mut ctx).expect("le"));
        assert!(greater_or_equal(&number(4), &number(4), &mut ctx).expect("ge"));
        assert!(!greater_or_equal(&number(3), &number(4), &mut ctx).expect("ge"));
    }

    #[test]
    fn equality_and_ordering_are_consistent() {
        let mut ctx = ctx();
        for (lhs, rhs) in [(2, 2), (2, 5), (5, 2)] {
            let lhs = number(lhs);
            let rhs = number(rhs);
            if equal(&lhs, &rhs, &mut ctx).expect("equal") {
                assert!(!less(&lhs, &rhs, &mut ctx).expect("less"));
                assert!(!less(&rhs, &lhs, &mut ctx).expect("less"));
            }
            if less(&lhs, &rhs, &mut ctx).expect("less") {
                assert!(!equal(&lhs, &rhs, &mut ctx).expect("equal"));
            }
        }
    }

    #[test]
    fn errors_on_mixed_operand_kinds() {
        let mut ctx = ctx();
        let error = equal(&number(1), &string("1"), &mut ctx).expect_err("expected type error");
        assert_eq!(
            error,
            RuntimeError::UnsupportedOperands {
                operation: "equality",
                lhs: "Number".to_string(),
                rhs: "String".to_string(),
            }
        );
        assert!(less(&boolean(true), &number(1), &mut ctx).is_err());
        assert!(equal(&ObjectHolder::none(), &number(1), &mut ctx).is_err());
    }

    #[test]
    fn instances_compare_through_dunder_methods() {
        let class = ranked_class();
        let mut ctx = ctx();
        let two = ranked(&class, 2);
        let three = ranked(&class, 3);

        assert!(equal(&two, &ranked(&class, 2), &mut ctx).expect("equal"));
        assert!(!equal(&two, &three, &mut ctx).expect("equal"));
        assert!(less(&two, &three, &mut ctx).expect("less"));
        assert!(greater(&three, &two, &mut ctx).expect("greater"));
    }

    #[test]
    fn instances_without_comparison_methods_are_incomparable() {
        let class = Class::new("Blank".to_string(), Vec::new(), None);
        let mut ctx = ctx();
        assert!(equal(&instance_of(&class), &instance_of(&class), &mut ctx).is_err());
    }

    #[test]
    fn errors_when_comparison_method_returns_non_bool() {
        let class = Class::new(
            "Odd".to_string(),
            vec![method(
                "__eq__",
                &["other"],
                Statement::Return {
                    value: Box::new(Statement::NumberConst(1)),
                },
            )],
            None,
        );
        let mut ctx = ctx();
        let error = equal(&instance_of(&class), &instance_of(&class), &mut ctx)
            .expect_err("expected non-bool comparison error");
        assert_eq!(
            error,
            RuntimeError::NonBoolComparison {
                method: "__eq__".to_string(),
            }
        );
    }

    #[test]
    fn adds_numbers_and_concatenates_strings() {
        let mut ctx = ctx();
        let sum = add(&number(2), &number(3), &mut ctx).expect("add");
        assert_eq!(sum.as_number(), Some(5));
        let joined = add(&string("foo"), &string("bar"), &mut ctx).expect("add");
        assert_eq!(joined.as_string(), Some("foobar".to_string()));
        assert!(add(&number(1), &string("x"), &mut ctx).is_err());
    }

    #[test]
    fn adds_instances_through_their_add_method() {
        // __add__ returns the sum of both ranks as a plain number.
        let class = Class::new(
            "Ranked".to_string(),
            vec![method(
                "__add__",
                &["other"],
                Statement::Return {
                    value: Box::new(Statement::BinaryOp {
                        op: crate::ast::BinaryOperator::Add,
                        lhs: Box::new(Statement::VariableValue {
                            path: vec!["self".to_string(), "rank".to_string()],
                        }),
                        rhs: Box::new(Statement::VariableValue {
                            path: vec!["other".to_string(), "rank".to_string()],
                        }),
                    }),
                },
            )],
            None,
        );
        let mut ctx = ctx();
        let lhs = ranked(&class, 2);
        let rhs = ranked(&class, 3);
        let sum = add(&lhs, &rhs, &mut ctx).expect("add");
        assert_eq!(sum.as_number(), Some(5));
    }

    #[test]
    fn subtraction_multiplication_and_division_require_numbers() {
        assert_eq!(sub(&number(5), &number(2)).expect("sub").as_number(), Some(3));
        assert_eq!(mul(&number(5), &number(2)).expect("mul").as_number(), Some(10));
        assert_eq!(div(&number(5), &number(2)).expect("div").as_number(), Some(2));
        assert!(sub(&string("a"), &string("b")).is_err());
        assert!(mul(&boolean(true), &number(2)).is_err());
        assert!(div(&string("a"), &number(2)).is_err());
    }

    #[test]
    fn division_by_zero_fails() {
        let error = div(&number(1), &number(0)).expect_err("expected division error");
        assert_eq!(error, RuntimeError::DivisionByZero);
    }

    #[test]
    fn arithmetic_overflow_is_reported() {
        let mut ctx = ctx();
        assert_eq!(
            add(&number(i32::MAX), &number(1), &mut ctx).expect_err("expected overflow"),
            RuntimeError::IntegerOverflow {
                operation: "addition"
            }
        );
        assert_eq!(
            div(&number(i32::MIN), &number(-1)).expect_err("expected overflow"),
            RuntimeError::IntegerOverflow {
                operation: "division"
            }
        );
    }
}
