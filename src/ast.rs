//! AST statement nodes and the tree-walking executor.
//!
//! Statements and expressions share one node set; every node implements the
//! runtime's `Executable` contract. Expression-like nodes always complete
//! with a value, while `Return` starts a `Returning` transfer that
//! `Compound` and `IfElse` propagate untouched and `MethodBody` collapses at
//! the method boundary.

use std::rc::Rc;

use crate::runtime::ops::{self, Comparator};
use crate::runtime::{
    self, Class, ClassInstance, Closure, Context, ExecResult, Executable, Object, ObjectHolder,
    RuntimeError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mult,
    Div,
}

#[derive(Debug)]
pub enum Statement {
    NumberConst(i32),
    StringConst(String),
    BoolConst(bool),
    NoneConst,
    /// Dotted variable read `n0.n1...nk`. The head resolves in the closure;
    /// every value holding a field along the way must be a class instance.
    VariableValue {
        path: Vec<String>,
    },
    Assignment {
        name: String,
        value: Box<Statement>,
    },
    /// `path.field = value`; `path` resolves like `VariableValue` and must
    /// name a class instance.
    FieldAssignment {
        path: Vec<String>,
        field: String,
        value: Box<Statement>,
    },
    NewInstance {
        class: Rc<Class>,
        args: Vec<Statement>,
    },
    Print {
        args: Vec<Statement>,
    },
    MethodCall {
        object: Box<Statement>,
        method: String,
        args: Vec<Statement>,
    },
    /// `str(arg)`: renders the value with print dispatch and wraps the text.
    Stringify {
        arg: Box<Statement>,
    },
    BinaryOp {
        op: BinaryOperator,
        lhs: Box<Statement>,
        rhs: Box<Statement>,
    },
    And {
        lhs: Box<Statement>,
        rhs: Box<Statement>,
    },
    Or {
        lhs: Box<Statement>,
        rhs: Box<Statement>,
    },
    Not {
        arg: Box<Statement>,
    },
    Comparison {
        comparator: Comparator,
        lhs: Box<Statement>,
        rhs: Box<Statement>,
    },
    Compound {
        statements: Vec<Statement>,
    },
    IfElse {
        condition: Box<Statement>,
        then_body: Box<Statement>,
        else_body: Option<Box<Statement>>,
    },
    ClassDefinition {
        class: Rc<Class>,
    },
    Return {
        value: Box<Statement>,
    },
    /// The unique wrapper around a method's body: sole handler of the
    /// `Returning` transfer.
    MethodBody {
        body: Box<Statement>,
    },
}

impl Statement {
    /// Evaluates the node in expression position. A return transfer escaping
    /// here means a `return` with no enclosing method body.
    pub fn eval(
        &self,
        closure: &mut Closure,
        ctx: &mut dyn Context,
    ) -> Result<ObjectHolder, RuntimeError> {
        match self.execute(closure, ctx)? {
            ExecResult::Completed(value) => Ok(value),
            ExecResult::Returning(_) => Err(RuntimeError::ReturnOutsideMethod),
        }
    }
}

impl Executable for Statement {
    fn execute(
        &self,
        closure: &mut Closure,
        ctx: &mut dyn Context,
    ) -> Result<ExecResult, RuntimeError> {
        match self {
            Statement::NumberConst(value) => completed(ObjectHolder::own(Object::Number(*value))),
            Statement::StringConst(value) => {
                completed(ObjectHolder::own(Object::String(value.clone())))
            }
            Statement::BoolConst(value) => completed(ObjectHolder::own(Object::Bool(*value))),
            Statement::NoneConst => completed(ObjectHolder::none()),
            Statement::VariableValue { path } => completed(resolve_path(path, closure)?),
            Statement::Assignment { name, value } => {
                let value = value.eval(closure, ctx)?;
                closure.insert(name.clone(), value.clone());
                completed(value)
            }
            Statement::FieldAssignment { path, field, value } => {
                let object = resolve_path(path, closure)?;
                let value = value.eval(closure, ctx)?;
                completed(object.set_field(field, value)?)
            }
            Statement::NewInstance { class, args } => {
                let instance = ObjectHolder::own(Object::ClassInstance(ClassInstance::new(class)));
                // Constructor arguments are only evaluated when an __init__
                // of matching arity exists.
                if instance.has_method("__init__", args.len()) {
                    let argv = eval_args(args, closure, ctx)?;
                    instance.call_method("__init__", &argv, ctx)?;
                }
                completed(instance)
            }
            Statement::Print { args } => {
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        runtime::write_output(ctx.output(), " ")?;
                    }
                    let value = arg.eval(closure, ctx)?;
                    let text = runtime::render(&value, ctx)?;
                    runtime::write_output(ctx.output(), &text)?;
                }
                runtime::write_output(ctx.output(), "\n")?;
                completed(ObjectHolder::none())
            }
            Statement::MethodCall {
                object,
                method,
                args,
            } => {
                let receiver = object.eval(closure, ctx)?;
                let argv = eval_args(args, closure, ctx)?;
                completed(receiver.call_method(method, &argv, ctx)?)
            }
            Statement::Stringify { arg } => {
                let value = arg.eval(closure, ctx)?;
                let text = runtime::render(&value, ctx)?;
                completed(ObjectHolder::own(Object::String(text)))
            }
            Statement::BinaryOp { op, lhs, rhs } => {
                let lhs = lhs.eval(closure, ctx)?;
                let rhs = rhs.eval(closure, ctx)?;
                let result = match op {
                    BinaryOperator::Add => ops::add(&lhs, &rhs, ctx)?,
                    BinaryOperator::Sub => ops::sub(&lhs, &rhs)?,
                    BinaryOperator::Mult => ops::mul(&lhs, &rhs)?,
                    BinaryOperator::Div => ops::div(&lhs, &rhs)?,
                };
                completed(result)
            }
            Statement::And { lhs, rhs } => {
                let truth = runtime::is_true(&lhs.eval(closure, ctx)?)
                    && runtime::is_true(&rhs.eval(closure, ctx)?);
                completed(ObjectHolder::own(Object::Bool(truth)))
            }
            Statement::Or { lhs, rhs } => {
                let truth = runtime::is_true(&lhs.eval(closure, ctx)?)
                    || runtime::is_true(&rhs.eval(closure, ctx)?);
                completed(ObjectHolder::own(Object::Bool(truth)))
            }
            Statement::Not { arg } => {
                let truth = !runtime::is_true(&arg.eval(closure, ctx)?);
                completed(ObjectHolder::own(Object::Bool(truth)))
            }
            Statement::Comparison {
                comparator,
                lhs,
                rhs,
            } => {
                let lhs = lhs.eval(closure, ctx)?;
                let rhs = rhs.eval(closure, ctx)?;
                let truth = ops::compare(*comparator, &lhs, &rhs, ctx)?;
                completed(ObjectHolder::own(Object::Bool(truth)))
            }
            Statement::Compound { statements } => {
                for statement in statements {
                    if let ExecResult::Returning(value) = statement.execute(closure, ctx)? {
                        return Ok(ExecResult::Returning(value));
                    }
                }
                completed(ObjectHolder::none())
            }
            Statement::IfElse {
                condition,
                then_body,
                else_body,
            } => {
                if runtime::is_true(&condition.eval(closure, ctx)?) {
                    then_body.execute(closure, ctx)
                } else if let Some(else_body) = else_body {
                    else_body.execute(closure, ctx)
                } else {
                    completed(ObjectHolder::none())
                }
            }
            Statement::ClassDefinition { class } => {
                let holder = ObjectHolder::own(Object::Class(Rc::clone(class)));
                closure.insert(class.name().to_string(), holder.clone());
                completed(holder)
            }
            Statement::Return { value } => {
                let value = value.eval(closure, ctx)?;
                // A none result falls through instead of leaving the method.
                if value.is_none() {
                    completed(ObjectHolder::none())
                } else {
                    Ok(ExecResult::Returning(value))
                }
            }
            Statement::MethodBody { body } => match body.execute(closure, ctx)? {
                ExecResult::Returning(value) => completed(value),
                ExecResult::Completed(_) => completed(ObjectHolder::none()),
            },
        }
    }
}

fn completed(value: ObjectHolder) -> Result<ExecResult, RuntimeError> {
    Ok(ExecResult::Completed(value))
}

fn resolve_path(path: &[String], closure: &Closure) -> Result<ObjectHolder, RuntimeError> {
    let mut names = path.iter();
    let Some(head) = names.next() else {
        return Err(RuntimeError::UndefinedVariable {
            name: String::new(),
        });
    };
    let mut current = closure
        .get(head)
        .cloned()
        .ok_or_else(|| RuntimeError::UndefinedVariable { name: head.clone() })?;
    for name in names {
        current = current.field(name)?;
    }
    Ok(current)
}

fn eval_args(
    args: &[Statement],
    closure: &mut Closure,
    ctx: &mut dyn Context,
) -> Result<Vec<ObjectHolder>, RuntimeError> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(arg.eval(closure, ctx)?);
    }
    Ok(values)
}
