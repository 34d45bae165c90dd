//! Runtime object and value model shared with the AST executor.
//!
//! Values form a closed sum (`Object`) reached through reference-counted
//! `ObjectHolder` handles. A handle is either empty (the language-level
//! `None`), owning, or a non-owning share. The share form exists solely for
//! the `self` binding of an instance: an owning handle in
//! `fields["self"]` would tie the instance into a cycle that reference
//! counting cannot collect.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::{Rc, Weak};

pub mod error;
pub mod ops;

pub use error::RuntimeError;

/// One lexical scope: variable name → value handle. Method activations get a
/// fresh closure seeded with their arguments and `self`.
pub type Closure = HashMap<String, ObjectHolder>;

/// Evaluation context threaded through every statement execution.
pub trait Context {
    fn output(&mut self) -> &mut dyn Write;
}

/// Context writing program output to an arbitrary sink.
pub struct StreamContext<W> {
    output: W,
}

impl<W: Write> StreamContext<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }
}

impl StreamContext<Vec<u8>> {
    /// In-memory context for tests and for `str(...)` rendering.
    pub fn buffered() -> Self {
        Self::new(Vec::new())
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl<W: Write> Context for StreamContext<W> {
    fn output(&mut self) -> &mut dyn Write {
        &mut self.output
    }
}

/// Outcome of executing one statement.
///
/// `Returning` carries a value travelling out of a method body. Intermediate
/// statements propagate it untouched; `MethodBody` collapses it back into a
/// completed value.
#[derive(Debug)]
pub enum ExecResult {
    Completed(ObjectHolder),
    Returning(ObjectHolder),
}

/// Contract between the runtime and the AST: every node evaluates to a value
/// handle within a closure and a context.
pub trait Executable: std::fmt::Debug {
    fn execute(
        &self,
        closure: &mut Closure,
        ctx: &mut dyn Context,
    ) -> Result<ExecResult, RuntimeError>;
}

/// A method as stored by its defining class.
#[derive(Debug)]
pub struct Method {
    pub name: String,
    pub formal_params: Vec<String>,
    pub body: Box<dyn Executable>,
}

/// A user-defined class: its methods in definition order and an optional
/// parent for single inheritance. Classes are immutable once defined.
#[derive(Debug)]
pub struct Class {
    name: String,
    methods: Vec<Rc<Method>>,
    parent: Option<Weak<Class>>,
}

impl Class {
    pub fn new(name: String, methods: Vec<Method>, parent: Option<&Rc<Class>>) -> Rc<Self> {
        Rc::new(Self {
            name,
            methods: methods.into_iter().map(Rc::new).collect(),
            parent: parent.map(Rc::downgrade),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Walks the inheritance chain for `name`, scanning each class's methods
    /// in definition order.
    pub fn get_method(&self, name: &str) -> Option<Rc<Method>> {
        if let Some(method) = self.methods.iter().find(|method| method.name == name) {
            return Some(Rc::clone(method));
        }
        self.parent.as_ref()?.upgrade()?.get_method(name)
    }
}

/// An instance of a user class: a non-owning reference to the class plus the
/// instance's fields.
#[derive(Debug)]
pub struct ClassInstance {
    class: Weak<Class>,
    fields: Closure,
}

impl ClassInstance {
    pub fn new(class: &Rc<Class>) -> Self {
        Self {
            class: Rc::downgrade(class),
            fields: Closure::new(),
        }
    }

    pub fn class(&self) -> Option<Rc<Class>> {
        self.class.upgrade()
    }

    pub fn fields(&self) -> &Closure {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Closure {
        &mut self.fields
    }

    /// True when the class hierarchy defines `name` with exactly `argc`
    /// formal parameters. Arity is the only form of overload resolution.
    pub fn has_method(&self, name: &str, argc: usize) -> bool {
        self.class()
            .and_then(|class| class.get_method(name))
            .is_some_and(|method| method.formal_params.len() == argc)
    }
}

/// Runtime value kinds, dispatched by matching.
#[derive(Debug)]
pub enum Object {
    Number(i32),
    String(String),
    Bool(bool),
    Class(Rc<Class>),
    ClassInstance(ClassInstance),
}

impl Object {
    fn type_name(&self) -> &'static str {
        match self {
            Object::Number(_) => "Number",
            Object::String(_) => "String",
            Object::Bool(_) => "Bool",
            Object::Class(_) => "Class",
            Object::ClassInstance(_) => "ClassInstance",
        }
    }
}

#[derive(Debug, Clone, Default)]
enum Slot {
    #[default]
    None,
    Owned(Rc<RefCell<Object>>),
    Shared(Weak<RefCell<Object>>),
}

/// Shared-ownership handle to a runtime object with a distinguished `None`
/// state.
#[derive(Debug, Clone, Default)]
pub struct ObjectHolder {
    slot: Slot,
}

impl ObjectHolder {
    pub fn none() -> Self {
        Self { slot: Slot::None }
    }

    /// Allocates a fresh object and takes ownership of it.
    pub fn own(object: Object) -> Self {
        Self {
            slot: Slot::Owned(Rc::new(RefCell::new(object))),
        }
    }

    /// A handle aliasing the same object without extending its lifetime.
    pub fn share(&self) -> Self {
        let slot = match &self.slot {
            Slot::None => Slot::None,
            Slot::Owned(object) => Slot::Shared(Rc::downgrade(object)),
            Slot::Shared(object) => Slot::Shared(Weak::clone(object)),
        };
        Self { slot }
    }

    pub fn is_none(&self) -> bool {
        matches!(self.slot, Slot::None)
    }

    fn get(&self) -> Option<Rc<RefCell<Object>>> {
        match &self.slot {
            Slot::None => None,
            Slot::Owned(object) => Some(Rc::clone(object)),
            Slot::Shared(object) => object.upgrade(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self.get() {
            Some(object) => {
                let name = object.borrow().type_name();
                name
            }
            None => "None",
        }
    }

    pub fn as_number(&self) -> Option<i32> {
        let object = self.get()?;
        let value = match &*object.borrow() {
            Object::Number(value) => Some(*value),
            _ => None,
        };
        value
    }

    pub fn as_string(&self) -> Option<String> {
        let object = self.get()?;
        let value = match &*object.borrow() {
            Object::String(value) => Some(value.clone()),
            _ => None,
        };
        value
    }

    pub fn as_bool(&self) -> Option<bool> {
        let object = self.get()?;
        let value = match &*object.borrow() {
            Object::Bool(value) => Some(*value),
            _ => None,
        };
        value
    }

    pub fn as_class(&self) -> Option<Rc<Class>> {
        let object = self.get()?;
        let class = match &*object.borrow() {
            Object::Class(class) => Some(Rc::clone(class)),
            _ => None,
        };
        class
    }

    pub fn is_class_instance(&self) -> bool {
        self.get()
            .is_some_and(|object| matches!(&*object.borrow(), Object::ClassInstance(_)))
    }

    /// Reads `fields[name]` of a class instance.
    pub fn field(&self, name: &str) -> Result<ObjectHolder, RuntimeError> {
        let object = self.get().ok_or_else(|| not_an_instance("None"))?;
        let borrowed = object.borrow();
        let Object::ClassInstance(instance) = &*borrowed else {
            return Err(not_an_instance(borrowed.type_name()));
        };
        instance
            .fields()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedField {
                field: name.to_string(),
            })
    }

    /// Stores `value` under `fields[name]` of a class instance and hands the
    /// stored handle back.
    pub fn set_field(&self, name: &str, value: ObjectHolder) -> Result<ObjectHolder, RuntimeError> {
        let object = self.get().ok_or_else(|| not_an_instance("None"))?;
        let mut borrowed = object.borrow_mut();
        let Object::ClassInstance(instance) = &mut *borrowed else {
            return Err(not_an_instance(borrowed.type_name()));
        };
        instance.fields_mut().insert(name.to_string(), value.clone());
        Ok(value)
    }

    pub fn has_method(&self, method: &str, argc: usize) -> bool {
        self.get().is_some_and(|object| match &*object.borrow() {
            Object::ClassInstance(instance) => instance.has_method(method, argc),
            _ => false,
        })
    }

    /// Calls `method` on a class instance with `args`.
    ///
    /// Before the body runs, `fields["self"]` is (re)installed as a
    /// non-owning share of the instance and copied into the activation
    /// closure alongside the argument bindings.
    pub fn call_method(
        &self,
        method: &str,
        args: &[ObjectHolder],
        ctx: &mut dyn Context,
    ) -> Result<ObjectHolder, RuntimeError> {
        let object = self.get().ok_or_else(|| not_an_instance("None"))?;
        let resolved = {
            let borrowed = object.borrow();
            let Object::ClassInstance(instance) = &*borrowed else {
                return Err(not_an_instance(borrowed.type_name()));
            };
            let class = instance.class().ok_or(RuntimeError::ClassDropped)?;
            let found =
                class
                    .get_method(method)
                    .ok_or_else(|| RuntimeError::UnknownMethod {
                        method: method.to_string(),
                        class: class.name().to_string(),
                    })?;
            if found.formal_params.len() != args.len() {
                return Err(RuntimeError::MethodArityMismatch {
                    method: method.to_string(),
                    expected: found.formal_params.len(),
                    found: args.len(),
                });
            }
            found
        };

        let self_binding = self.share();
        {
            let mut borrowed = object.borrow_mut();
            if let Object::ClassInstance(instance) = &mut *borrowed {
                instance
                    .fields_mut()
                    .insert("self".to_string(), self_binding.clone());
            }
        }

        let mut closure = Closure::new();
        for (param, arg) in resolved.formal_params.iter().zip(args) {
            closure.insert(param.clone(), arg.clone());
        }
        closure.insert("self".to_string(), self_binding);

        match resolved.body.execute(&mut closure, ctx)? {
            ExecResult::Completed(value) | ExecResult::Returning(value) => Ok(value),
        }
    }

    /// Prints the referenced value to `out`.
    ///
    /// Instances render through their `__str__` method when one taking no
    /// arguments exists, otherwise as an opaque address-based identifier. An
    /// empty handle prints as `None`.
    pub fn print(&self, out: &mut dyn Write, ctx: &mut dyn Context) -> Result<(), RuntimeError> {
        let Some(object) = self.get() else {
            return write_output(out, "None");
        };
        if self.has_method("__str__", 0) {
            let rendered = self.call_method("__str__", &[], ctx)?;
            return rendered.print(out, ctx);
        }
        let borrowed = object.borrow();
        let text = match &*borrowed {
            Object::Number(value) => value.to_string(),
            Object::String(value) => value.clone(),
            Object::Bool(true) => "True".to_string(),
            Object::Bool(false) => "False".to_string(),
            Object::Class(class) => format!("Class {}", class.name()),
            Object::ClassInstance(instance) => match instance.class() {
                Some(class) => {
                    format!("<{} object at {:p}>", class.name(), Rc::as_ptr(&object))
                }
                None => format!("<object at {:p}>", Rc::as_ptr(&object)),
            },
        };
        write_output(out, &text)
    }
}

/// Renders a value to text with the same dispatch as printing.
pub fn render(value: &ObjectHolder, ctx: &mut dyn Context) -> Result<String, RuntimeError> {
    let mut buffer = Vec::new();
    value.print(&mut buffer, ctx)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Truthiness: `None`, classes and instances are falsy; numbers, strings and
/// booleans follow their payload.
pub fn is_true(value: &ObjectHolder) -> bool {
    let Some(object) = value.get() else {
        return false;
    };
    let truth = match &*object.borrow() {
        Object::Number(value) => *value != 0,
        Object::String(value) => !value.is_empty(),
        Object::Bool(value) => *value,
        Object::Class(_) | Object::ClassInstance(_) => false,
    };
    truth
}

pub(crate) fn write_output(out: &mut dyn Write, text: &str) -> Result<(), RuntimeError> {
    out.write_all(text.as_bytes())
        .map_err(|error| RuntimeError::OutputWrite {
            message: error.to_string(),
        })
}

fn not_an_instance(type_name: &str) -> RuntimeError {
    RuntimeError::NotAnInstance {
        type_name: type_name.to_string(),
    }
}
