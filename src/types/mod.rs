//! Static types and runtime values.
//!
//! A rule never sees host data directly. Every expression is typed against a
//! [`TypeRef`] at compile time and produces a [`Value`] at evaluation time; host
//! objects stay behind the [`registry`] accessors and are only ever reached
//! through `&dyn Any` projections.

pub mod registry;

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::eval::{EvalError, EvalResult};

pub use registry::{
    BaseLink, Invoker, Lookup, MemberAccessor, MemberDescriptor, MethodDescriptor,
    ParameterDescriptor, TypeBuilder, TypeCatalog, TypeDescriptor, TypeRegistry,
};

/// Short, human readable name of a Rust type (`my_app::ctx::Order` -> `Order`).
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let head = full.split('<').next().unwrap_or(full);
    let start = head.rfind("::").map(|i| i + 2).unwrap_or(0);
    &full[start..]
}

/// Data and behaviour aggregate a rule is bound to.
///
/// The compiler never requires anything of a context beyond being a `'static`
/// type that has been registered in a [`TypeCatalog`].
pub trait Context: Any {
    fn context_name(&self) -> &str {
        short_type_name::<Self>()
    }
}

/// A host type known to the registry, identified by its `TypeId`.
#[derive(Clone)]
pub struct ObjectType {
    id: TypeId,
    name: Arc<str>,
}

impl ObjectType {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: Arc::from(short_type_name::<T>()),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for ObjectType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ObjectType {}

impl Hash for ObjectType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectType({})", self.name)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Static type of an expression.
///
/// Matching is always exact: there is no widening between `Int` and `Decimal`
/// and no coercion to `String`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Void,
    Bool,
    Int,
    Decimal,
    String,
    Array(Box<TypeRef>),
    Object(ObjectType),
}

impl TypeRef {
    pub fn object<T: Any>() -> Self {
        TypeRef::Object(ObjectType::of::<T>())
    }

    pub fn array(element: TypeRef) -> Self {
        TypeRef::Array(Box::new(element))
    }

    /// Types that can be produced as a [`Value`].
    pub fn is_value_type(&self) -> bool {
        !matches!(self, TypeRef::Void | TypeRef::Object(_))
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            TypeRef::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Kind tag used by tooling descriptions.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            TypeRef::Int => "INT",
            TypeRef::Bool => "BOOL",
            TypeRef::Decimal => "DECIMAL",
            TypeRef::String => "STRING",
            TypeRef::Void => "VOID",
            TypeRef::Array(_) | TypeRef::Object(_) => "OTHER",
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => f.write_str("Void"),
            TypeRef::Bool => f.write_str("Boolean"),
            TypeRef::Int => f.write_str("Int32"),
            TypeRef::Decimal => f.write_str("Decimal"),
            TypeRef::String => f.write_str("String"),
            TypeRef::Array(element) => write!(f, "{}[]", element),
            TypeRef::Object(object) => write!(f, "{}", object),
        }
    }
}

pub(crate) fn join_type_names(types: &[TypeRef]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Runtime value flowing through a compiled expression.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Unit,
    Bool(bool),
    Int(i32),
    Decimal(Decimal),
    String(String),
    Array {
        element: TypeRef,
        items: Vec<Value>,
    },
}

impl Value {
    pub fn type_ref(&self) -> TypeRef {
        match self {
            Value::Unit => TypeRef::Void,
            Value::Bool(_) => TypeRef::Bool,
            Value::Int(_) => TypeRef::Int,
            Value::Decimal(_) => TypeRef::Decimal,
            Value::String(_) => TypeRef::String,
            Value::Array { element, .. } => TypeRef::array(element.clone()),
        }
    }

    pub fn is_instance_of(&self, ty: &TypeRef) -> bool {
        self.type_ref() == *ty
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Array { items, .. } => Some(items),
            _ => None,
        }
    }
}

/// Renders the value the way it appears in a compiled expression's diagnostic text.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => f.write_str("()"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array { items, .. } => {
                let items = items
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "new [] {{{}}}", items)
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

/// Rust types that map one-to-one onto a rule value type.
pub trait HostType: Sized + 'static {
    fn type_ref() -> TypeRef;
    fn into_value(self) -> Value;
    fn from_value(value: &Value) -> Option<Self>;
}

impl HostType for bool {
    fn type_ref() -> TypeRef {
        TypeRef::Bool
    }
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl HostType for i32 {
    fn type_ref() -> TypeRef {
        TypeRef::Int
    }
    fn into_value(self) -> Value {
        Value::Int(self)
    }
    fn from_value(value: &Value) -> Option<Self> {
        value.as_int()
    }
}

impl HostType for Decimal {
    fn type_ref() -> TypeRef {
        TypeRef::Decimal
    }
    fn into_value(self) -> Value {
        Value::Decimal(self)
    }
    fn from_value(value: &Value) -> Option<Self> {
        value.as_decimal()
    }
}

impl HostType for String {
    fn type_ref() -> TypeRef {
        TypeRef::String
    }
    fn into_value(self) -> Value {
        Value::String(self)
    }
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl HostType for () {
    fn type_ref() -> TypeRef {
        TypeRef::Void
    }
    fn into_value(self) -> Value {
        Value::Unit
    }
    fn from_value(value: &Value) -> Option<Self> {
        matches!(value, Value::Unit).then_some(())
    }
}

impl<T: HostType> HostType for Vec<T> {
    fn type_ref() -> TypeRef {
        TypeRef::array(T::type_ref())
    }
    fn into_value(self) -> Value {
        Value::Array {
            element: T::type_ref(),
            items: self.into_iter().map(HostType::into_value).collect(),
        }
    }
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array { element, items } if *element == T::type_ref() => {
                items.iter().map(T::from_value).collect()
            }
            _ => None,
        }
    }
}

/// Positional arguments handed to a host method.
#[derive(Clone, Copy, Debug)]
pub struct Arguments<'a> {
    method: &'a str,
    values: &'a [Value],
}

impl<'a> Arguments<'a> {
    pub fn new(method: &'a str, values: &'a [Value]) -> Self {
        Self { method, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    fn value(&self, index: usize) -> EvalResult<&'a Value> {
        self.values
            .get(index)
            .ok_or_else(|| EvalError::MissingArgument {
                method: self.method.to_string(),
                index,
            })
    }

    pub fn get<T: HostType>(&self, index: usize) -> EvalResult<T> {
        let value = self.value(index)?;
        T::from_value(value).ok_or_else(|| EvalError::ArgumentType {
            method: self.method.to_string(),
            index,
            expected: T::type_ref(),
            found: value.type_ref(),
        })
    }

    pub fn bool(&self, index: usize) -> EvalResult<bool> {
        self.get(index)
    }

    pub fn int(&self, index: usize) -> EvalResult<i32> {
        self.get(index)
    }

    pub fn decimal(&self, index: usize) -> EvalResult<Decimal> {
        self.get(index)
    }

    /// Borrowed string argument; avoids the clone `get::<String>` would make.
    pub fn str(&self, index: usize) -> EvalResult<&'a str> {
        let value = self.value(index)?;
        value.as_str().ok_or_else(|| EvalError::ArgumentType {
            method: self.method.to_string(),
            index,
            expected: TypeRef::String,
            found: value.type_ref(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Order;

    #[test]
    fn test_type_names() {
        assert_eq!(TypeRef::Int.to_string(), "Int32");
        assert_eq!(TypeRef::Bool.to_string(), "Boolean");
        assert_eq!(TypeRef::array(TypeRef::Int).to_string(), "Int32[]");
        assert_eq!(TypeRef::object::<Order>().to_string(), "Order");
        assert_eq!(short_type_name::<Vec<Order>>(), "Vec<kettei::types::tests::Order>");
    }

    #[test]
    fn test_object_type_identity() {
        assert_eq!(ObjectType::of::<Order>(), ObjectType::of::<Order>());
        assert_ne!(TypeRef::object::<Order>(), TypeRef::object::<String>());
        assert!(!TypeRef::object::<Order>().is_value_type());
        assert!(TypeRef::array(TypeRef::String).is_value_type());
    }

    #[test]
    fn test_value_rendering() {
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::from("Furnace").to_string(), "\"Furnace\"");
        let array = vec![1, 2].into_value();
        assert_eq!(array.to_string(), "new [] {1, 2}");
        assert_eq!(array.type_ref(), TypeRef::array(TypeRef::Int));
    }

    #[test]
    fn test_host_type_conversions() {
        let values = vec!["a".to_string(), "b".to_string()].into_value();
        assert_eq!(
            Vec::<String>::from_value(&values),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(Vec::<i32>::from_value(&values), None);
        assert_eq!(<()>::from_value(&Value::Unit), Some(()));
    }

    #[test]
    fn test_arguments_accessors() {
        let values = vec![Value::Int(7), Value::from("x")];
        let args = Arguments::new("Probe", &values);
        assert_eq!(args.int(0).unwrap(), 7);
        assert_eq!(args.str(1).unwrap(), "x");
        assert!(matches!(
            args.bool(0),
            Err(EvalError::ArgumentType { index: 0, .. })
        ));
        assert!(matches!(
            args.int(2),
            Err(EvalError::MissingArgument { index: 2, .. })
        ));
    }
}
