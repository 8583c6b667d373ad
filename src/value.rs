//! Dynamically typed values and object instances.
//!
//! An [`Object`] is an instance of a [`TypeDescriptor`]: one value slot per
//! field declared anywhere in its chain, keyed by the field's qualified name
//! so that private fields of the same name on different ancestors stay apart.

// used for the slot map of object instances
use core::hash::BuildHasherDefault;
use std::collections::{HashMap, HashSet};
use seahash::SeaHasher;

// objects are shared and mutated through the reflective accessors
use std::sync::{Arc, RwLock};

// used to print out readable forms of a value
use std::fmt;

// used for timestamps and decimal numbers
use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;

use crate::metadata::{FieldDescriptor, TypeDescriptor};

pub type SlotHasher = BuildHasherDefault<SeaHasher>;
pub type ObjectRef = Arc<RwLock<Object>>;

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    String(String),
    Decimal(BigDecimal),
    DateTime(NaiveDateTime),
    List(Vec<Value>),
    Object(ObjectRef),
}

impl Value {
    pub fn object(object: Object) -> Value {
        Value::Object(Arc::new(RwLock::new(object)))
    }
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => String::from("null"),
            Value::Bool(_) => String::from("boolean"),
            Value::Byte(_) => String::from("byte"),
            Value::Short(_) => String::from("short"),
            Value::Int(_) => String::from("int"),
            Value::Long(_) => String::from("long"),
            Value::Float(_) => String::from("float"),
            Value::Double(_) => String::from("double"),
            Value::Char(_) => String::from("char"),
            Value::String(_) => String::from("String"),
            Value::Decimal(_) => String::from("Decimal"),
            Value::DateTime(_) => String::from("DateTime"),
            Value::List(_) => String::from("List"),
            Value::Object(o) => match o.read() {
                Ok(object) => object.class().name().to_owned(),
                Err(_) => String::from("<poisoned>"),
            },
        }
    }
    /// Structural equality: objects are equal when they share a class and
    /// all their slots are deeply equal. Cycles are followed only once.
    pub fn deep_eq(&self, other: &Value) -> bool {
        deep_eq(self, other, &mut HashSet::new())
    }
}

fn object_id(object: &ObjectRef) -> usize {
    Arc::as_ptr(object) as *const () as usize
}

fn deep_eq(a: &Value, b: &Value, visiting: &mut HashSet<(usize, usize)>) -> bool {
    match (a, b) {
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| deep_eq(a, b, visiting))
        }
        (Value::Object(a), Value::Object(b)) => {
            if Arc::ptr_eq(a, b) || !visiting.insert((object_id(a), object_id(b))) {
                return true;
            }
            let (Ok(left), Ok(right)) = (a.read(), b.read()) else {
                return false;
            };
            left.class().name() == right.class().name()
                && left.slots.len() == right.slots.len()
                && left.slots.iter().all(|(key, value)| {
                    right.slots.get(key).is_some_and(|other| deep_eq(value, other, visiting))
                })
        }
        (a, b) => a == b,
    }
}

impl PartialEq for Value {
    /// Objects compare by identity, everything else by value.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Byte(b) => write!(f, "{}", b),
            Value::Short(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::Float(x) => write!(f, "{}", x),
            Value::Double(x) => write!(f, "{}", x),
            Value::Char(c) => write!(f, "{}", c),
            Value::String(s) => write!(f, "{}", s),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::DateTime(d) => write!(f, "{}", d),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            // never lock-wait while printing, the caller may hold the lock
            Value::Object(o) => match o.try_read() {
                Ok(object) => write!(f, "{}@{:x}", object.class().name(), object_id(o)),
                Err(_) => write!(f, "Object@{:x}", object_id(o)),
            },
        }
    }
}
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Char(c) => write!(f, "{:?}", c),
            Value::List(l) => f.debug_list().entries(l).finish(),
            other => write!(f, "{}", other),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Bool(b) }
}
impl From<i8> for Value {
    fn from(b: i8) -> Self { Value::Byte(b) }
}
impl From<i16> for Value {
    fn from(s: i16) -> Self { Value::Short(s) }
}
impl From<i32> for Value {
    fn from(i: i32) -> Self { Value::Int(i) }
}
impl From<i64> for Value {
    fn from(l: i64) -> Self { Value::Long(l) }
}
impl From<f32> for Value {
    fn from(x: f32) -> Self { Value::Float(x) }
}
impl From<f64> for Value {
    fn from(x: f64) -> Self { Value::Double(x) }
}
impl From<char> for Value {
    fn from(c: char) -> Self { Value::Char(c) }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::String(s.to_owned()) }
}
impl From<String> for Value {
    fn from(s: String) -> Self { Value::String(s) }
}
impl From<BigDecimal> for Value {
    fn from(d: BigDecimal) -> Self { Value::Decimal(d) }
}
impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self { Value::DateTime(d) }
}
impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self { Value::List(l) }
}
impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self { Value::Object(o) }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ------------- Object -------------
pub struct Object {
    class: Arc<TypeDescriptor>,
    slots: HashMap<String, Value, SlotHasher>,
}

impl Object {
    pub fn new(class: &Arc<TypeDescriptor>) -> Self {
        let slots = class
            .instance_fields()
            .map(|f| (f.qualified_name().to_owned(), f.initial_value()))
            .collect();
        Self {
            class: Arc::clone(class),
            slots,
        }
    }
    pub fn new_ref(class: &Arc<TypeDescriptor>) -> ObjectRef {
        Arc::new(RwLock::new(Object::new(class)))
    }
    pub fn class(&self) -> &Arc<TypeDescriptor> {
        &self.class
    }
    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
    /// Raw slot read, no access checks.
    pub(crate) fn slot(&self, field: &FieldDescriptor) -> Option<&Value> {
        self.slots.get(field.qualified_name())
    }
    /// Raw slot write, no access or type checks. Returns false when the
    /// instance carries no slot for `field`.
    pub(crate) fn put(&mut self, field: &FieldDescriptor, value: Value) -> bool {
        match self.slots.get_mut(field.qualified_name()) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}
impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut s = f.debug_struct(self.class.name());
        for field in self.class.instance_fields() {
            if let Some(value) = self.slot(field) {
                s.field(field.name(), value);
            }
        }
        s.finish()
    }
}
