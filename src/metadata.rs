//! Runtime type metadata.
//!
//! A [`TypeDescriptor`] names a type, links to its superclass and owns the
//! fields, methods and class-level annotations declared on it. Descriptors
//! are built once through [`TypeBuilder`] and shared as `Arc`s; the only
//! state that changes afterwards is the accessibility of a field.

// used to share descriptors between types and object instances
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

// used to print out readable forms of the metadata
use std::fmt;

use lazy_static::lazy_static;

use crate::value::Value;

/// Name of the universal root type every hierarchy ends in.
pub const ROOT_TYPE: &str = "Object";

lazy_static! {
    static ref ROOT: Arc<TypeDescriptor> = Arc::new(TypeDescriptor {
        name: String::from(ROOT_TYPE),
        superclass: None,
        fields: Vec::new(),
        methods: Vec::new(),
        annotations: Vec::new(),
        restricted: false,
    });
}

// ------------- Annotation -------------
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Annotation {
    marker: String,
    value: Option<String>,
}

impl Annotation {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            value: None,
        }
    }
    pub fn with_value(marker: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            value: Some(value.into()),
        }
    }
    pub fn marker(&self) -> &str {
        &self.marker
    }
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
    pub fn is(&self, marker: &str) -> bool {
        self.marker == marker
    }
}
impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "@{}(\"{}\")", self.marker, value),
            None => write!(f, "@{}", self.marker),
        }
    }
}

fn find_annotation<'a>(annotations: &'a [Annotation], marker: &str) -> Option<&'a Annotation> {
    annotations.iter().find(|a| a.is(marker))
}

// A target carries at most one annotation per marker, the latest one wins.
fn put_annotation(annotations: &mut Vec<Annotation>, annotation: Annotation) {
    annotations.retain(|a| a.marker != annotation.marker);
    annotations.push(annotation);
}

// ------------- Modifiers -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    Public,
    Protected,
    #[default]
    Package,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    visibility: Visibility,
    is_final: bool,
}

impl Modifiers {
    pub fn public() -> Self {
        Self { visibility: Visibility::Public, is_final: false }
    }
    pub fn protected() -> Self {
        Self { visibility: Visibility::Protected, is_final: false }
    }
    pub fn package() -> Self {
        Self::default()
    }
    pub fn private() -> Self {
        Self { visibility: Visibility::Private, is_final: false }
    }
    pub fn with_final(mut self) -> Self {
        self.is_final = true;
        self
    }
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
    pub fn is_final(&self) -> bool {
        self.is_final
    }
}
impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.visibility {
            Visibility::Public => write!(f, "public ")?,
            Visibility::Protected => write!(f, "protected ")?,
            Visibility::Package => (),
            Visibility::Private => write!(f, "private ")?,
        }
        if self.is_final {
            write!(f, "final ")?;
        }
        Ok(())
    }
}

// ------------- FieldType -------------
/// Declared type of a field. Primitive kinds never hold null.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
    String,
    Decimal,
    DateTime,
    List,
    Class(String),
}

impl FieldType {
    pub fn class(name: impl Into<String>) -> Self {
        FieldType::Class(name.into())
    }
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            FieldType::Bool
                | FieldType::Byte
                | FieldType::Short
                | FieldType::Int
                | FieldType::Long
                | FieldType::Float
                | FieldType::Double
                | FieldType::Char
        )
    }
    pub fn name(&self) -> &str {
        match self {
            FieldType::Bool => "boolean",
            FieldType::Byte => "byte",
            FieldType::Short => "short",
            FieldType::Int => "int",
            FieldType::Long => "long",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Char => "char",
            FieldType::String => "String",
            FieldType::Decimal => "Decimal",
            FieldType::DateTime => "DateTime",
            FieldType::List => "List",
            FieldType::Class(name) => name,
        }
    }
    /// The value a freshly created instance holds in a field of this type.
    pub fn default_value(&self) -> Value {
        match self {
            FieldType::Bool => Value::Bool(false),
            FieldType::Byte => Value::Byte(0),
            FieldType::Short => Value::Short(0),
            FieldType::Int => Value::Int(0),
            FieldType::Long => Value::Long(0),
            FieldType::Float => Value::Float(0.0),
            FieldType::Double => Value::Double(0.0),
            FieldType::Char => Value::Char('\0'),
            _ => Value::Null,
        }
    }
    /// Converts `value` into something a field of this type can hold,
    /// applying widening primitive conversions. The rejected value is handed
    /// back in the inner error when no assignment is possible; the outer one
    /// reports an object value whose lock is poisoned.
    pub fn coerce(&self, value: Value) -> crate::error::Result<Result<Value, Value>> {
        use FieldType as T;
        use Value as V;
        let coerced = match (self, value) {
            (T::Bool, V::Bool(b)) => Ok(V::Bool(b)),

            (T::Byte, V::Byte(b)) => Ok(V::Byte(b)),

            (T::Short, V::Byte(b)) => Ok(V::Short(b.into())),
            (T::Short, V::Short(s)) => Ok(V::Short(s)),

            (T::Char, V::Char(c)) => Ok(V::Char(c)),

            (T::Int, V::Byte(b)) => Ok(V::Int(b.into())),
            (T::Int, V::Short(s)) => Ok(V::Int(s.into())),
            (T::Int, V::Char(c)) => Ok(V::Int(u32::from(c) as i32)),
            (T::Int, V::Int(i)) => Ok(V::Int(i)),

            (T::Long, V::Byte(b)) => Ok(V::Long(b.into())),
            (T::Long, V::Short(s)) => Ok(V::Long(s.into())),
            (T::Long, V::Char(c)) => Ok(V::Long(u32::from(c).into())),
            (T::Long, V::Int(i)) => Ok(V::Long(i.into())),
            (T::Long, V::Long(l)) => Ok(V::Long(l)),

            (T::Float, V::Byte(b)) => Ok(V::Float(b.into())),
            (T::Float, V::Short(s)) => Ok(V::Float(s.into())),
            (T::Float, V::Char(c)) => Ok(V::Float(u32::from(c) as f32)),
            (T::Float, V::Int(i)) => Ok(V::Float(i as f32)),
            (T::Float, V::Long(l)) => Ok(V::Float(l as f32)),
            (T::Float, V::Float(f)) => Ok(V::Float(f)),

            (T::Double, V::Byte(b)) => Ok(V::Double(b.into())),
            (T::Double, V::Short(s)) => Ok(V::Double(s.into())),
            (T::Double, V::Char(c)) => Ok(V::Double(u32::from(c).into())),
            (T::Double, V::Int(i)) => Ok(V::Double(i.into())),
            (T::Double, V::Long(l)) => Ok(V::Double(l as f64)),
            (T::Double, V::Float(f)) => Ok(V::Double(f.into())),
            (T::Double, V::Double(d)) => Ok(V::Double(d)),

            (t, V::Null) if !t.is_primitive() => Ok(V::Null),
            (T::String, V::String(s)) => Ok(V::String(s)),
            (T::Decimal, V::Decimal(d)) => Ok(V::Decimal(d)),
            (T::DateTime, V::DateTime(d)) => Ok(V::DateTime(d)),
            (T::List, V::List(l)) => Ok(V::List(l)),

            // the root type takes any non-null value, boxing primitives
            (T::Class(name), value) if name == ROOT_TYPE => Ok(value),
            (T::Class(name), V::Object(o)) => {
                let assignable = o.read()?.class().is_subtype_of(name);
                if assignable { Ok(V::Object(o)) } else { Err(V::Object(o)) }
            }

            (_, value) => Err(value),
        };
        Ok(coerced)
    }
}
impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ------------- FieldDescriptor -------------
#[derive(Debug)]
pub struct FieldDescriptor {
    declaring_type: String,
    qualified_name: String,
    name: String,
    field_type: FieldType,
    modifiers: Modifiers,
    annotations: Vec<Annotation>,
    initial: Option<Value>,
    // permanently opened through set_accessible
    accessible: AtomicBool,
    // number of get/set calls currently holding a scoped opening
    open_scopes: AtomicUsize,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            declaring_type: String::new(),
            qualified_name: name.clone(),
            name,
            field_type,
            modifiers: Modifiers::default(),
            annotations: Vec::new(),
            initial: None,
            accessible: AtomicBool::new(false),
            open_scopes: AtomicUsize::new(0),
        }
    }
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
    pub fn annotate(mut self, annotation: Annotation) -> Self {
        put_annotation(&mut self.annotations, annotation);
        self
    }
    /// Value new instances start out with instead of the type default.
    pub fn with_initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = Some(value.into());
        self
    }
    fn declared_on(mut self, declaring_type: &str) -> Self {
        self.declaring_type = declaring_type.to_owned();
        self.qualified_name = format!("{}.{}", declaring_type, self.name);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }
    /// `DeclaringType.name`, unique across a hierarchy.
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }
    pub fn is_public(&self) -> bool {
        self.modifiers.is_public()
    }
    pub fn is_final(&self) -> bool {
        self.modifiers.is_final()
    }
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    pub fn annotation(&self, marker: &str) -> Option<&Annotation> {
        find_annotation(&self.annotations, marker)
    }
    pub fn has_annotation(&self, marker: &str) -> bool {
        self.annotation(marker).is_some()
    }
    pub fn initial_value(&self) -> Value {
        match &self.initial {
            Some(value) => value.clone(),
            None => self.field_type.default_value(),
        }
    }

    /// Whether the language access checks are currently overridden,
    /// permanently or by an open scope.
    pub fn is_accessible(&self) -> bool {
        self.accessible.load(Ordering::Acquire) || self.open_scopes.load(Ordering::Acquire) > 0
    }
    pub fn set_accessible(&self, accessible: bool) {
        self.accessible.store(accessible, Ordering::Release);
    }
    /// Opens access until the returned guard is dropped.
    pub fn open_access(&self) -> AccessGuard<'_> {
        self.open_scopes.fetch_add(1, Ordering::AcqRel);
        AccessGuard { field: self }
    }
}
impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{} {}", self.modifiers, self.field_type, self.qualified_name)
    }
}

/// Scoped accessibility opening, see [`FieldDescriptor::open_access`].
#[derive(Debug)]
pub struct AccessGuard<'a> {
    field: &'a FieldDescriptor,
}
impl Drop for AccessGuard<'_> {
    fn drop(&mut self) {
        self.field.open_scopes.fetch_sub(1, Ordering::AcqRel);
    }
}

// ------------- MethodDescriptor -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    name: String,
    annotations: Vec<Annotation>,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: Vec::new(),
        }
    }
    pub fn annotate(mut self, annotation: Annotation) -> Self {
        put_annotation(&mut self.annotations, annotation);
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    pub fn annotation(&self, marker: &str) -> Option<&Annotation> {
        find_annotation(&self.annotations, marker)
    }
}

// ------------- TypeDescriptor -------------
#[derive(Debug)]
pub struct TypeDescriptor {
    name: String,
    superclass: Option<Arc<TypeDescriptor>>,
    fields: Vec<FieldDescriptor>,
    methods: Vec<MethodDescriptor>,
    annotations: Vec<Annotation>,
    // platform-internal types refuse forced access to their non-public fields
    restricted: bool,
}

impl TypeDescriptor {
    pub fn root() -> Arc<TypeDescriptor> {
        Arc::clone(&ROOT)
    }
    pub fn builder(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(name)
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn superclass(&self) -> Option<&Arc<TypeDescriptor>> {
        self.superclass.as_ref()
    }
    pub fn is_root(&self) -> bool {
        self.superclass.is_none()
    }
    pub fn is_restricted(&self) -> bool {
        self.restricted
    }
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    pub fn declared_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }
    pub fn annotation(&self, marker: &str) -> Option<&Annotation> {
        find_annotation(&self.annotations, marker)
    }
    /// This type and its superclasses, most-derived first, root excluded.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }
    /// Every type is a subtype of itself and of the root.
    pub fn is_subtype_of(&self, name: &str) -> bool {
        name == ROOT_TYPE || self.ancestors().any(|t| t.name == name)
    }
    /// The type in this chain declaring this very `field`. A descriptor
    /// from another type never matches, even under the same names.
    pub fn declarer_of(&self, field: &FieldDescriptor) -> Option<&TypeDescriptor> {
        self.ancestors().find(|t| t.fields.iter().any(|f| std::ptr::eq(f, field)))
    }
    /// Every field an instance of this type carries, most-derived first.
    pub fn instance_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.ancestors().flat_map(|t| t.fields.iter())
    }
}
impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    next: Option<&'a TypeDescriptor>,
}
impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a TypeDescriptor;
    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.filter(|t| !t.is_root())?;
        self.next = current.superclass.as_deref();
        Some(current)
    }
}

// ------------- TypeBuilder -------------
pub struct TypeBuilder {
    name: String,
    superclass: Arc<TypeDescriptor>,
    fields: Vec<FieldDescriptor>,
    methods: Vec<MethodDescriptor>,
    annotations: Vec<Annotation>,
    restricted: bool,
}

impl TypeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: TypeDescriptor::root(),
            fields: Vec::new(),
            methods: Vec::new(),
            annotations: Vec::new(),
            restricted: false,
        }
    }
    pub fn extends(mut self, superclass: &Arc<TypeDescriptor>) -> Self {
        self.superclass = Arc::clone(superclass);
        self
    }
    /// Declares a field; redeclaring a name replaces the earlier field.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        let field = field.declared_on(&self.name);
        self.fields.retain(|f| f.name != field.name);
        self.fields.push(field);
        self
    }
    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.retain(|m| m.name != method.name);
        self.methods.push(method);
        self
    }
    pub fn annotate(mut self, annotation: Annotation) -> Self {
        put_annotation(&mut self.annotations, annotation);
        self
    }
    pub fn restricted(mut self) -> Self {
        self.restricted = true;
        self
    }
    pub fn build(self) -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor {
            name: self.name,
            superclass: Some(self.superclass),
            fields: self.fields,
            methods: self.methods,
            annotations: self.annotations,
            restricted: self.restricted,
        })
    }
}
