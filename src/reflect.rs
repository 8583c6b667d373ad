//! Field and annotation resolution across a type hierarchy.
//!
//! Call sites depend on the [`FieldResolver`] and [`AnnotationResolver`]
//! traits; [`Reflector`] is the plain implementation walking the metadata of
//! [`TypeDescriptor`] chains.
//!
//! Lookups are first-match-wins from the most-derived type upward and never
//! search the root type. Reads and writes force access to non-public (and,
//! for writes, final) fields for the duration of the call only.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{Result, ToolchestError};
use crate::metadata::{AccessGuard, Annotation, FieldDescriptor, FieldType, MethodDescriptor, TypeDescriptor};
use crate::value::{Object, ObjectRef, Value};

/// How a field is looked up in a chain.
#[derive(Debug, Clone, Copy)]
pub enum FieldQuery<'q> {
    Name(&'q str),
    Type(&'q FieldType),
    Annotation(&'q str),
}
impl fmt::Display for FieldQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldQuery::Name(name) => write!(f, "name {}", name),
            FieldQuery::Type(field_type) => write!(f, "type {}", field_type),
            FieldQuery::Annotation(marker) => write!(f, "annotation @{}", marker),
        }
    }
}

pub trait FieldResolver {
    fn field_by_name<'a>(&self, ty: Option<&'a TypeDescriptor>, name: &str) -> Option<&'a FieldDescriptor>;
    fn field_by_type<'a>(&self, ty: Option<&'a TypeDescriptor>, field_type: &FieldType) -> Option<&'a FieldDescriptor>;
    fn field_annotated_with<'a>(&self, ty: Option<&'a TypeDescriptor>, marker: &str) -> Option<&'a FieldDescriptor>;

    /// Reads `field` from `instance`. An absent instance is an error.
    fn get_value(&self, instance: Option<&ObjectRef>, field: &FieldDescriptor) -> Result<Value>;
    /// Writes `value` into `field` of `instance`. An absent field is a no-op,
    /// an absent instance with a present field is an error.
    fn set_value(&self, instance: Option<&ObjectRef>, field: Option<&FieldDescriptor>, value: Value) -> Result<()>;

    fn find_field<'a>(&self, ty: Option<&'a TypeDescriptor>, query: FieldQuery<'_>) -> Option<&'a FieldDescriptor> {
        match query {
            FieldQuery::Name(name) => self.field_by_name(ty, name),
            FieldQuery::Type(field_type) => self.field_by_type(ty, field_type),
            FieldQuery::Annotation(marker) => self.field_annotated_with(ty, marker),
        }
    }

    /// Resolves against the instance's own class, then reads. `Ok(None)`
    /// when no field matches.
    fn get_value_by(&self, instance: Option<&ObjectRef>, query: FieldQuery<'_>) -> Result<Option<Value>> {
        let instance = instance.ok_or_else(|| ToolchestError::NullTarget(format!("cannot read field by {} of a null instance", query)))?;
        let class = instance_class(instance)?;
        match self.find_field(Some(class.as_ref()), query) {
            Some(field) => self.get_value(Some(instance), field).map(Some),
            None => Ok(None),
        }
    }
    /// Resolves against the instance's own class, then writes. Silently does
    /// nothing when the instance is absent or no field matches.
    fn set_value_by(&self, instance: Option<&ObjectRef>, query: FieldQuery<'_>, value: Value) -> Result<()> {
        let Some(instance) = instance else {
            trace!(%query, "null instance, nothing to set");
            return Ok(());
        };
        let class = instance_class(instance)?;
        let field = self.find_field(Some(class.as_ref()), query);
        self.set_value(Some(instance), field, value)
    }

    fn get_value_by_name(&self, instance: Option<&ObjectRef>, name: &str) -> Result<Option<Value>> {
        self.get_value_by(instance, FieldQuery::Name(name))
    }
    fn get_value_by_type(&self, instance: Option<&ObjectRef>, field_type: &FieldType) -> Result<Option<Value>> {
        self.get_value_by(instance, FieldQuery::Type(field_type))
    }
    fn get_value_annotated_with(&self, instance: Option<&ObjectRef>, marker: &str) -> Result<Option<Value>> {
        self.get_value_by(instance, FieldQuery::Annotation(marker))
    }
    fn set_value_by_name(&self, instance: Option<&ObjectRef>, name: &str, value: impl Into<Value>) -> Result<()>
    where
        Self: Sized,
    {
        self.set_value_by(instance, FieldQuery::Name(name), value.into())
    }
    fn set_value_by_type(&self, instance: Option<&ObjectRef>, field_type: &FieldType, value: impl Into<Value>) -> Result<()>
    where
        Self: Sized,
    {
        self.set_value_by(instance, FieldQuery::Type(field_type), value.into())
    }
    fn set_value_annotated_with(&self, instance: Option<&ObjectRef>, marker: &str, value: impl Into<Value>) -> Result<()>
    where
        Self: Sized,
    {
        self.set_value_by(instance, FieldQuery::Annotation(marker), value.into())
    }
}

pub trait AnnotationResolver {
    /// The annotation on `method` if present, otherwise the class-level one
    /// of `declaring_type` or its nearest annotated ancestor.
    fn method_or_class_level_annotation<'a>(
        &self,
        marker: &str,
        method: &'a MethodDescriptor,
        declaring_type: &'a TypeDescriptor,
    ) -> Option<&'a Annotation>;
    fn class_level_annotation<'a>(&self, marker: &str, ty: &'a TypeDescriptor) -> Option<&'a Annotation>;
}

fn instance_class(instance: &ObjectRef) -> Result<Arc<TypeDescriptor>> {
    Ok(Arc::clone(instance.read()?.class()))
}

fn search<'a>(ty: Option<&'a TypeDescriptor>, matches: impl Fn(&FieldDescriptor) -> bool) -> Option<&'a FieldDescriptor> {
    ty?.ancestors().find_map(|t| t.fields().iter().find(|f| matches(f)))
}

fn access_error(field: &FieldDescriptor, reason: impl Into<String>) -> ToolchestError {
    ToolchestError::Access {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Checks that `field` belongs to the object's chain and opens access when
/// language rules would refuse it. The returned guard must outlive the slot
/// access.
fn force_access<'f>(object: &Object, field: &'f FieldDescriptor, writing: bool) -> Result<Option<AccessGuard<'f>>> {
    let declaring = object.class().declarer_of(field).ok_or_else(|| {
        access_error(field, format!("{} is not declared on {} or its ancestors", field.name(), object.class().name()))
    })?;
    let needs_override = !field.is_public() || (writing && field.is_final());
    if !needs_override || field.is_accessible() {
        return Ok(None);
    }
    if declaring.is_restricted() {
        return Err(access_error(field, format!("{} does not open its fields", declaring.name())));
    }
    trace!(field = field.qualified_name(), writing, "forcing access");
    Ok(Some(field.open_access()))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Reflector;

impl Reflector {
    pub fn new() -> Self {
        Self
    }
}

impl FieldResolver for Reflector {
    fn field_by_name<'a>(&self, ty: Option<&'a TypeDescriptor>, name: &str) -> Option<&'a FieldDescriptor> {
        let found = search(ty, |f| f.name() == name);
        trace!(ty = ty.map(TypeDescriptor::name), name, found = found.is_some(), "field lookup by name");
        found
    }

    fn field_by_type<'a>(&self, ty: Option<&'a TypeDescriptor>, field_type: &FieldType) -> Option<&'a FieldDescriptor> {
        let found = search(ty, |f| f.field_type() == field_type);
        trace!(ty = ty.map(TypeDescriptor::name), %field_type, found = found.is_some(), "field lookup by type");
        found
    }

    fn field_annotated_with<'a>(&self, ty: Option<&'a TypeDescriptor>, marker: &str) -> Option<&'a FieldDescriptor> {
        let found = search(ty, |f| f.has_annotation(marker));
        trace!(ty = ty.map(TypeDescriptor::name), marker, found = found.is_some(), "field lookup by annotation");
        found
    }

    fn get_value(&self, instance: Option<&ObjectRef>, field: &FieldDescriptor) -> Result<Value> {
        let instance = instance.ok_or_else(|| {
            ToolchestError::NullTarget(format!("cannot read field {} of a null instance", field.qualified_name()))
        })?;
        let object = instance.read()?;
        let _guard = force_access(&object, field, false)?;
        object
            .slot(field)
            .cloned()
            .ok_or_else(|| access_error(field, "instance carries no slot for the field"))
    }

    fn set_value(&self, instance: Option<&ObjectRef>, field: Option<&FieldDescriptor>, value: Value) -> Result<()> {
        let Some(field) = field else {
            trace!("no field resolved, nothing to set");
            return Ok(());
        };
        let instance = instance.ok_or_else(|| {
            ToolchestError::NullTarget(format!("cannot write field {} of a null instance", field.qualified_name()))
        })?;
        // coerce before locking, checking an object value may need to read it
        let value = field.field_type().coerce(value)?.map_err(|rejected| ToolchestError::TypeMismatch {
            field: field.name().to_owned(),
            value: rejected.to_string(),
        })?;
        let mut object = instance.write()?;
        let _guard = force_access(&object, field, true)?;
        if !object.put(field, value) {
            return Err(access_error(field, "instance carries no slot for the field"));
        }
        debug!(field = field.qualified_name(), "field written");
        Ok(())
    }
}

impl AnnotationResolver for Reflector {
    fn method_or_class_level_annotation<'a>(
        &self,
        marker: &str,
        method: &'a MethodDescriptor,
        declaring_type: &'a TypeDescriptor,
    ) -> Option<&'a Annotation> {
        method.annotation(marker).or_else(|| self.class_level_annotation(marker, declaring_type))
    }

    fn class_level_annotation<'a>(&self, marker: &str, ty: &'a TypeDescriptor) -> Option<&'a Annotation> {
        let found = ty.ancestors().find_map(|t| t.annotation(marker));
        trace!(ty = ty.name(), marker, found = found.is_some(), "class level annotation lookup");
        found
    }
}
