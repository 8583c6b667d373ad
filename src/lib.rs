//! Toolchest – reflection helpers over a runtime type model, plus small date,
//! number and deep-copy utilities.
//!
//! The reflective core works on explicit metadata rather than compiler
//! introspection:
//! * A [`metadata::TypeDescriptor`] names a type, links to its superclass and
//!   owns its [`metadata::FieldDescriptor`]s, [`metadata::MethodDescriptor`]s
//!   and class-level [`metadata::Annotation`]s. Every chain ends in the root
//!   type [`metadata::ROOT_TYPE`].
//! * A [`value::Object`] is an instance of a type, holding one
//!   [`value::Value`] per field declared anywhere in its chain.
//! * The [`reflect::FieldResolver`] and [`reflect::AnnotationResolver`] traits
//!   locate fields by name, type or annotation, read and write them (forcing
//!   access to private and final fields for the duration of a call), and
//!   resolve annotations with method-over-class precedence.
//!
//! ## Modules
//! * [`metadata`] – Type, field and method descriptors with their builder.
//! * [`value`] – The dynamic value model and object instances.
//! * [`reflect`] – Resolver traits and the default [`reflect::Reflector`].
//! * [`clone`] – Deep copies of value graphs, cycles included.
//! * [`date`] – Pattern based date parsing, formatting and comparison.
//! * [`number`] – Grouped number formatting and lenient number parsing.
//! * [`config`] – Formatter [`config::Settings`] from files and environment.
//! * [`error`] – The crate error type.
//!
//! ## Quick Start
//! ```
//! use toolchest::metadata::{Annotation, FieldDescriptor, FieldType, Modifiers, TypeDescriptor};
//! use toolchest::reflect::{FieldResolver, Reflector};
//! use toolchest::value::{Object, Value};
//!
//! let base = TypeDescriptor::builder("Base")
//!     .field(FieldDescriptor::new("id", FieldType::Long).with_modifiers(Modifiers::private().with_final()))
//!     .build();
//! let derived = TypeDescriptor::builder("Derived")
//!     .extends(&base)
//!     .field(FieldDescriptor::new("label", FieldType::String).annotate(Annotation::new("Label")))
//!     .build();
//! let instance = Object::new_ref(&derived);
//!
//! let reflector = Reflector::new();
//! reflector.set_value_by_name(Some(&instance), "id", 42_i64).unwrap();
//! assert_eq!(reflector.get_value_by_name(Some(&instance), "id").unwrap(), Some(Value::Long(42)));
//! assert!(reflector.field_annotated_with(Some(&derived), "Label").is_some());
//! ```
//!
//! ## Logging
//! Lookups, forced access and settings loading emit `tracing` events at
//! `trace`/`debug` level. The library never installs a subscriber.

pub mod clone;
pub mod config;
pub mod date;
pub mod error;
pub mod metadata;
pub mod number;
pub mod reflect;
pub mod value;

pub use error::{Result, ToolchestError};
