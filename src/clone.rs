//! Deep copies.
//!
//! [`deep_copy`] runs a value graph through an encode/decode round trip: the
//! graph is flattened into a [`Snapshot`] token stream, then rebuilt into
//! fresh objects. An object reached twice is written once and referenced
//! afterwards, so shared references and cycles survive the copy.
//!
//! Every class descriptor written to the stream is also queued on the side.
//! Decoding pops that queue for each descriptor it reads and refuses to go on
//! when the two disagree.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Result, ToolchestError};
use crate::metadata::TypeDescriptor;
use crate::value::{Object, ObjectRef, Value};

#[derive(Debug, Clone)]
enum Token {
    Null,
    Scalar(Value),
    List(usize),
    // first appearance of a class in the stream, `id` tells apart types sharing a name
    ClassDesc { name: String, id: usize },
    NewObject { class: usize, handle: usize, slots: usize },
    Reference(usize),
}

fn class_id(class: &Arc<TypeDescriptor>) -> usize {
    Arc::as_ptr(class) as usize
}

/// An encoded value graph, see the module docs.
#[derive(Debug)]
pub struct Snapshot {
    tokens: Vec<Token>,
    classes: VecDeque<Arc<TypeDescriptor>>,
}

impl Snapshot {
    pub fn capture(value: &Value) -> Result<Snapshot> {
        let mut encoder = Encoder::default();
        encoder.write(value)?;
        debug!(tokens = encoder.tokens.len(), classes = encoder.queue.len(), "snapshot captured");
        Ok(Snapshot {
            tokens: encoder.tokens,
            classes: encoder.queue,
        })
    }

    pub fn restore(self) -> Result<Value> {
        let mut decoder = Decoder {
            tokens: self.tokens.into_iter(),
            queue: self.classes,
            classes: Vec::new(),
            objects: Vec::new(),
        };
        let value = decoder.read()?;
        if decoder.tokens.next().is_some() {
            return Err(ToolchestError::InvalidArgument(String::from("trailing tokens after the root value")));
        }
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

// ------------- Encoding -------------
// Both directions walk the graph with an explicit stack, so the depth of a
// value graph is bounded by memory and not by the thread's stack.

#[derive(Default)]
struct Encoder {
    tokens: Vec<Token>,
    queue: VecDeque<Arc<TypeDescriptor>>,
    class_indexes: HashMap<usize, usize>,
    handles: HashMap<usize, usize>,
}

impl Encoder {
    fn write(&mut self, root: &Value) -> Result<()> {
        let mut pending = vec![root.clone()];
        while let Some(value) = pending.pop() {
            match value {
                Value::Null => self.tokens.push(Token::Null),
                Value::List(items) => {
                    self.tokens.push(Token::List(items.len()));
                    pending.extend(items.into_iter().rev());
                }
                Value::Object(object) => {
                    let slots = self.write_object(&object)?;
                    pending.extend(slots.into_iter().rev());
                }
                scalar => self.tokens.push(Token::Scalar(scalar)),
            }
        }
        Ok(())
    }

    // Writes the object header and returns the slots still to be written,
    // nothing when the object was already in the stream.
    fn write_object(&mut self, object: &ObjectRef) -> Result<Vec<Value>> {
        let id = Arc::as_ptr(object) as *const () as usize;
        if let Some(handle) = self.handles.get(&id) {
            self.tokens.push(Token::Reference(*handle));
            return Ok(Vec::new());
        }
        let handle = self.handles.len();
        self.handles.insert(id, handle);

        // copy the slots out so no lock is held while children are written
        let (class, slots) = {
            let guard = object.read()?;
            let class = Arc::clone(guard.class());
            let slots: Vec<Value> = class
                .instance_fields()
                .map(|f| guard.slot(f).cloned().unwrap_or(Value::Null))
                .collect();
            (class, slots)
        };
        let class_index = self.annotate_class(&class);
        self.tokens.push(Token::NewObject {
            class: class_index,
            handle,
            slots: slots.len(),
        });
        Ok(slots)
    }

    fn annotate_class(&mut self, class: &Arc<TypeDescriptor>) -> usize {
        let id = class_id(class);
        if let Some(index) = self.class_indexes.get(&id) {
            return *index;
        }
        let index = self.class_indexes.len();
        self.class_indexes.insert(id, index);
        self.tokens.push(Token::ClassDesc {
            name: class.name().to_owned(),
            id,
        });
        self.queue.push_back(Arc::clone(class));
        index
    }
}

// ------------- Decoding -------------

// A container whose elements are still being read.
enum Frame {
    List { items: Vec<Value>, len: usize },
    Object { object: ObjectRef, values: Vec<Value>, slots: usize },
}

impl Frame {
    fn push(&mut self, value: Value) {
        match self {
            Frame::List { items, .. } => items.push(value),
            Frame::Object { values, .. } => values.push(value),
        }
    }

    fn is_complete(&self) -> bool {
        match self {
            Frame::List { items, len } => items.len() == *len,
            Frame::Object { values, slots, .. } => values.len() == *slots,
        }
    }

    fn finish(self) -> Result<Value> {
        match self {
            Frame::List { items, .. } => Ok(Value::List(items)),
            Frame::Object { object, values, .. } => {
                {
                    let mut guard = object.write()?;
                    let class = Arc::clone(guard.class());
                    for (field, value) in class.instance_fields().zip(values) {
                        guard.put(field, value);
                    }
                }
                Ok(Value::Object(object))
            }
        }
    }
}

fn pop_complete(frames: &mut Vec<Frame>) -> Option<Frame> {
    if frames.last().is_some_and(Frame::is_complete) { frames.pop() } else { None }
}

struct Decoder {
    tokens: std::vec::IntoIter<Token>,
    queue: VecDeque<Arc<TypeDescriptor>>,
    classes: Vec<Arc<TypeDescriptor>>,
    objects: Vec<ObjectRef>,
}

impl Decoder {
    fn next(&mut self) -> Result<Token> {
        self.tokens
            .next()
            .ok_or_else(|| ToolchestError::InvalidArgument(String::from("unexpected end of snapshot")))
    }

    fn read(&mut self) -> Result<Value> {
        let mut frames: Vec<Frame> = Vec::new();
        loop {
            let mut value = match self.next()? {
                Token::Null => Value::Null,
                Token::Scalar(value) => value,
                Token::ClassDesc { name, id } => {
                    self.resolve_class(&name, id)?;
                    continue;
                }
                Token::Reference(handle) => self
                    .objects
                    .get(handle)
                    .map(|o| Value::Object(Arc::clone(o)))
                    .ok_or_else(|| ToolchestError::InvalidArgument(format!("dangling object reference {}", handle)))?,
                Token::List(len) => {
                    frames.push(Frame::List {
                        items: Vec::with_capacity(len),
                        len,
                    });
                    match pop_complete(&mut frames) {
                        Some(frame) => frame.finish()?,
                        None => continue,
                    }
                }
                Token::NewObject { class, handle, slots } => {
                    frames.push(self.open_object(class, handle, slots)?);
                    match pop_complete(&mut frames) {
                        Some(frame) => frame.finish()?,
                        None => continue,
                    }
                }
            };
            // hand the value to its container, closing every container it completes
            loop {
                match frames.last_mut() {
                    Some(parent) => parent.push(value),
                    None => return Ok(value),
                }
                match pop_complete(&mut frames) {
                    Some(frame) => value = frame.finish()?,
                    None => break,
                }
            }
        }
    }

    fn resolve_class(&mut self, expected: &str, id: usize) -> Result<()> {
        let queued = self.queue.pop_front();
        let found = queued.as_ref().map(|c| c.name());
        match queued {
            Some(class) if found == Some(expected) && class_id(&class) == id => {
                self.classes.push(class);
                Ok(())
            }
            _ => Err(ToolchestError::InvalidClass(format!(
                "Classes desynchronized: found {} when expecting {}",
                found.unwrap_or("null"),
                expected
            ))),
        }
    }

    fn open_object(&mut self, class: usize, handle: usize, slots: usize) -> Result<Frame> {
        let class = self
            .classes
            .get(class)
            .cloned()
            .ok_or_else(|| ToolchestError::InvalidClass(format!("no class descriptor {} in the stream", class)))?;
        if handle != self.objects.len() {
            return Err(ToolchestError::InvalidArgument(format!("object handle {} out of sequence", handle)));
        }
        let fields = class.instance_fields().count();
        if fields != slots {
            return Err(ToolchestError::InvalidClass(format!(
                "{} has {} fields but the stream carries {}",
                class.name(),
                fields,
                slots
            )));
        }
        // registered before its slots so that cycles can refer back to it
        let object = Object::new_ref(&class);
        self.objects.push(Arc::clone(&object));
        Ok(Frame::Object {
            object,
            values: Vec::with_capacity(slots),
            slots,
        })
    }
}

/// Fully independent copy of `value`; see the module docs.
pub fn deep_copy(value: &Value) -> Result<Value> {
    Snapshot::capture(value)?.restore()
}

/// Deep copy of plain Rust data through a `serde_json` round trip.
pub fn deep_clone<T: Serialize + DeserializeOwned>(value: &T) -> Result<T> {
    let encoded = serde_json::to_value(value)?;
    Ok(serde_json::from_value(encoded)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{FieldDescriptor, FieldType};

    fn person() -> Arc<TypeDescriptor> {
        TypeDescriptor::builder("Person")
            .field(FieldDescriptor::new("name", FieldType::String))
            .build()
    }

    #[test]
    fn desynchronized_classes_are_refused() {
        let pet = TypeDescriptor::builder("Pet").build();
        let mut snapshot = Snapshot::capture(&Value::Object(Object::new_ref(&person()))).unwrap();
        snapshot.classes = VecDeque::from(vec![pet]);
        let err = snapshot.restore().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid class: Classes desynchronized: found Pet when expecting Person"
        );
    }

    #[test]
    fn missing_class_in_queue_is_refused() {
        let mut snapshot = Snapshot::capture(&Value::Object(Object::new_ref(&person()))).unwrap();
        snapshot.classes.clear();
        let err = snapshot.restore().unwrap_err();
        assert!(err.to_string().contains("found null when expecting Person"));
    }

    #[test]
    fn same_name_from_another_type_is_refused() {
        let impostor = person();
        let mut snapshot = Snapshot::capture(&Value::Object(Object::new_ref(&person()))).unwrap();
        snapshot.classes = VecDeque::from(vec![impostor]);
        let err = snapshot.restore().unwrap_err();
        assert!(matches!(err, ToolchestError::InvalidClass(_)));
    }

    #[test]
    fn each_class_is_annotated_once() {
        let class = person();
        let list = Value::List(vec![
            Value::Object(Object::new_ref(&class)),
            Value::Object(Object::new_ref(&class)),
        ]);
        let snapshot = Snapshot::capture(&list).unwrap();
        assert_eq!(snapshot.classes.len(), 1);

        // a distinct type under the same name gets its own entry
        let other = person();
        let mixed = Value::List(vec![
            Value::Object(Object::new_ref(&class)),
            Value::Object(Object::new_ref(&other)),
        ]);
        assert_eq!(Snapshot::capture(&mixed).unwrap().classes.len(), 2);
    }
}
