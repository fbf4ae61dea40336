//! Purpose: Tagged values stored in registry slots.
//! Exports: `Value`, `Slot`.
//! Role: Closed set of things the console keeps in its stores.
//! Invariants: Every variant releases its own resources on drop.
//! Invariants: The registry never inspects values beyond `describe`.
use std::fmt;
use std::rc::Rc;

use crate::core::credentials::Credential;
use crate::core::registry::Store;
use crate::plugin::Module;

/// Contents of one entry. `None` is an entry that exists but was never filled.
pub type Slot = Option<Value>;

pub enum Value {
    Text(String),
    Credential(Rc<Credential>),
    Module(Rc<dyn Module>),
    Store(Store),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_credential(&self) -> Option<&Rc<Credential>> {
        match self {
            Value::Credential(credential) => Some(credential),
            _ => None,
        }
    }

    pub fn as_module(&self) -> Option<&Rc<dyn Module>> {
        match self {
            Value::Module(module) => Some(module),
            _ => None,
        }
    }

    pub fn as_store(&self) -> Option<&Store> {
        match self {
            Value::Store(store) => Some(store),
            _ => None,
        }
    }

    pub fn as_store_mut(&mut self) -> Option<&mut Store> {
        match self {
            Value::Store(store) => Some(store),
            _ => None,
        }
    }

    /// Short human-readable tag used by store dumps and logs.
    pub fn describe(&self) -> String {
        match self {
            Value::Text(text) => format!("text {text:?}"),
            Value::Credential(credential) => format!("credential {}", credential.username()),
            Value::Module(module) => format!("module {}", module.path().display()),
            Value::Store(store) => format!("store ({} entries)", store.len()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
