//! Purpose: Per-session variables kept in the `env` store.
//! Exports: `get`, `set`, `current_user`, `prompt`.
//! Role: Holds `USER` and `PS1` for the active session; flushed at logout.
use crate::core::config::set_text;
use crate::core::error::Error;
use crate::core::registry::Registry;
use crate::core::value::Value;

pub const STORE: &str = "env";

pub const USER: &str = "USER";
pub const PS1: &str = "PS1";

pub const DEFAULT_PROMPT: &str = "> ";

pub fn set(registry: &mut Registry, key: &str, value: &str) -> Result<(), Error> {
    set_text(registry, STORE, key, value)
}

pub fn get<'a>(registry: &'a mut Registry, key: &str) -> Option<&'a str> {
    registry.get(STORE, key).and_then(Value::as_text)
}

pub fn current_user(registry: &mut Registry) -> Option<&str> {
    get(registry, USER)
}

/// The prompt to print, falling back to the default when `PS1` is unset.
pub fn prompt(registry: &mut Registry) -> &str {
    get(registry, PS1).unwrap_or(DEFAULT_PROMPT)
}
