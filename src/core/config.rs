//! Purpose: String settings kept in the `cfg` store.
//! Exports: `get`, `set`, well-known key names.
//! Role: Holds the login banner, startup script, and host label seeded at boot.
//! Invariants: Values live in memory only; nothing is read from or written to disk.
use crate::core::error::Error;
use crate::core::registry::Registry;
use crate::core::value::Value;

pub const STORE: &str = "cfg";

pub const LOGIN_MSG: &str = "login_msg";
pub const STARTUP: &str = "startup";
pub const HOSTNAME: &str = "hostname";

pub const DEFAULT_HOSTNAME: &str = "dbgcon";

pub fn set(registry: &mut Registry, key: &str, value: &str) -> Result<(), Error> {
    set_text(registry, STORE, key, value)
}

pub fn get<'a>(registry: &'a mut Registry, key: &str) -> Option<&'a str> {
    registry.get(STORE, key).and_then(Value::as_text)
}

/// Stores `value` as text under `store`/`key`, replacing any previous value.
pub(crate) fn set_text(
    registry: &mut Registry,
    store: &str,
    key: &str,
    value: &str,
) -> Result<(), Error> {
    let mut owned = String::new();
    owned.try_reserve_exact(value.len())?;
    owned.push_str(value);
    let slot = registry.reference(store, key, None)?;
    *slot = Some(Value::Text(owned));
    Ok(())
}
