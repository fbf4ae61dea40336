//! Purpose: Library crate behind the `dbgcon` debug console binary and tests.
//! Exports: `core` (registry, facades, errors), `plugin`, `commands`, `console`, `input`.
//! Role: All console state lives in an explicit `Registry` passed by the caller.
//! Invariants: Single-threaded; nothing here is `Send`.
//! Invariants: Store entries are destroyed exactly once, through their destructor if any.
pub mod commands;
pub mod console;
pub mod core;
pub mod input;
pub mod plugin;
