//! Purpose: Command plugin contract, module naming, and dispatch.
//! Exports: `Command`, `Context`, `Module`, `Entry`, loaders, `Dispatcher`.
//! Role: Narrow boundary between the console and command code, linked or loaded.
//! Invariants: Command names match `[a-z-]+`; nothing else reaches a loader.
//! Invariants: Module paths are derived only from validated names.
//! Invariants: Every command is reached through the single `ENTRY_SYMBOL`.
use std::io::{BufRead, Write};
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::core::registry::Registry;

mod dispatch;
mod loader;

pub use dispatch::{COMMANDS, Dispatcher, invoke};
pub use loader::{BuiltinLoader, ChainLoader, LibraryLoader, ModuleLoader};

/// Symbol every command module must export.
pub const ENTRY_SYMBOL: &str = "cmd_main";

/// C ABI of `cmd_main` in dynamically loaded modules.
pub type CmdMainFn = unsafe extern "C" fn(param: *const c_char);

/// Everything a command may touch while it runs.
pub struct Context<'a> {
    pub registry: &'a mut Registry,
    pub input: &'a mut dyn BufRead,
    pub output: &'a mut dyn Write,
    pub errors: &'a mut dyn Write,
    /// Longest line a command may read from `input`.
    pub max_line: usize,
}

/// A command takes one string parameter and performs an action.
///
/// Commands have no error channel: failures are written to `ctx.errors`.
pub trait Command {
    fn name(&self) -> &str;

    fn summary(&self) -> &str {
        ""
    }

    fn run(&self, param: &str, ctx: &mut Context<'_>);
}

/// A resolved entry point.
#[derive(Clone)]
pub enum Entry {
    Builtin(Rc<dyn Command>),
    Foreign(CmdMainFn),
}

/// A loaded code module. Dropping the last handle unloads it.
pub trait Module {
    fn path(&self) -> &Path;

    fn resolve(&self, symbol: &str) -> Option<Entry>;
}

pub fn is_valid_command_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_lowercase() || b == b'-')
}

/// `libcmd_<name>.so`, with hyphens turned into underscores.
pub fn module_file_name(name: &str) -> String {
    format!("libcmd_{}.so", name.replace('-', "_"))
}

pub fn module_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(module_file_name(name))
}
