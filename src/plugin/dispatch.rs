// Per-name module cache in the `cmd` store and entry-point invocation.
use std::ffi::CString;
use std::path::PathBuf;
use std::rc::Rc;

use tracing::{debug, info};

use super::{Context, ENTRY_SYMBOL, Entry, Module, ModuleLoader, is_valid_command_name, module_path};
use crate::core::error::{Error, ErrorKind};
use crate::core::registry::Registry;
use crate::core::value::{Slot, Value};

/// Store holding one entry per command name that has been looked up.
pub const COMMANDS: &str = "cmd";

fn unload_module(slot: Slot) {
    if let Some(Value::Module(module)) = &slot {
        debug!(path = %module.path().display(), "releasing command module");
    }
    drop(slot);
}

/// Loads command modules on first use and caches them by name.
pub struct Dispatcher {
    loader: Box<dyn ModuleLoader>,
    module_dir: PathBuf,
}

impl Dispatcher {
    pub fn new(loader: Box<dyn ModuleLoader>, module_dir: impl Into<PathBuf>) -> Self {
        Self {
            loader,
            module_dir: module_dir.into(),
        }
    }

    /// Returns the module for `name`, loading it if no handle is cached.
    ///
    /// A failed load leaves an empty entry behind, so the next call tries again.
    pub fn load(&self, registry: &mut Registry, name: &str) -> Result<Rc<dyn Module>, Error> {
        if !is_valid_command_name(name) {
            return Err(Error::new(ErrorKind::Validation)
                .with_message(format!("bad command {name}")));
        }

        let slot = registry.reference(COMMANDS, name, Some(Box::new(unload_module)))?;
        if let Some(Value::Module(module)) = slot {
            return Ok(Rc::clone(module));
        }

        let path = module_path(&self.module_dir, name);
        match self.loader.load(&path) {
            Ok(module) => {
                info!(command = %name, path = %path.display(), "loaded command module");
                *slot = Some(Value::Module(Rc::clone(&module)));
                Ok(module)
            }
            Err(err) => {
                debug!(command = %name, error = %err, "command module failed to load");
                Err(err)
            }
        }
    }

    /// Unloads every cached module.
    pub fn unload_all(&self, registry: &mut Registry) {
        if registry.flush(COMMANDS).is_err() {
            debug!("no command modules to unload");
        }
    }
}

/// Resolves `ENTRY_SYMBOL` in `module` and runs it with `param`.
///
/// A module without the entry point stays cached; only the call fails.
pub fn invoke(
    name: &str,
    module: &Rc<dyn Module>,
    param: &str,
    ctx: &mut Context<'_>,
) -> Result<(), Error> {
    let entry = module.resolve(ENTRY_SYMBOL).ok_or_else(|| {
        Error::new(ErrorKind::Dispatch)
            .with_message(format!("internal error in command {name}"))
            .with_path(module.path())
    })?;

    match entry {
        Entry::Builtin(command) => {
            command.run(param, ctx);
            Ok(())
        }
        Entry::Foreign(main) => {
            let param = CString::new(param).map_err(|err| {
                Error::new(ErrorKind::Validation)
                    .with_message("parameter contains a NUL byte")
                    .with_source(err)
            })?;
            ctx.output.flush().map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to flush output")
                    .with_source(err)
            })?;
            // SAFETY: `module` keeps the library mapped for the duration of the call.
            unsafe { main(param.as_ptr()) };
            // Modules print through C stdio, which is fully buffered on a pipe.
            // SAFETY: a null stream flushes every open output stream.
            unsafe { libc::fflush(std::ptr::null_mut()) };
            Ok(())
        }
    }
}
