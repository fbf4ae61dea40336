// Module loaders: the statically linked command table and audited shared-library loading.
use std::path::{Path, PathBuf};
use std::rc::Rc;

use libloading::{Library, Symbol};
use tracing::{debug, trace};

use super::{CmdMainFn, Command, ENTRY_SYMBOL, Entry, Module, module_file_name};
use crate::core::error::{Error, ErrorKind};

/// Turns a module path into a loaded module.
pub trait ModuleLoader {
    fn load(&self, path: &Path) -> Result<Rc<dyn Module>, Error>;
}

/// Serves commands compiled into the binary, matched by module file name.
#[derive(Default)]
pub struct BuiltinLoader {
    commands: Vec<Rc<dyn Command>>,
}

impl BuiltinLoader {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn with_command(mut self, command: Rc<dyn Command>) -> Self {
        self.register(command);
        self
    }

    /// Registers a command. Replaces any command with the same name.
    pub fn register(&mut self, command: Rc<dyn Command>) {
        self.commands.retain(|existing| existing.name() != command.name());
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[Rc<dyn Command>] {
        &self.commands
    }
}

struct BuiltinModule {
    path: PathBuf,
    command: Rc<dyn Command>,
}

impl Module for BuiltinModule {
    fn path(&self) -> &Path {
        &self.path
    }

    fn resolve(&self, symbol: &str) -> Option<Entry> {
        (symbol == ENTRY_SYMBOL).then(|| Entry::Builtin(Rc::clone(&self.command)))
    }
}

impl ModuleLoader for BuiltinLoader {
    fn load(&self, path: &Path) -> Result<Rc<dyn Module>, Error> {
        let file_name = path.file_name().and_then(|name| name.to_str());
        let command = self
            .commands
            .iter()
            .find(|command| Some(module_file_name(command.name()).as_str()) == file_name)
            .ok_or_else(|| {
                Error::new(ErrorKind::Load)
                    .with_message("no builtin command module")
                    .with_path(path)
            })?;
        trace!(path = %path.display(), command = %command.name(), "resolved builtin module");
        Ok(Rc::new(BuiltinModule {
            path: path.to_path_buf(),
            command: Rc::clone(command),
        }))
    }
}

/// Loads command modules from shared libraries.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibraryLoader;

struct LibraryModule {
    path: PathBuf,
    library: Library,
}

impl Module for LibraryModule {
    fn path(&self) -> &Path {
        &self.path
    }

    fn resolve(&self, symbol: &str) -> Option<Entry> {
        let mut name = Vec::with_capacity(symbol.len() + 1);
        name.extend_from_slice(symbol.as_bytes());
        name.push(0);
        // SAFETY: every command module exports its entry with the `CmdMainFn` signature.
        let func: Symbol<'_, CmdMainFn> = unsafe { self.library.get(&name) }.ok()?;
        Some(Entry::Foreign(*func))
    }
}

impl Drop for LibraryModule {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "unloading shared library");
    }
}

impl ModuleLoader for LibraryLoader {
    fn load(&self, path: &Path) -> Result<Rc<dyn Module>, Error> {
        // SAFETY: loading runs the library's initializers; paths only come from validated names.
        let library = unsafe { Library::new(path) }.map_err(|err| {
            Error::new(ErrorKind::Load)
                .with_message("failed to load command module")
                .with_path(path)
                .with_source(err)
        })?;
        debug!(path = %path.display(), "loaded shared library");
        Ok(Rc::new(LibraryModule {
            path: path.to_path_buf(),
            library,
        }))
    }
}

/// Tries each loader in order; the first success wins.
#[derive(Default)]
pub struct ChainLoader {
    loaders: Vec<Box<dyn ModuleLoader>>,
}

impl ChainLoader {
    pub fn new() -> Self {
        Self {
            loaders: Vec::new(),
        }
    }

    pub fn with(mut self, loader: impl ModuleLoader + 'static) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }
}

impl ModuleLoader for ChainLoader {
    fn load(&self, path: &Path) -> Result<Rc<dyn Module>, Error> {
        let mut last_err = None;
        for loader in &self.loaders {
            match loader.load(path) {
                Ok(module) => return Ok(module),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            Error::new(ErrorKind::Load)
                .with_message("no module loaders configured")
                .with_path(path)
        }))
    }
}
