//! Purpose: Commands compiled into the console.
//! Exports: `builtin_loader` plus one type per command.
//! Role: Default module table served by `BuiltinLoader`.
//! Invariants: Commands report their own failures and never return errors.
//! Invariants: Command names are valid module names (`[a-z-]+`).
use std::rc::Rc;

use crate::plugin::{BuiltinLoader, Command};

pub mod cat;
pub mod echo;
pub mod help;
pub mod kv_dump;
pub mod ls;
pub mod prompt;
pub mod startup;
pub mod user;

#[cfg(test)]
pub(crate) mod testing;

/// Loader serving every built-in command, `help` included.
pub fn builtin_loader() -> BuiltinLoader {
    let mut loader = BuiltinLoader::new()
        .with_command(Rc::new(cat::Cat))
        .with_command(Rc::new(echo::Echo))
        .with_command(Rc::new(kv_dump::KvDump))
        .with_command(Rc::new(ls::Ls::default()))
        .with_command(Rc::new(prompt::Prompt))
        .with_command(Rc::new(startup::Startup))
        .with_command(Rc::new(user::User));
    let help = help::Help::new(loader.commands().iter().map(|command| &**command));
    loader.register(Rc::new(help));
    loader
}

#[cfg(test)]
mod tests {
    use super::builtin_loader;
    use crate::plugin::{ModuleLoader, is_valid_command_name, module_path};
    use std::path::Path;

    #[test]
    fn every_builtin_has_a_valid_name_and_loads() {
        let loader = builtin_loader();
        assert_eq!(loader.commands().len(), 8);
        for command in loader.commands() {
            assert!(is_valid_command_name(command.name()), "{}", command.name());
            let path = module_path(Path::new("."), command.name());
            assert!(loader.load(&path).is_ok(), "{}", command.name());
        }
    }
}
