// Lists a directory by running `ls -al` directly, without a shell.
use std::io::Write;
use std::path::PathBuf;
use std::process;

use tracing::debug;

use crate::plugin::{Command, Context};

pub struct Ls {
    program: PathBuf,
}

impl Ls {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Ls {
    fn default() -> Self {
        Self::new("/bin/ls")
    }
}

impl Command for Ls {
    fn name(&self) -> &str {
        "ls"
    }

    fn summary(&self) -> &str {
        "list a directory"
    }

    fn run(&self, param: &str, ctx: &mut Context<'_>) {
        let mut command = process::Command::new(&self.program);
        // `--` keeps the parameter from being read as an option.
        command.args(["-al", "--"]);
        if !param.is_empty() {
            command.arg(param);
        }
        debug!(program = %self.program.display(), param = %param, "spawning");

        match command.output() {
            Ok(output) => {
                let _ = ctx.output.write_all(&output.stdout);
                let _ = ctx.errors.write_all(&output.stderr);
            }
            Err(err) => {
                let _ = writeln!(ctx.errors, "{}: {err}", self.program.display());
            }
        }
    }
}
