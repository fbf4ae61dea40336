// Test harness for running one command against an in-memory transcript.
use std::io::Cursor;

use crate::core::registry::Registry;
use crate::plugin::{Command, Context};

pub(crate) struct Run {
    pub output: String,
    pub errors: String,
}

pub(crate) fn run_command(command: &dyn Command, param: &str) -> Run {
    let mut registry = Registry::new();
    run_command_with(command, param, &mut registry, "")
}

pub(crate) fn run_command_with(
    command: &dyn Command,
    param: &str,
    registry: &mut Registry,
    input: &str,
) -> Run {
    let mut input = Cursor::new(input.as_bytes().to_vec());
    let mut output = Vec::new();
    let mut errors = Vec::new();
    {
        let mut ctx = Context {
            registry,
            input: &mut input,
            output: &mut output,
            errors: &mut errors,
            max_line: 4096,
        };
        command.run(param, &mut ctx);
    }
    Run {
        output: String::from_utf8_lossy(&output).into_owned(),
        errors: String::from_utf8_lossy(&errors).into_owned(),
    }
}
