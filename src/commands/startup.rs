// Shows the startup script, or replaces it with lines read from the transcript.
use std::io::Write;

use tracing::debug;

use crate::core::config;
use crate::input::{ReadLine, is_exit_command, read_bounded_line};
use crate::plugin::{Command, Context};

/// Largest script `startup set` will store.
pub const MAX_SCRIPT_LEN: usize = 4095;

pub struct Startup;

impl Command for Startup {
    fn name(&self) -> &str {
        "startup"
    }

    fn summary(&self) -> &str {
        "show the startup script, or `startup set` to replace it"
    }

    fn run(&self, param: &str, ctx: &mut Context<'_>) {
        if param == "set" {
            set_script(ctx);
            return;
        }
        if let Some(script) = config::get(ctx.registry, config::STARTUP) {
            let _ = write!(ctx.output, "{script}");
        }
    }
}

fn set_script(ctx: &mut Context<'_>) {
    let _ = writeln!(ctx.output, "reading commands");
    let _ = ctx.output.flush();

    let mut script = String::new();
    loop {
        let line = match read_bounded_line(&mut *ctx.input, ctx.max_line) {
            Ok(ReadLine::Line(line)) => line,
            Ok(ReadLine::TooLong) => {
                let _ = writeln!(ctx.errors, "input too long");
                continue;
            }
            Ok(ReadLine::Eof) => break,
            Err(err) => {
                let _ = writeln!(ctx.errors, "startup: {err}");
                break;
            }
        };
        if script.len() + line.len() + 1 > MAX_SCRIPT_LEN {
            break;
        }
        script.push_str(&line);
        script.push('\n');
        if is_exit_command(&line) {
            break;
        }
    }

    debug!(bytes = script.len(), "replacing startup script");
    if let Err(err) = config::set(ctx.registry, config::STARTUP, &script) {
        let _ = writeln!(ctx.errors, "startup: {err}");
    }
}
