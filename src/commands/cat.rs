// Copies a file to the transcript. Any readable path is accepted.
use std::fs::File;
use std::io::{self, Write};

use crate::plugin::{Command, Context};

pub struct Cat;

impl Command for Cat {
    fn name(&self) -> &str {
        "cat"
    }

    fn summary(&self) -> &str {
        "print a file"
    }

    fn run(&self, param: &str, ctx: &mut Context<'_>) {
        let mut file = match File::open(param) {
            Ok(file) => file,
            Err(err) => {
                let _ = writeln!(ctx.errors, "failed to open file: {err}");
                return;
            }
        };
        if let Err(err) = io::copy(&mut file, &mut *ctx.output) {
            let _ = writeln!(ctx.errors, "read: {err}");
        }
    }
}
