use std::io::Write;

use crate::plugin::{Command, Context};

pub struct Echo;

impl Command for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn summary(&self) -> &str {
        "print the parameter"
    }

    fn run(&self, param: &str, ctx: &mut Context<'_>) {
        let _ = writeln!(ctx.output, "{param}");
    }
}
