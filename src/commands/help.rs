use std::io::Write;

use crate::plugin::{Command, Context};

/// Lists the built-in commands. The listing is fixed when the table is built.
pub struct Help {
    entries: Vec<(String, String)>,
}

impl Help {
    pub fn new<'a>(commands: impl IntoIterator<Item = &'a dyn Command>) -> Self {
        let mut entries: Vec<(String, String)> = commands
            .into_iter()
            .map(|command| (command.name().to_string(), command.summary().to_string()))
            .collect();
        entries.push(("help".to_string(), "list commands".to_string()));
        entries.push(("exit".to_string(), "end the session (also `quit`)".to_string()));
        entries.sort();
        Self { entries }
    }
}

impl Command for Help {
    fn name(&self) -> &str {
        "help"
    }

    fn summary(&self) -> &str {
        "list commands"
    }

    fn run(&self, _param: &str, ctx: &mut Context<'_>) {
        let width = self
            .entries
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0);
        let _ = writeln!(ctx.output, "commands:");
        for (name, summary) in &self.entries {
            let _ = writeln!(ctx.output, "  {name:<width$}  {summary}");
        }
    }
}
