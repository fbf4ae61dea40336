// Shows or sets `PS1`, expanding `\u`, `\h`, and `\w` when setting.
use std::io::Write;

use crate::core::{config, env};
use crate::plugin::{Command, Context};

pub struct Prompt;

impl Command for Prompt {
    fn name(&self) -> &str {
        "prompt"
    }

    fn summary(&self) -> &str {
        "show or set the prompt (\\u user, \\h host, \\w directory)"
    }

    fn run(&self, param: &str, ctx: &mut Context<'_>) {
        if param.is_empty() {
            let current = env::get(ctx.registry, env::PS1).unwrap_or("(no prompt set)");
            let _ = writeln!(ctx.output, "{current}");
            return;
        }

        let user = env::current_user(ctx.registry).unwrap_or_default().to_string();
        let host = config::get(ctx.registry, config::HOSTNAME)
            .unwrap_or(config::DEFAULT_HOSTNAME)
            .to_string();
        let cwd = if param.contains("\\w") {
            std::env::current_dir()
                .map(|dir| dir.display().to_string())
                .unwrap_or_default()
        } else {
            String::new()
        };

        let expanded = expand_prompt(param, &user, &host, &cwd);
        if let Err(err) = env::set(ctx.registry, env::PS1, &expanded) {
            let _ = writeln!(ctx.errors, "prompt: {err}");
        }
    }
}

pub fn expand_prompt(format: &str, user: &str, host: &str, cwd: &str) -> String {
    let mut expanded = String::with_capacity(format.len());
    let mut chars = format.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            expanded.push(ch);
            continue;
        }
        match chars.next() {
            Some('u') => expanded.push_str(user),
            Some('h') => expanded.push_str(host),
            Some('w') => expanded.push_str(cwd),
            Some(other) => expanded.push(other),
            None => {}
        }
    }
    expanded
}
