// Account management: `user`, `user add`, `user set`, `user del`.
use std::io::Write;

use crate::core::credentials;
use crate::core::env;
use crate::core::registry::Registry;
use crate::plugin::{Command, Context};

const USAGE: &[&str] = &[
    "",
    "add <name> pw <pw> [<enable|disable>]",
    "set <name> [pw <pw>] [<enable|disable>]",
    "del <name>",
];

/// Malformed arguments; answered with the usage block.
struct UsageError;

pub struct User;

impl Command for User {
    fn name(&self) -> &str {
        "user"
    }

    fn summary(&self) -> &str {
        "show the current user or manage accounts"
    }

    fn run(&self, param: &str, ctx: &mut Context<'_>) {
        let mut tokens = param.split([' ', '\t']).filter(|token| !token.is_empty());
        let result = match tokens.next() {
            None => {
                if let Some(user) = env::current_user(ctx.registry) {
                    let _ = writeln!(ctx.output, "{user}");
                }
                Ok(())
            }
            Some("add") => add(&mut tokens, ctx),
            Some("set") => set(&mut tokens, ctx),
            Some("del") => del(&mut tokens, ctx),
            Some(_) => Err(UsageError),
        };
        if result.is_err() {
            print_usage(ctx);
        }
    }
}

fn print_usage(ctx: &mut Context<'_>) {
    let _ = writeln!(ctx.output, "usage:");
    for line in USAGE {
        let _ = writeln!(ctx.output, "  user {line}");
    }
}

fn parse_enable(token: &str) -> Result<bool, UsageError> {
    match token {
        "enable" => Ok(true),
        "disable" => Ok(false),
        _ => Err(UsageError),
    }
}

fn add<'t>(
    tokens: &mut impl Iterator<Item = &'t str>,
    ctx: &mut Context<'_>,
) -> Result<(), UsageError> {
    let name = tokens.next().ok_or(UsageError)?;
    if tokens.next() != Some("pw") {
        return Err(UsageError);
    }
    let password = tokens.next().ok_or(UsageError)?;
    let enable = tokens.next().map(parse_enable).transpose()?.unwrap_or(true);

    if credentials::add(ctx.registry, name, password).is_err() {
        let _ = writeln!(ctx.errors, "failed to add user {name}");
        return Ok(());
    }
    if enable && !enable_login(ctx.registry, name) {
        let _ = writeln!(ctx.errors, "failed to enable user {name}");
    }
    Ok(())
}

fn set<'t>(
    tokens: &mut impl Iterator<Item = &'t str>,
    ctx: &mut Context<'_>,
) -> Result<(), UsageError> {
    let name = tokens.next().ok_or(UsageError)?;
    let mut token = Some(tokens.next().ok_or(UsageError)?);
    let mut password = None;
    if token == Some("pw") {
        password = Some(tokens.next().ok_or(UsageError)?);
        token = tokens.next();
    }
    let enable = token.map(parse_enable).transpose()?;

    if let Some(password) = password {
        if credentials::set(ctx.registry, name, password).is_err() {
            let _ = writeln!(ctx.errors, "failed to update user {name}");
            return Ok(());
        }
    }
    match enable {
        Some(true) => {
            if !enable_login(ctx.registry, name) {
                let _ = writeln!(ctx.errors, "failed to enable user {name}");
            }
        }
        Some(false) => {
            let _ = credentials::disable_login(ctx.registry, name);
        }
        None => {}
    }
    Ok(())
}

fn del<'t>(
    tokens: &mut impl Iterator<Item = &'t str>,
    ctx: &mut Context<'_>,
) -> Result<(), UsageError> {
    let name = tokens.next().ok_or(UsageError)?;
    if credentials::get(ctx.registry, name).is_none() {
        let _ = writeln!(ctx.errors, "no such user");
        return Ok(());
    }
    let _ = credentials::disable_login(ctx.registry, name);
    if credentials::delete(ctx.registry, name).is_err() {
        let _ = writeln!(ctx.errors, "failed to remove user");
    }
    Ok(())
}

fn enable_login(registry: &mut Registry, name: &str) -> bool {
    match credentials::get(registry, name) {
        Some(record) => credentials::enable_login(registry, record).is_ok(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::User;
    use crate::commands::testing::run_command_with;
    use crate::core::credentials::{self, authenticate};
    use crate::core::env;
    use crate::core::registry::Registry;

    fn user(registry: &mut Registry, param: &str) -> (String, String) {
        let run = run_command_with(&User, param, registry, "");
        (run.output, run.errors)
    }

    #[test]
    fn no_args_prints_current_user() {
        let mut registry = Registry::new();
        assert_eq!(user(&mut registry, "").0, "");
        env::set(&mut registry, env::USER, "debug").expect("set");
        assert_eq!(user(&mut registry, "").0, "debug\n");
    }

    #[test]
    fn add_enables_login_by_default() {
        let mut registry = Registry::new();
        let (output, errors) = user(&mut registry, "add alice pw secret");
        assert!(output.is_empty());
        assert!(errors.is_empty());
        assert!(authenticate(&mut registry, "alice", "secret").is_some());
    }

    #[test]
    fn add_disabled_user_cannot_log_in() {
        let mut registry = Registry::new();
        user(&mut registry, "add bob pw secret disable");
        assert!(credentials::get(&mut registry, "bob").is_some());
        assert!(authenticate(&mut registry, "bob", "secret").is_none());
    }

    #[test]
    fn duplicate_add_reports_failure() {
        let mut registry = Registry::new();
        user(&mut registry, "add alice pw one");
        let (_, errors) = user(&mut registry, "add alice pw two");
        assert_eq!(errors, "failed to add user alice\n");
        assert!(authenticate(&mut registry, "alice", "one").is_some());
    }

    #[test]
    fn set_changes_password_and_login_state() {
        let mut registry = Registry::new();
        user(&mut registry, "add carol pw old");
        user(&mut registry, "set carol pw new");
        assert!(authenticate(&mut registry, "carol", "new").is_some());

        user(&mut registry, "set carol disable");
        assert!(authenticate(&mut registry, "carol", "new").is_none());

        user(&mut registry, "set carol enable");
        assert!(authenticate(&mut registry, "carol", "new").is_some());
    }

    #[test]
    fn set_unknown_user_reports_failure() {
        let mut registry = Registry::new();
        let (_, errors) = user(&mut registry, "set ghost pw x");
        assert_eq!(errors, "failed to update user ghost\n");
        let (_, errors) = user(&mut registry, "set ghost enable");
        assert_eq!(errors, "failed to enable user ghost\n");
    }

    #[test]
    fn del_revokes_login_and_removes_account() {
        let mut registry = Registry::new();
        user(&mut registry, "add dave pw pw");
        let (_, errors) = user(&mut registry, "del dave");
        assert!(errors.is_empty());
        assert!(credentials::get(&mut registry, "dave").is_none());
        assert!(authenticate(&mut registry, "dave", "pw").is_none());

        let (_, errors) = user(&mut registry, "del dave");
        assert_eq!(errors, "no such user\n");
    }

    #[test]
    fn malformed_arguments_print_usage() {
        let mut registry = Registry::new();
        for param in ["add", "add x", "add x pass y", "add x pw y maybe", "set x", "del", "frob"] {
            let (output, _) = user(&mut registry, param);
            assert!(output.starts_with("usage:\n"), "{param}");
            assert!(output.contains("  user del <name>\n"), "{param}");
        }
    }
}
