//! Purpose: `dbgcon` entry point: parse flags, seed configuration, run the console.
//! Role: Binary crate root; wires stdin/stdout/stderr into `Console`.
//! Invariants: The transcript goes to stdout; diagnostics and logs go to stderr.
//! Invariants: Fatal errors are emitted as text on a tty and as JSON otherwise.
//! Invariants: Process exit code is derived from `to_exit_code`.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::ffi::CStr;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{CommandFactory, Parser, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use dbgcon::commands;
use dbgcon::console::{Console, ConsoleConfig};
use dbgcon::core::config;
use dbgcon::core::error::{Error, ErrorKind, to_exit_code};
use dbgcon::core::registry::Registry;
use dbgcon::input::DEFAULT_MAX_LINE;
use dbgcon::plugin::{ChainLoader, Dispatcher, LibraryLoader, ModuleLoader};

const DEFAULT_BANNER: &str = "dbgcon debug console\n\
unauthorized access is forbidden!\n\
use debug:debug if you're allowed\n";

const DEFAULT_STARTUP: &str = "prompt \x1b[01;32m\\u@\\h\x1b[00m:\x1b[01;34m\\w\x1b[00m$ \n\
echo\n\
echo greetings!\n\
echo good luck lol\n\
echo\n\
exit\n";

#[derive(Parser, Debug)]
#[command(
    name = "dbgcon",
    version,
    about = "Minimal interactive debug console",
    long_about = "Minimal interactive debug console.\n\n\
Reads a login and password from stdin, runs the startup script, then \
executes one command per line. Commands are compiled in or loaded from \
libcmd_<name>.so in the module directory."
)]
struct Cli {
    #[arg(
        long,
        default_value = ".",
        help = "Directory searched for libcmd_<name>.so modules",
        value_hint = ValueHint::DirPath
    )]
    module_dir: PathBuf,
    #[arg(long, help = "Only use compiled-in commands; never load shared libraries")]
    no_dynamic: bool,
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_LINE,
        help = "Longest accepted input line, in bytes"
    )]
    max_line: usize,
    #[arg(long, help = "End the session when a command has no entry point")]
    fault_ends_session: bool,
    #[arg(long, help = "Do not re-enable the debug account before each login")]
    no_debug_account: bool,
    #[arg(long, help = "Text shown before the login prompt")]
    banner: Option<String>,
    #[arg(long, value_name = "SHELL", help = "Print shell completions and exit")]
    completions: Option<Shell>,
}

fn main() {
    let exit_code = match run() {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<(), Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
                return err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                });
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Try `dbgcon --help`."));
            }
        },
    };

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "dbgcon", &mut io::stdout());
        return Ok(());
    }

    init_tracing();

    if cli.max_line == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-line must be greater than zero"));
    }

    let mut registry = Registry::new();
    seed_config(&mut registry, cli.banner.as_deref())?;

    let loader: Box<dyn ModuleLoader> = if cli.no_dynamic {
        Box::new(commands::builtin_loader())
    } else {
        Box::new(
            ChainLoader::new()
                .with(commands::builtin_loader())
                .with(LibraryLoader),
        )
    };
    info!(
        module_dir = %cli.module_dir.display(),
        dynamic = !cli.no_dynamic,
        "starting console"
    );

    let console_config = ConsoleConfig {
        max_line: cli.max_line,
        fault_ends_session: cli.fault_ends_session,
        debug_account: !cli.no_debug_account,
    };
    let stdin = io::stdin();
    let mut console = Console::new(
        registry,
        Dispatcher::new(loader, cli.module_dir),
        console_config,
        stdin.lock(),
        io::stdout(),
        io::stderr(),
    );
    let result = console.run();
    console.shutdown();
    result
}

fn seed_config(registry: &mut Registry, banner: Option<&str>) -> Result<(), Error> {
    config::set(registry, config::LOGIN_MSG, banner.unwrap_or(DEFAULT_BANNER))?;
    config::set(registry, config::STARTUP, DEFAULT_STARTUP)?;
    match system_hostname() {
        Some(host) => config::set(registry, config::HOSTNAME, &host)?,
        None => debug!("gethostname failed; using default host name"),
    }
    Ok(())
}

fn system_hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: the buffer is valid for `buf.len()` bytes and stays alive for the call.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return None;
    }
    // Truncated names may lack the terminator.
    let last = buf.len() - 1;
    buf[last] = 0;
    let name = CStr::from_bytes_until_nul(&buf).ok()?.to_str().ok()?;
    (!name.is_empty()).then(|| name.to_string())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error",
        ErrorKind::Usage => "usage error",
        ErrorKind::NotFound => "not found",
        ErrorKind::AlreadyExists => "already exists",
        ErrorKind::Allocation => "out of memory",
        ErrorKind::Validation => "invalid input",
        ErrorKind::Load => "module load failed",
        ErrorKind::Dispatch => "command dispatch failed",
        ErrorKind::Auth => "authentication failed",
        ErrorKind::Io => "i/o error",
    }
    .to_string()
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(path) = err.path() {
        lines.push(format!("path: {}", path.display()));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!("caused by: {cause}"));
    }
    lines.join("\n")
}
