//! Purpose: Login gate and interactive session loop.
//! Exports: `Console`, `ConsoleConfig`, `LineOutcome`.
//! Role: Drives the transcript: banner, login, startup script, prompt/read/dispatch, teardown.
//! Invariants: Prompts are written without a trailing newline and flushed before each read.
//! Invariants: Every session ends by unloading command modules and flushing `env`.
//! Invariants: End of input at the login prompt ends `run`; inside a session it only ends the session.
//! Invariants: Diagnostics go to the error stream; command output goes to the output stream.
use std::io::{BufRead, Write};
use std::rc::Rc;

use tracing::{debug, info};

use crate::core::credentials::{self, Credential};
use crate::core::error::{Error, ErrorKind};
use crate::core::registry::Registry;
use crate::core::{config, env};
use crate::input::{DEFAULT_MAX_LINE, ReadLine, is_exit_command, read_bounded_line, split_input};
use crate::plugin::{Context, Dispatcher, invoke, is_valid_command_name};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Longest accepted input line, in bytes.
    pub max_line: usize,
    /// Treat a command without an entry point like `exit`.
    pub fault_ends_session: bool,
    /// Re-enable the built-in `debug` account before every login.
    pub debug_account: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            max_line: DEFAULT_MAX_LINE,
            fault_ends_session: false,
            debug_account: true,
        }
    }
}

/// What a single command line did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    /// Blank, malformed, or unknown command.
    Invalid,
    /// `exit` or `quit`.
    Exit,
    /// The command's module has no entry point.
    Fault,
}

pub struct Console<R, W, E> {
    registry: Registry,
    dispatcher: Dispatcher,
    config: ConsoleConfig,
    input: R,
    output: W,
    errors: E,
}

fn write_failed(err: std::io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message("failed to write transcript")
        .with_source(err)
}

fn read_failed(err: std::io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message("failed to read input")
        .with_source(err)
}

impl<R: BufRead, W: Write, E: Write> Console<R, W, E> {
    pub fn new(
        registry: Registry,
        dispatcher: Dispatcher,
        config: ConsoleConfig,
        input: R,
        output: W,
        errors: E,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            config,
            input,
            output,
            errors,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn errors(&self) -> &E {
        &self.errors
    }

    /// Runs login and session rounds until input ends at the login prompt.
    pub fn run(&mut self) -> Result<(), Error> {
        while let Some(user) = self.login()? {
            self.session(user)?;
        }
        debug!("input closed at login");
        self.output.flush().map_err(write_failed)
    }

    /// Destroys every store, unloading modules and dropping accounts.
    pub fn shutdown(&mut self) {
        self.registry.clear();
        let _ = self.output.flush();
        let _ = self.errors.flush();
    }

    fn read_line(&mut self, prompt: &str) -> Result<ReadLine, Error> {
        self.output
            .write_all(prompt.as_bytes())
            .and_then(|()| self.output.flush())
            .map_err(write_failed)?;
        read_bounded_line(&mut self.input, self.config.max_line).map_err(read_failed)
    }

    fn report(&mut self, message: &str) -> Result<(), Error> {
        writeln!(self.errors, "{message}").map_err(write_failed)
    }

    /// Prompts until a known account logs in. `None` means input ended.
    pub fn login(&mut self) -> Result<Option<Rc<Credential>>, Error> {
        if self.config.debug_account {
            credentials::seed_debug_account(&mut self.registry)?;
        }
        if let Some(message) = config::get(&mut self.registry, config::LOGIN_MSG) {
            writeln!(self.output, "{message}").map_err(write_failed)?;
        }

        loop {
            let username = match self.read_line("Login: ")? {
                ReadLine::Line(line) => Some(line),
                ReadLine::TooLong => None,
                ReadLine::Eof => return Ok(None),
            };
            let password = match self.read_line("Password: ")? {
                ReadLine::Line(line) => Some(line),
                ReadLine::TooLong => None,
                ReadLine::Eof => return Ok(None),
            };

            let user = match (&username, &password) {
                (Some(username), Some(password)) => {
                    credentials::authenticate(&mut self.registry, username, password)
                }
                _ => {
                    self.report("input too long")?;
                    None
                }
            };
            if let Some(user) = user {
                return Ok(Some(user));
            }

            info!(user = %username.as_deref().unwrap_or(""), "login failed");
            writeln!(self.output, "Login failed\n").map_err(write_failed)?;
        }
    }

    /// One session for `user`: setup, prompt loop, teardown.
    pub fn session(&mut self, user: Rc<Credential>) -> Result<(), Error> {
        info!(user = %user.username(), "session started");
        let result = self.session_loop(&user);
        self.teardown();
        info!(user = %user.username(), "session ended");
        result
    }

    fn session_loop(&mut self, user: &Credential) -> Result<(), Error> {
        if let Err(err) = self.setup(user) {
            info!(error = %err, "session setup failed");
            self.report("init failed")?;
            return Ok(());
        }

        loop {
            let prompt = env::prompt(&mut self.registry).to_string();
            let line = match self.read_line(&prompt)? {
                ReadLine::Line(line) => line,
                ReadLine::TooLong => {
                    self.report("input too long")?;
                    continue;
                }
                ReadLine::Eof => return Ok(()),
            };
            let outcome = self.run_line(&line)?;
            if self.ends_session(outcome) {
                return Ok(());
            }
        }
    }

    fn ends_session(&self, outcome: LineOutcome) -> bool {
        match outcome {
            LineOutcome::Exit => true,
            LineOutcome::Fault => self.config.fault_ends_session,
            LineOutcome::Continue | LineOutcome::Invalid => false,
        }
    }

    /// Seeds `USER` and `PS1`, then runs the configured startup script.
    pub fn setup(&mut self, user: &Credential) -> Result<(), Error> {
        env::set(&mut self.registry, env::USER, user.username())?;
        env::set(&mut self.registry, env::PS1, env::DEFAULT_PROMPT)?;

        let script = config::get(&mut self.registry, config::STARTUP).map(str::to_string);
        if let Some(script) = script {
            self.run_script(&script)?;
        }
        Ok(())
    }

    /// Runs each non-empty line of `script`, stopping where a line would end the session.
    pub fn run_script(&mut self, script: &str) -> Result<(), Error> {
        for line in script.split('\n').filter(|line| !line.is_empty()) {
            let outcome = self.run_line(line)?;
            if self.ends_session(outcome) {
                break;
            }
        }
        Ok(())
    }

    /// Parses and executes one command line.
    pub fn run_line(&mut self, line: &str) -> Result<LineOutcome, Error> {
        let (command, param) = split_input(line);
        if command.is_empty() && param.is_empty() {
            return Ok(LineOutcome::Invalid);
        }
        if !is_valid_command_name(command) {
            self.report(&format!("bad command {command}"))?;
            return Ok(LineOutcome::Invalid);
        }
        if is_exit_command(command) {
            return Ok(LineOutcome::Exit);
        }

        let module = match self.dispatcher.load(&mut self.registry, command) {
            Ok(module) => module,
            Err(err) => {
                debug!(command = %command, error = %err, "command unavailable");
                self.report(&format!("unknown command {command}"))?;
                return Ok(LineOutcome::Invalid);
            }
        };

        let result = {
            let mut ctx = Context {
                registry: &mut self.registry,
                input: &mut self.input,
                output: &mut self.output,
                errors: &mut self.errors,
                max_line: self.config.max_line,
            };
            invoke(command, &module, param, &mut ctx)
        };

        match result {
            Ok(()) => Ok(LineOutcome::Continue),
            Err(err) if err.kind() == ErrorKind::Dispatch => {
                info!(command = %command, error = %err, "command has no entry point");
                self.report(&format!("internal error in command {command}"))?;
                Ok(LineOutcome::Fault)
            }
            Err(err) if err.kind() == ErrorKind::Validation => {
                self.report(&format!("bad parameter for command {command}"))?;
                Ok(LineOutcome::Invalid)
            }
            Err(err) => Err(err),
        }
    }

    /// Unloads command modules and drops session variables.
    pub fn teardown(&mut self) {
        self.dispatcher.unload_all(&mut self.registry);
        if self.registry.flush(env::STORE).is_err() {
            debug!("no session variables to flush");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Console, ConsoleConfig, LineOutcome};
    use crate::commands::builtin_loader;
    use crate::core::credentials::{self, Credential};
    use crate::core::registry::Registry;
    use crate::core::{config, env};
    use crate::plugin::{Dispatcher, Module, ModuleLoader};
    use crate::core::error::{Error, ErrorKind};
    use std::io::Cursor;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    type TestConsole = Console<Cursor<Vec<u8>>, Vec<u8>, Vec<u8>>;

    fn console_with(input: &str, config: ConsoleConfig) -> TestConsole {
        Console::new(
            Registry::new(),
            Dispatcher::new(Box::new(builtin_loader()), "."),
            config,
            Cursor::new(input.as_bytes().to_vec()),
            Vec::new(),
            Vec::new(),
        )
    }

    fn console(input: &str) -> TestConsole {
        console_with(input, ConsoleConfig::default())
    }

    fn output(console: &TestConsole) -> String {
        String::from_utf8_lossy(console.output()).into_owned()
    }

    fn errors(console: &TestConsole) -> String {
        String::from_utf8_lossy(console.errors()).into_owned()
    }

    #[test]
    fn blank_and_delimiter_lines_are_silently_invalid() {
        let mut console = console("");
        for line in ["", " ", "\t", "\n"] {
            assert_eq!(console.run_line(line).expect("line"), LineOutcome::Invalid);
        }
        assert!(errors(&console).is_empty());
    }

    #[test]
    fn malformed_command_is_reported() {
        let mut console = console("");
        assert_eq!(console.run_line("LS /").expect("line"), LineOutcome::Invalid);
        assert_eq!(console.run_line(" ls").expect("line"), LineOutcome::Invalid);
        assert_eq!(errors(&console), "bad command LS\nbad command \n");
        assert!(!console.registry_mut().exists("cmd", "LS"));
    }

    #[test]
    fn exit_and_quit_end_the_line_loop() {
        let mut console = console("");
        assert_eq!(console.run_line("exit").expect("line"), LineOutcome::Exit);
        assert_eq!(console.run_line("quit now").expect("line"), LineOutcome::Exit);
    }

    #[test]
    fn unknown_command_is_reported_and_left_uncached() {
        let mut console = console("");
        assert_eq!(console.run_line("frobnicate").expect("line"), LineOutcome::Invalid);
        assert_eq!(errors(&console), "unknown command frobnicate\n");
        assert!(console.registry_mut().exists("cmd", "frobnicate"));
        assert!(console.registry_mut().get("cmd", "frobnicate").is_none());
    }

    #[test]
    fn builtin_command_runs_with_parameter() {
        let mut console = console("");
        assert_eq!(
            console.run_line("echo hello  world").expect("line"),
            LineOutcome::Continue
        );
        assert_eq!(output(&console), "hello  world\n");
    }

    struct NoEntry;

    impl Module for NoEntry {
        fn path(&self) -> &Path {
            Path::new("./libcmd_broken.so")
        }

        fn resolve(&self, _symbol: &str) -> Option<crate::plugin::Entry> {
            None
        }
    }

    struct BrokenLoader;

    impl ModuleLoader for BrokenLoader {
        fn load(&self, path: &Path) -> Result<Rc<dyn Module>, Error> {
            if path == PathBuf::from("./libcmd_broken.so") {
                Ok(Rc::new(NoEntry))
            } else {
                Err(Error::new(ErrorKind::Load))
            }
        }
    }

    unsafe extern "C" fn ignore_param(_param: *const std::os::raw::c_char) {}

    struct ForeignOnly;

    impl Module for ForeignOnly {
        fn path(&self) -> &Path {
            Path::new("./libcmd_native.so")
        }

        fn resolve(&self, _symbol: &str) -> Option<crate::plugin::Entry> {
            Some(crate::plugin::Entry::Foreign(ignore_param))
        }
    }

    struct NativeLoader;

    impl ModuleLoader for NativeLoader {
        fn load(&self, _path: &Path) -> Result<Rc<dyn Module>, Error> {
            Ok(Rc::new(ForeignOnly))
        }
    }

    #[test]
    fn nul_in_foreign_parameter_is_reported() {
        let mut console = Console::new(
            Registry::new(),
            Dispatcher::new(Box::new(NativeLoader), "."),
            ConsoleConfig::default(),
            Cursor::new(Vec::new()),
            Vec::new(),
            Vec::new(),
        );
        assert_eq!(
            console.run_line("native a\0b").expect("line"),
            LineOutcome::Invalid
        );
        assert_eq!(errors(&console), "bad parameter for command native\n");
        assert_eq!(console.run_line("native ok").expect("line"), LineOutcome::Continue);
    }

    fn broken_console(input: &str, config: ConsoleConfig) -> TestConsole {
        Console::new(
            Registry::new(),
            Dispatcher::new(Box::new(BrokenLoader), "."),
            config,
            Cursor::new(input.as_bytes().to_vec()),
            Vec::new(),
            Vec::new(),
        )
    }

    #[test]
    fn missing_entry_point_is_a_recoverable_fault() {
        let mut console = broken_console("broken\nbroken\nexit\n", ConsoleConfig::default());
        console
            .session(Rc::new(Credential::new("debug", "debug")))
            .expect("session");
        assert_eq!(
            errors(&console),
            "internal error in command broken\ninternal error in command broken\n"
        );
    }

    #[test]
    fn fault_can_end_the_session_like_exit() {
        let config = ConsoleConfig {
            fault_ends_session: true,
            ..ConsoleConfig::default()
        };
        let mut console = broken_console("broken\nbroken\nexit\n", config);
        console
            .session(Rc::new(Credential::new("debug", "debug")))
            .expect("session");
        assert_eq!(errors(&console), "internal error in command broken\n");
    }

    #[test]
    fn session_seeds_env_and_tears_down() {
        let mut console = console("user\nexit\n");
        console
            .session(Rc::new(Credential::new("debug", "debug")))
            .expect("session");
        assert_eq!(output(&console), "> debug\n> ");
        let registry = console.registry_mut();
        assert!(env::current_user(registry).is_none());
        assert!(!registry.exists("cmd", "user"));
    }

    #[test]
    fn startup_script_runs_until_exit_line() {
        let mut console = console("exit\n");
        config::set(
            console.registry_mut(),
            config::STARTUP,
            "prompt $ \necho one\n\nexit\necho two\n",
        )
        .expect("set");
        console
            .session(Rc::new(Credential::new("debug", "debug")))
            .expect("session");
        assert_eq!(output(&console), "one\n$ ");
    }

    #[test]
    fn end_of_input_ends_session() {
        let mut console = console("echo hi\n");
        console
            .session(Rc::new(Credential::new("debug", "debug")))
            .expect("session");
        assert_eq!(output(&console), "> hi\n> ");
        assert!(env::current_user(console.registry_mut()).is_none());
    }

    #[test]
    fn overlong_command_line_is_rejected() {
        let config = ConsoleConfig {
            max_line: 16,
            ..ConsoleConfig::default()
        };
        let input = format!("echo {}\necho ok\n", "x".repeat(32));
        let mut console = console_with(&input, config);
        console
            .session(Rc::new(Credential::new("debug", "debug")))
            .expect("session");
        assert_eq!(errors(&console), "input too long\n");
        assert_eq!(output(&console), "> > ok\n> ");
    }

    #[test]
    fn login_retries_until_credentials_match() {
        let mut console = console("debug\nwrong\ndebug\nnope\ndebug\ndebug\n");
        config::set(console.registry_mut(), config::LOGIN_MSG, "welcome").expect("set");
        let user = console.login().expect("login").expect("user");
        assert_eq!(user.username(), "debug");
        let transcript = output(&console);
        assert!(transcript.starts_with("welcome\nLogin: Password: Login failed\n\n"));
        assert_eq!(transcript.matches("Login failed").count(), 2);
    }

    #[test]
    fn login_returns_none_at_end_of_input() {
        let mut console = console("debug\n");
        assert!(console.login().expect("login").is_none());
    }

    #[test]
    fn login_without_debug_account() {
        let config = ConsoleConfig {
            debug_account: false,
            ..ConsoleConfig::default()
        };
        let mut console = console_with("debug\ndebug\nalice\npw\n", config);
        credentials::add(console.registry_mut(), "alice", "pw").expect("add");
        let record = credentials::get(console.registry_mut(), "alice").expect("record");
        credentials::enable_login(console.registry_mut(), record).expect("enable");

        let user = console.login().expect("login").expect("user");
        assert_eq!(user.username(), "alice");
    }

    #[test]
    fn shutdown_clears_every_store() {
        let mut console = console("");
        config::set(console.registry_mut(), config::STARTUP, "exit\n").expect("set");
        console.shutdown();
        assert!(console.registry().store_names().is_empty());
    }
}
