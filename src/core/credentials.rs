//! Purpose: User accounts and the set of accounts allowed to log in.
//! Exports: `Credential`, `add`, `set`, `get`, `delete`, `enable_login`,
//! `disable_login`, `authenticate`, `seed_debug_account`.
//! Role: Directory behind the login gate and the `user` command.
//! Invariants: `user` owns account records; `login` holds shared references to them.
//! Invariants: A password change is visible through both stores at once.
//! Invariants: Usernames and passwords are at most `MAX_FIELD_LEN` bytes.
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info};

use crate::core::error::{Error, ErrorKind};
use crate::core::registry::Registry;
use crate::core::value::Value;

/// Accounts created through the directory.
pub const USERS: &str = "user";
/// Accounts currently allowed to log in.
pub const LOGINS: &str = "login";

pub const MAX_FIELD_LEN: usize = 255;

pub const DEBUG_USER: &str = "debug";
pub const DEBUG_PASSWORD: &str = "debug";

pub struct Credential {
    username: String,
    password: RefCell<String>,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: RefCell::new(password.into()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password_matches(&self, candidate: &str) -> bool {
        *self.password.borrow() == candidate
    }

    fn set_password(&self, password: &str) {
        let mut current = self.password.borrow_mut();
        current.clear();
        current.push_str(password);
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

fn check_field(label: &str, value: &str) -> Result<(), Error> {
    if value.len() > MAX_FIELD_LEN {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("{label} longer than {MAX_FIELD_LEN} bytes")));
    }
    Ok(())
}

/// Creates a new account. Fails if the name is taken.
pub fn add(registry: &mut Registry, username: &str, password: &str) -> Result<(), Error> {
    check_field("username", username)?;
    check_field("password", password)?;
    if registry.exists(USERS, username) {
        return Err(Error::new(ErrorKind::AlreadyExists)
            .with_message(format!("user {username} already exists")));
    }

    let record = Rc::new(Credential::new(username, password));
    let slot = registry.reference(USERS, username, None)?;
    *slot = Some(Value::Credential(record));
    debug!(user = %username, "added user");
    Ok(())
}

/// Changes the password of an existing account in place.
pub fn set(registry: &mut Registry, username: &str, password: &str) -> Result<(), Error> {
    check_field("password", password)?;
    let record = get(registry, username).ok_or_else(|| {
        Error::new(ErrorKind::NotFound).with_message(format!("no such user {username}"))
    })?;
    record.set_password(password);
    debug!(user = %username, "updated password");
    Ok(())
}

pub fn get(registry: &mut Registry, username: &str) -> Option<Rc<Credential>> {
    registry
        .get(USERS, username)
        .and_then(Value::as_credential)
        .cloned()
}

/// Removes an account from the directory. Login access is revoked separately.
pub fn delete(registry: &mut Registry, username: &str) -> Result<(), Error> {
    registry.delete(USERS, username)?;
    debug!(user = %username, "deleted user");
    Ok(())
}

/// Allows `credential` to log in, sharing the record rather than copying it.
pub fn enable_login(registry: &mut Registry, credential: Rc<Credential>) -> Result<(), Error> {
    let username = credential.username().to_string();
    let slot = registry.reference(LOGINS, &username, None)?;
    *slot = Some(Value::Credential(credential));
    debug!(user = %username, "login enabled");
    Ok(())
}

pub fn disable_login(registry: &mut Registry, username: &str) -> Result<(), Error> {
    registry.delete(LOGINS, username)?;
    debug!(user = %username, "login disabled");
    Ok(())
}

/// Returns the record when `username` may log in and `password` matches exactly.
pub fn authenticate(
    registry: &mut Registry,
    username: &str,
    password: &str,
) -> Option<Rc<Credential>> {
    let credential = registry
        .get(LOGINS, username)
        .and_then(Value::as_credential)?;
    if !credential.password_matches(password) {
        return None;
    }
    info!(user = %username, "authenticated");
    Some(Rc::clone(credential))
}

/// Enables the built-in `debug` account used to reach the console.
pub fn seed_debug_account(registry: &mut Registry) -> Result<(), Error> {
    enable_login(
        registry,
        Rc::new(Credential::new(DEBUG_USER, DEBUG_PASSWORD)),
    )
}
