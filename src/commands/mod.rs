//! Command dispatch: the name → handler registry behind the CLI.
//!
//! Handlers come in two shapes. Public handlers get the [`State`] and the
//! [`Command`]. Handlers wrapped with [`logged_in`] also get the current
//! [`User`], resolved by the wrapper before they run.

mod agg;
mod auth;
mod browse;
mod feeds;
mod follows;
mod users;

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::watch;

use crate::config::{Config, ConfigError};
use crate::storage::{Database, DatabaseError, User};

pub use auth::logged_in;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum CommandError {
    /// No handler registered under this name
    #[error("Unknown command: {0}")]
    NotFound(String),

    /// Missing or invalid arguments
    #[error("{0}")]
    Argument(String),

    /// No current user, or the current user could not be loaded
    #[error("{0}")]
    Auth(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

// ============================================================================
// Command and State
// ============================================================================

/// A command name with its positional arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Positional argument `index`, or an argument error showing `usage`.
    pub fn arg(&self, index: usize, usage: &str) -> Result<&str, CommandError> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| self.usage_error(usage))
    }

    /// Fail when more than `max` arguments were given.
    pub fn expect_at_most(&self, max: usize, usage: &str) -> Result<(), CommandError> {
        if self.args.len() > max {
            return Err(self.usage_error(usage));
        }
        Ok(())
    }

    fn usage_error(&self, usage: &str) -> CommandError {
        if usage.is_empty() {
            CommandError::Argument(format!("usage: gator {}", self.name))
        } else {
            CommandError::Argument(format!("usage: gator {} {}", self.name, usage))
        }
    }
}

/// Everything a handler may touch. Passed by `&mut` into every invocation.
pub struct State {
    pub db: Database,
    pub config: Config,
    /// Where `config` is saved when the current user changes
    pub config_path: PathBuf,
    pub client: reqwest::Client,
    /// Flips to `true` when the process is asked to stop (Ctrl-C)
    pub shutdown: watch::Receiver<bool>,
    /// Command output (stdout in the binary)
    pub out: Box<dyn Write + Send>,
}

// ============================================================================
// Handlers and Router
// ============================================================================

pub type HandlerFuture<'a> = BoxFuture<'a, Result<(), CommandError>>;

/// Handler that needs no identity
pub type PlainHandler = for<'a> fn(&'a mut State, &'a Command) -> HandlerFuture<'a>;

/// Handler that acts as the current user
pub type AuthedHandler = for<'a> fn(&'a mut State, &'a Command, User) -> HandlerFuture<'a>;

#[derive(Clone, Copy)]
pub enum Handler {
    Public(PlainHandler),
    LoggedIn(AuthedHandler),
}

impl Handler {
    async fn invoke(self, state: &mut State, command: &Command) -> Result<(), CommandError> {
        match self {
            Handler::Public(handler) => handler(state, command).await,
            Handler::LoggedIn(handler) => auth::invoke(handler, state, command).await,
        }
    }
}

#[derive(Default)]
pub struct CommandRouter {
    handlers: HashMap<String, Handler>,
}

impl CommandRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Router with every gator command registered
    pub fn with_default_commands() -> Self {
        let mut router = Self::new();
        router.register("login", Handler::Public(users::login));
        router.register("register", Handler::Public(users::register));
        router.register("reset", Handler::Public(users::reset));
        router.register("users", Handler::Public(users::list));
        router.register("agg", Handler::Public(agg::agg));
        router.register("feeds", Handler::Public(feeds::list));
        router.register("addfeed", logged_in(feeds::add));
        router.register("follow", logged_in(follows::follow));
        router.register("unfollow", logged_in(follows::unfollow));
        router.register("following", logged_in(follows::following));
        router.register("browse", logged_in(browse::browse));
        router
    }

    /// Store `handler` under `name`. A later registration for the same name
    /// replaces the earlier one.
    pub fn register(&mut self, name: impl Into<String>, handler: Handler) {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            tracing::debug!(command = %name, "Replaced command handler");
        }
    }

    /// Look up and invoke the handler for `command.name`.
    ///
    /// # Errors
    ///
    /// `CommandError::NotFound` when nothing is registered under the name;
    /// otherwise whatever the handler returns, unchanged.
    pub async fn run(&self, state: &mut State, command: &Command) -> Result<(), CommandError> {
        let handler = *self
            .handlers
            .get(&command.name)
            .ok_or_else(|| CommandError::NotFound(command.name.clone()))?;

        tracing::debug!(command = %command.name, args = ?command.args, "Running command");
        handler.invoke(state, command).await
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Cloneable in-memory writer; one clone goes into `State::out`
    #[derive(Clone, Default)]
    pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    pub struct TestState {
        pub state: State,
        pub out: SharedBuf,
        pub shutdown_tx: watch::Sender<bool>,
        dir: PathBuf,
    }

    impl Drop for TestState {
        fn drop(&mut self) {
            std::fs::remove_dir_all(&self.dir).ok();
        }
    }

    /// In-memory database and a config file in a fresh temp directory
    pub async fn test_state(name: &str) -> TestState {
        let dir = std::env::temp_dir().join(format!(
            "gator_cmd_test_{}_{}",
            name,
            std::process::id()
        ));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        let config_path = dir.join(".gatorconfig.json");

        let db = Database::open(":memory:").await.unwrap();
        let out = SharedBuf::default();
        let (shutdown_tx, shutdown) = watch::channel(false);

        TestState {
            state: State {
                db,
                config: Config::load(&config_path).unwrap(),
                config_path,
                client: reqwest::Client::new(),
                shutdown,
                out: Box::new(out.clone()),
            },
            out,
            shutdown_tx,
            dir,
        }
    }

    pub fn cmd(name: &str, args: &[&str]) -> Command {
        Command::new(name, args.iter().map(|a| a.to_string()).collect())
    }
}
