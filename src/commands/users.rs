use futures::future::FutureExt;
use std::io::Write;

use super::{Command, CommandError, HandlerFuture, State};

/// `login <name>`: switch the current user to an existing one.
pub(super) fn login<'a>(state: &'a mut State, command: &'a Command) -> HandlerFuture<'a> {
    async move {
        let name = command.arg(0, "<username>")?.trim();
        command.expect_at_most(1, "<username>")?;

        let user = state
            .db
            .get_user(name)
            .await?
            .ok_or_else(|| CommandError::Argument(format!("User {:?} does not exist", name)))?;

        state.config.set_user(&user.name, &state.config_path)?;
        tracing::info!(user = %user.name, "Logged in");
        writeln!(state.out, "User has been set to {}", user.name)?;
        Ok(())
    }
    .boxed()
}

/// `register <name>`: create a user and make it current.
pub(super) fn register<'a>(state: &'a mut State, command: &'a Command) -> HandlerFuture<'a> {
    async move {
        let name = command.arg(0, "<username>")?.trim();
        command.expect_at_most(1, "<username>")?;
        if name.is_empty() {
            return Err(CommandError::Argument("Username cannot be empty".to_string()));
        }

        let user = match state.db.create_user(name).await {
            Ok(user) => user,
            Err(e) if e.is_conflict() => {
                return Err(CommandError::Argument(format!(
                    "User {:?} already exists",
                    name
                )));
            }
            Err(e) => return Err(e.into()),
        };

        state.config.set_user(&user.name, &state.config_path)?;
        tracing::info!(user = %user.name, id = user.id, "Registered user");
        writeln!(state.out, "User {} was created and logged in", user.name)?;
        Ok(())
    }
    .boxed()
}

/// `reset`: delete every user and feed; follows and posts cascade.
pub(super) fn reset<'a>(state: &'a mut State, command: &'a Command) -> HandlerFuture<'a> {
    async move {
        command.expect_at_most(0, "")?;
        let removed = state.db.reset().await?;
        tracing::info!(users = removed, "Database reset");
        writeln!(state.out, "Database was reset ({} users removed)", removed)?;
        Ok(())
    }
    .boxed()
}

/// `users`: every user by name, the current one marked.
pub(super) fn list<'a>(state: &'a mut State, command: &'a Command) -> HandlerFuture<'a> {
    async move {
        command.expect_at_most(0, "")?;
        let users = state.db.get_users().await?;
        let current = state.config.current_user();

        for user in &users {
            if Some(user.name.as_str()) == current {
                writeln!(state.out, "* {} (current)", user.name)?;
            } else {
                writeln!(state.out, "* {}", user.name)?;
            }
        }
        Ok(())
    }
    .boxed()
}
