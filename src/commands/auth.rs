use crate::storage::User;

use super::{AuthedHandler, Command, CommandError, Handler, State};

/// Wrap a handler that must act as the current user.
///
/// The returned handler resolves the user first and never calls `handler`
/// when that fails.
pub fn logged_in(handler: AuthedHandler) -> Handler {
    Handler::LoggedIn(handler)
}

pub(super) async fn invoke(
    handler: AuthedHandler,
    state: &mut State,
    command: &Command,
) -> Result<(), CommandError> {
    let user = current_user(state).await?;
    handler(state, command, user).await
}

/// Resolve the configured current user against the database.
async fn current_user(state: &State) -> Result<User, CommandError> {
    let Some(name) = state.config.current_user() else {
        return Err(CommandError::Auth(
            "Not logged in: run `gator register <name>` or `gator login <name>` first".to_string(),
        ));
    };

    match state.db.get_user(name).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(CommandError::Auth(format!(
            "Current user {:?} does not exist: log in as another user",
            name
        ))),
        Err(e) => {
            tracing::warn!(user = %name, error = %e, "Failed to look up current user");
            Err(CommandError::Auth(format!(
                "Could not load current user {:?}: {}",
                name, e
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{cmd, test_state};
    use super::super::HandlerFuture;
    use super::*;
    use futures::future::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // only the rejection tests use this handler; it must never run
    static REJECTED_CALLS: AtomicUsize = AtomicUsize::new(0);
    static RESOLVED_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn rejected<'a>(_: &'a mut State, _: &'a Command, _: User) -> HandlerFuture<'a> {
        async move {
            REJECTED_CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        .boxed()
    }

    fn resolved<'a>(_: &'a mut State, _: &'a Command, user: User) -> HandlerFuture<'a> {
        async move {
            assert_eq!(user.name, "alice");
            RESOLVED_CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        .boxed()
    }

    #[tokio::test]
    async fn test_no_current_user_is_auth_error() {
        let mut t = test_state("auth_none").await;
        let err = invoke(rejected, &mut t.state, &cmd("x", &[])).await.unwrap_err();
        assert!(matches!(err, CommandError::Auth(_)));
        assert_eq!(REJECTED_CALLS.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_current_user_is_auth_error() {
        let mut t = test_state("auth_unknown").await;
        t.state.config.current_user_name = "ghost".to_string();
        let err = invoke(rejected, &mut t.state, &cmd("x", &[])).await.unwrap_err();
        assert!(matches!(err, CommandError::Auth(ref msg) if msg.contains("ghost")));
        assert_eq!(REJECTED_CALLS.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_auth_error() {
        let mut t = test_state("auth_store").await;
        t.state.config.current_user_name = "alice".to_string();
        t.state.db.close().await;

        let err = invoke(rejected, &mut t.state, &cmd("x", &[])).await.unwrap_err();
        assert!(matches!(err, CommandError::Auth(_)));
        assert_eq!(REJECTED_CALLS.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolved_user_reaches_handler() {
        let mut t = test_state("auth_ok").await;
        t.state.db.create_user("alice").await.unwrap();
        t.state.config.current_user_name = "alice".to_string();
        invoke(resolved, &mut t.state, &cmd("x", &[])).await.unwrap();
        assert_eq!(RESOLVED_CALLS.load(Ordering::SeqCst), 1);
    }
}
