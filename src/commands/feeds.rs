use futures::future::FutureExt;
use std::io::Write;

use crate::storage::User;
use crate::util::{strip_control_chars, validate_feed_url};

use super::{Command, CommandError, HandlerFuture, State};

const ADDFEED_USAGE: &str = "<name> <url>";

/// `addfeed <name> <url>`: create a feed owned by the current user and
/// follow it.
pub(super) fn add<'a>(state: &'a mut State, command: &'a Command, user: User) -> HandlerFuture<'a> {
    async move {
        let name = command.arg(0, ADDFEED_USAGE)?.trim();
        let url = command.arg(1, ADDFEED_USAGE)?.trim();
        command.expect_at_most(2, ADDFEED_USAGE)?;
        if name.is_empty() {
            return Err(CommandError::Argument("Feed name cannot be empty".to_string()));
        }
        validate_feed_url(url)
            .map_err(|e| CommandError::Argument(format!("Invalid feed URL {:?}: {}", url, e)))?;

        let (feed, follow) = match state.db.create_feed_and_follow(name, url, user.id).await {
            Ok(created) => created,
            Err(e) if e.is_conflict() => {
                return Err(CommandError::Argument(format!(
                    "A feed with URL {} already exists: use `gator follow {}`",
                    url, url
                )));
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(feed = %feed.url, id = feed.id, user = %user.name, "Added feed");

        writeln!(state.out, "Feed was created")?;
        writeln!(state.out, "  Name: {}", strip_control_chars(&feed.name))?;
        writeln!(state.out, "  URL:  {}", strip_control_chars(&feed.url))?;
        writeln!(
            state.out,
            "{} now follows {}",
            strip_control_chars(&follow.user_name),
            strip_control_chars(&follow.feed_name)
        )?;
        Ok(())
    }
    .boxed()
}

/// `feeds`: every feed with the name of the user who added it.
pub(super) fn list<'a>(state: &'a mut State, command: &'a Command) -> HandlerFuture<'a> {
    async move {
        command.expect_at_most(0, "")?;
        let feeds = state.db.get_feeds().await?;
        if feeds.is_empty() {
            writeln!(state.out, "No feeds yet: add one with `gator addfeed <name> <url>`")?;
            return Ok(());
        }

        for feed in &feeds {
            writeln!(state.out, "* {}", strip_control_chars(&feed.name))?;
            writeln!(state.out, "  URL:     {}", strip_control_chars(&feed.url))?;
            writeln!(state.out, "  Creator: {}", strip_control_chars(&feed.creator))?;
        }
        Ok(())
    }
    .boxed()
}
