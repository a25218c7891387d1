use futures::future::FutureExt;
use std::io::Write;

use crate::storage::User;
use crate::util::strip_control_chars;

use super::{Command, CommandError, HandlerFuture, State};

/// `follow <url>`: subscribe the current user to an existing feed.
pub(super) fn follow<'a>(
    state: &'a mut State,
    command: &'a Command,
    user: User,
) -> HandlerFuture<'a> {
    async move {
        let url = command.arg(0, "<url>")?.trim();
        command.expect_at_most(1, "<url>")?;

        let feed = state.db.get_feed_by_url(url).await?.ok_or_else(|| {
            CommandError::Argument(format!(
                "No feed with URL {}: add it with `gator addfeed <name> {}`",
                url, url
            ))
        })?;

        let follow = match state.db.create_feed_follow(user.id, feed.id).await {
            Ok(follow) => follow,
            Err(e) if e.is_conflict() => {
                return Err(CommandError::Argument(format!(
                    "{} already follows {}",
                    user.name, feed.name
                )));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(user = %user.name, feed = %feed.url, "Followed feed");
        writeln!(state.out, "{} now follows {}", follow.user_name, follow.feed_name)?;
        Ok(())
    }
    .boxed()
}

/// `unfollow <url>`: drop the current user's subscription, if any.
pub(super) fn unfollow<'a>(
    state: &'a mut State,
    command: &'a Command,
    user: User,
) -> HandlerFuture<'a> {
    async move {
        let url = command.arg(0, "<url>")?.trim();
        command.expect_at_most(1, "<url>")?;

        if state.db.delete_feed_follow(user.id, url).await? {
            tracing::info!(user = %user.name, feed = %url, "Unfollowed feed");
            writeln!(state.out, "{} no longer follows {}", user.name, url)?;
        } else {
            writeln!(state.out, "{} was not following {}: nothing changed", user.name, url)?;
        }
        Ok(())
    }
    .boxed()
}

/// `following`: feeds the current user follows.
pub(super) fn following<'a>(
    state: &'a mut State,
    command: &'a Command,
    user: User,
) -> HandlerFuture<'a> {
    async move {
        command.expect_at_most(0, "")?;
        let follows = state.db.get_feed_follows_for_user(user.id).await?;

        if follows.is_empty() {
            writeln!(state.out, "{} does not follow any feeds", user.name)?;
            return Ok(());
        }
        writeln!(state.out, "Feeds followed by {}:", user.name)?;
        for follow in &follows {
            writeln!(state.out, "* {}", strip_control_chars(&follow.feed_name))?;
        }
        Ok(())
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{cmd, test_state, TestState};
    use super::*;

    const URL: &str = "https://example.com/rss";

    /// alice owns the feed, bob is the acting user
    async fn setup(test: &str) -> (TestState, User) {
        let t = test_state(test).await;
        let alice = t.state.db.create_user("alice").await.unwrap();
        let bob = t.state.db.create_user("bob").await.unwrap();
        t.state.db.create_feed("Blog", URL, alice.id).await.unwrap();
        (t, bob)
    }

    #[tokio::test]
    async fn test_follow_and_following() {
        let (mut t, bob) = setup("follows_follow").await;

        follow(&mut t.state, &cmd("follow", &[URL]), bob.clone()).await.unwrap();
        following(&mut t.state, &cmd("following", &[]), bob).await.unwrap();

        let out = t.out.contents();
        assert!(out.contains("bob now follows Blog"));
        assert!(out.contains("* Blog"));
    }

    #[tokio::test]
    async fn test_follow_twice_is_error() {
        let (mut t, bob) = setup("follows_twice").await;
        follow(&mut t.state, &cmd("follow", &[URL]), bob.clone()).await.unwrap();

        let err = follow(&mut t.state, &cmd("follow", &[URL]), bob.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Argument(ref msg) if msg.contains("already follows")));
        assert_eq!(
            t.state.db.get_feed_follows_for_user(bob.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_follow_unknown_feed() {
        let (mut t, bob) = setup("follows_unknown").await;
        let err = follow(&mut t.state, &cmd("follow", &["https://nowhere.example/rss"]), bob)
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Argument(_)));
    }

    #[tokio::test]
    async fn test_unfollow() {
        let (mut t, bob) = setup("follows_unfollow").await;
        follow(&mut t.state, &cmd("follow", &[URL]), bob.clone()).await.unwrap();

        unfollow(&mut t.state, &cmd("unfollow", &[URL]), bob.clone()).await.unwrap();
        assert!(t.state.db.get_feed_follows_for_user(bob.id).await.unwrap().is_empty());
        assert!(t.out.contents().contains("bob no longer follows"));
    }

    #[tokio::test]
    async fn test_unfollow_when_not_following_is_ok() {
        let (mut t, bob) = setup("follows_unfollow_noop").await;
        unfollow(&mut t.state, &cmd("unfollow", &[URL]), bob).await.unwrap();
        assert!(t.out.contents().contains("nothing changed"));
    }

    #[tokio::test]
    async fn test_following_empty() {
        let (mut t, bob) = setup("follows_empty").await;
        following(&mut t.state, &cmd("following", &[]), bob).await.unwrap();
        assert!(t.out.contents().contains("does not follow any feeds"));
    }
}
