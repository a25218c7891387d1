use chrono::DateTime;
use futures::future::FutureExt;
use std::io::Write;

use crate::storage::User;
use crate::util::{one_line, strip_control_chars};

use super::{Command, CommandError, HandlerFuture, State};

const DEFAULT_LIMIT: i64 = 2;
const DESCRIPTION_WIDTH: usize = 200;

/// `browse [limit]`: newest posts from the feeds the current user follows.
pub(super) fn browse<'a>(
    state: &'a mut State,
    command: &'a Command,
    user: User,
) -> HandlerFuture<'a> {
    async move {
        command.expect_at_most(1, "[limit]")?;
        let limit = match command.args.first() {
            Some(raw) => parse_limit(raw)?,
            None => DEFAULT_LIMIT,
        };

        let posts = state.db.get_posts_for_user(user.id, limit).await?;
        if posts.is_empty() {
            writeln!(
                state.out,
                "No posts yet: follow a feed and run `gator agg <interval>`"
            )?;
            return Ok(());
        }

        for post in &posts {
            let published = post
                .published_at
                .and_then(DateTime::from_timestamp_millis)
                .map(|dt| dt.format("%a %b %d %Y").to_string())
                .unwrap_or_else(|| "undated".to_string());

            writeln!(state.out, "{} from {}", published, strip_control_chars(&post.feed_name))?;
            writeln!(state.out, "--- {} ---", one_line(&post.title, usize::MAX))?;
            if let Some(description) = post.description.as_deref() {
                writeln!(state.out, "    {}", one_line(description, DESCRIPTION_WIDTH))?;
            }
            writeln!(state.out, "Link: {}", strip_control_chars(&post.url))?;
            writeln!(state.out, "=====================================")?;
        }
        Ok(())
    }
    .boxed()
}

fn parse_limit(raw: &str) -> Result<i64, CommandError> {
    match raw.trim().parse::<i64>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(CommandError::Argument(format!(
            "Invalid limit {:?}: expected a positive number",
            raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{cmd, test_state, TestState};
    use super::*;
    use crate::storage::NewPost;

    async fn setup(test: &str) -> (TestState, User) {
        let t = test_state(test).await;
        let user = t.state.db.create_user("alice").await.unwrap();
        let feed = t
            .state
            .db
            .create_feed("Blog", "https://example.com/rss", user.id)
            .await
            .unwrap();
        t.state.db.create_feed_follow(user.id, feed.id).await.unwrap();

        let dates = [1_136_239_445_000, 1_136_325_845_000, 1_136_412_245_000];
        for (n, published_at) in (1..).zip(dates) {
            t.state
                .db
                .create_post(&NewPost {
                    feed_id: feed.id,
                    title: format!("Post {n}"),
                    url: format!("https://example.com/{n}"),
                    description: Some(format!("Body\n{n}")),
                    published_at: Some(published_at),
                })
                .await
                .unwrap();
        }
        (t, user)
    }

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit("5").unwrap(), 5);
        assert!(parse_limit("0").is_err());
        assert!(parse_limit("-3").is_err());
        assert!(parse_limit("ten").is_err());
    }

    #[tokio::test]
    async fn test_browse_default_limit_newest_first() {
        let (mut t, user) = setup("browse_default").await;

        browse(&mut t.state, &cmd("browse", &[]), user).await.unwrap();

        let out = t.out.contents();
        assert!(out.contains("--- Post 3 ---"));
        assert!(out.contains("--- Post 2 ---"));
        assert!(!out.contains("--- Post 1 ---"));
        assert!(out.find("Post 3").unwrap() < out.find("Post 2").unwrap());
        assert!(out.contains("from Blog"));
        assert!(out.contains("    Body 3"));
    }

    #[tokio::test]
    async fn test_browse_with_limit() {
        let (mut t, user) = setup("browse_limit").await;
        browse(&mut t.state, &cmd("browse", &["10"]), user).await.unwrap();
        assert_eq!(t.out.contents().matches("Link: ").count(), 3);
    }

    #[tokio::test]
    async fn test_browse_invalid_limit() {
        let (mut t, user) = setup("browse_invalid").await;
        let err = browse(&mut t.state, &cmd("browse", &["many"]), user)
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Argument(_)));
    }

    #[tokio::test]
    async fn test_browse_nothing_followed() {
        let mut t = test_state("browse_empty").await;
        let user = t.state.db.create_user("carol").await.unwrap();
        browse(&mut t.state, &cmd("browse", &[]), user).await.unwrap();
        assert!(t.out.contents().starts_with("No posts yet"));
    }
}
