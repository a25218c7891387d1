use futures::future::FutureExt;
use std::io::Write;

use crate::config::parse_interval;
use crate::feed::Scheduler;

use super::{Command, HandlerFuture, State};

const USAGE: &str = "<time_between_reqs>  (e.g. 30s, 1m, 1h)";

/// `agg <interval>`: poll feeds until shutdown is requested.
pub(super) fn agg<'a>(state: &'a mut State, command: &'a Command) -> HandlerFuture<'a> {
    async move {
        let raw = command.arg(0, USAGE)?;
        command.expect_at_most(1, USAGE)?;
        let interval = parse_interval(raw)?;

        let scheduler = Scheduler::new(state.db.clone(), state.client.clone(), interval)?
            .with_fetch_timeout(state.config.fetch_timeout());

        writeln!(state.out, "Collecting feeds every {}", humanize(interval))?;
        state.out.flush()?;

        let stats = scheduler.run(state.shutdown.clone()).await;

        writeln!(
            state.out,
            "Stopped after {} ticks ({} failed), {} new posts",
            stats.ticks, stats.failures, stats.posts_inserted
        )?;
        Ok(())
    }
    .boxed()
}

fn humanize(interval: std::time::Duration) -> String {
    let secs = interval.as_secs();
    if interval.subsec_nanos() != 0 || secs == 0 {
        return format!("{:?}", interval);
    }
    let (h, m, s) = (secs / 3600, secs % 3600 / 60, secs % 60);
    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if m > 0 {
        out.push_str(&format!("{m}m"));
    }
    if s > 0 {
        out.push_str(&format!("{s}s"));
    }
    out
}
