//! Operator console: one command per line, directed or broadcast.
//!
//! `<index> <cmd>` targets one actor; a line with no leading index is a
//! broadcast applied sequentially in registry order. Room joining is batch
//! provisioning: the first failed `joinRoom` (directed or broadcast) ends
//! the console entirely.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

use crate::actor::Actor;

/// Drive the registry from a line source until it ends or a `joinRoom`
/// fails.
pub async fn run<R>(input: R, actors: &[Arc<Actor>]) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let mut toks = line.split_whitespace();
        let Some(first) = toks.next() else {
            continue;
        };

        if let Ok(index) = first.parse::<usize>() {
            let Some(actor) = actors.get(index) else {
                warn!(index, "could not find actor with that index");
                continue;
            };
            match toks.next() {
                Some("joinRoom") => {
                    if !provision(actor).await {
                        return Ok(());
                    }
                }
                Some("beginChat") => actor.begin_chat(),
                Some("endChat") => actor.end_chat(),
                other => {
                    warn!(cmd = other.unwrap_or(""), "invalid actor-specific command");
                }
            }
        } else {
            match first {
                "joinRoom" => {
                    for actor in actors {
                        if !provision(actor).await {
                            return Ok(());
                        }
                    }
                }
                _ => warn!(cmd = first, "invalid command"),
            }
        }
    }
    Ok(())
}

/// Join the first room, then set the profile. `false` is terminal for the
/// whole console, not just this actor.
async fn provision(actor: &Actor) -> bool {
    if !actor.join_room().await {
        return false;
    }
    actor.set_profile().await;
    true
}
