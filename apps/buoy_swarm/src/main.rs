use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, Level};

mod actor;
mod console;
#[cfg(test)]
mod fakebuoy;

use actor::Actor;

#[derive(Clone, Debug)]
struct Config {
    addr: SocketAddr,
    invite: String,
    actors: u32,
}

fn usage_and_exit() -> ! {
    eprintln!(
        "buoy_swarm\n\n\
USAGE:\n  buoy_swarm <actor-count>\n\n\
ENV:\n\
  BUOY_ADDR    default 127.0.0.1:4600\n\
  INVITE_CODE  default dev-invite\n\n\
CONSOLE (stdin, one command per line):\n\
  joinRoom                 provision every actor, in order\n\
  <index> joinRoom         provision one actor\n\
  <index> beginChat        start that actor's chat timer\n\
  <index> endChat          stop that actor's chat timer\n"
    );
    std::process::exit(2);
}

fn parse_args() -> Config {
    let addr: SocketAddr = std::env::var("BUOY_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:4600".to_string())
        .parse()
        .unwrap_or_else(|_| usage_and_exit());
    let invite = std::env::var("INVITE_CODE").unwrap_or_else(|_| "dev-invite".to_string());

    let mut it = std::env::args().skip(1);
    let actors: u32 = match it.next() {
        Some(v) => v.parse().unwrap_or_else(|_| usage_and_exit()),
        None => usage_and_exit(),
    };
    if actors == 0 || it.next().is_some() {
        usage_and_exit();
    }

    Config {
        addr,
        invite,
        actors,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,buoy_swarm=info".into()),
        )
        .with_target(false)
        .with_max_level(Level::INFO)
        .init();

    let cfg = parse_args();
    info!(addr = %cfg.addr, actors = cfg.actors, "buoy swarm starting");

    let actors: Vec<Arc<Actor>> = (0..cfg.actors)
        .map(|i| Actor::spawn(i, cfg.addr, &cfg.invite))
        .collect();

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    console::run(stdin, &actors).await?;

    info!("console closed; shutting down");
    Ok(())
}
