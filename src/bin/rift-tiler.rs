use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rift_tiler::actor::reactor::{Event, Reactor};
use rift_tiler::common::config::{Config, config_file};
use rift_tiler::common::log;
use rift_tiler::replay::EventFeed;
use rift_tiler::server::CommandServer;
use rift_tiler::sys::geometry::Size;
use rift_tiler::sys::headless::HeadlessWindowServer;
use rift_tiler::sys::overlay::NoOverlay;
use rift_tiler::sys::screen::{DisplayId, SpaceId};
use tracing::{error, info};

/// Tiling daemon over an in-memory display. Window events are read as JSON
/// lines on stdin and the resulting frames are written to stdout; commands
/// are accepted from `riftc` on the command server.
#[derive(Parser)]
#[command(name = "rift-tiler")]
struct Cli {
    /// Size of the display, `<width>x<height>`.
    #[arg(long, default_value = "1920x1080", value_parser = parse_size)]
    display: Size,

    /// Number of desktops on the display.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    desktops: u64,

    /// Port for the command server. Defaults to `settings.server_port`.
    #[arg(short, long)]
    port: Option<u16>,

    /// Config file to read instead of `~/.rift-tiler.toml`.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_size(raw: &str) -> Result<Size, String> {
    let invalid = || format!("expected <width>x<height>, got `{raw}`");
    let (w, h) = raw.split_once('x').ok_or_else(invalid)?;
    let width: f64 = w.parse().map_err(|_| invalid())?;
    let height: f64 = h.parse().map_err(|_| invalid())?;
    if width <= 0.0 || height <= 0.0 {
        return Err(invalid());
    }
    Ok(Size::new(width, height))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let path = cli.config.unwrap_or_else(config_file);
    let config = Config::read_or_default(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let port = cli.port.unwrap_or(config.settings.server_port);

    let window_server =
        Arc::new(HeadlessWindowServer::single_display(cli.display.width, cli.display.height));
    for desktop in 2..=cli.desktops {
        if let Some(space) = SpaceId::try_new(desktop) {
            window_server.add_space(DisplayId(1), space);
        }
    }
    let reactor = Arc::new(Reactor::new(&config, window_server.clone(), Arc::new(NoOverlay)));
    reactor.handle_event(Event::SpaceChanged(DisplayId(1)));

    CommandServer::bind(port, reactor.clone())
        .with_context(|| format!("binding command server on port {port}"))?
        .spawn()?;
    info!(desktops = cli.desktops, "reading window events from stdin");

    EventFeed::new(reactor, window_server).run(io::stdin().lock(), io::stdout().lock())
}

fn main() {
    let cli = Cli::parse();
    log::init_logging();
    if let Err(e) = run(cli) {
        error!("{e:#}");
        process::exit(1);
    }
}
