use std::io::{Read, Write};
use std::net::{Ipv4Addr, Shutdown, TcpStream};
use std::process;

use anyhow::Context;
use clap::Parser;
use rift_tiler::common::config::{Config, config_file};

/// Sends one command line to the tiling daemon and prints the reply.
#[derive(Parser)]
#[command(name = "riftc")]
#[command(about = "Command-line client for the rift-tiler daemon")]
struct Cli {
    /// Port the daemon's command server listens on. Defaults to
    /// `settings.server_port` from `~/.rift-tiler.toml`.
    #[arg(short, long)]
    port: Option<u16>,
    /// Command words, e.g. `window --focus east`.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn quote(word: &str) -> String {
    if word.is_empty() || word.contains(char::is_whitespace) {
        format!("\"{word}\"")
    } else {
        word.to_string()
    }
}

fn send(port: u16, line: &str) -> anyhow::Result<String> {
    let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port))
        .with_context(|| format!("could not connect to 127.0.0.1:{port}, is the daemon running?"))?;
    stream.write_all(line.as_bytes())?;
    stream.write_all(b"\n")?;
    stream.shutdown(Shutdown::Write)?;
    let mut response = String::new();
    stream.read_to_string(&mut response).context("reading response")?;
    Ok(response)
}

fn port(cli: &Cli) -> anyhow::Result<u16> {
    match cli.port {
        Some(port) => Ok(port),
        None => Ok(Config::read_or_default(&config_file())?.settings.server_port),
    }
}

fn main() {
    let cli = Cli::parse();
    let line = cli.command.iter().map(|w| quote(w)).collect::<Vec<_>>().join(" ");

    match port(&cli).and_then(|port| send(port, &line)) {
        Ok(response) => {
            if let Some(message) = response.strip_prefix("error: ") {
                eprint!("Error: {message}");
                process::exit(1);
            }
            print!("{response}");
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}
