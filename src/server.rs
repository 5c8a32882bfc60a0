//! Line-oriented TCP front end for the command language.
//!
//! Each connection carries exactly one request: a single command line
//! terminated by a newline. The response text is written back and the
//! connection is closed.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::actor::reactor::Reactor;

/// Longest request line accepted, newline included.
pub const MAX_REQUEST_BYTES: u64 = 4096;

pub struct CommandServer {
    listener: TcpListener,
    reactor: Arc<Reactor>,
}

impl CommandServer {
    /// Binds the loopback interface. Port 0 picks a free port.
    pub fn bind(port: u16, reactor: Arc<Reactor>) -> io::Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port))?;
        info!(addr = %listener.local_addr()?, "command server listening");
        Ok(Self { listener, reactor })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> { self.listener.local_addr() }

    /// Accepts connections forever, one thread per client.
    pub fn run(self) {
        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("accept failed: {e}");
                    continue;
                }
            };
            let reactor = self.reactor.clone();
            let spawned = thread::Builder::new()
                .name("command-client".to_string())
                .spawn(move || {
                    if let Err(e) = serve(stream, &reactor) {
                        warn!("client connection failed: {e}");
                    }
                });
            if let Err(e) = spawned {
                warn!("could not spawn client thread: {e}");
            }
        }
    }

    /// Runs the accept loop on its own thread.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new().name("command-server".to_string()).spawn(move || self.run())
    }
}

fn serve(stream: TcpStream, reactor: &Reactor) -> io::Result<()> {
    let peer = stream.peer_addr()?;
    let mut line = String::new();
    let read = BufReader::new((&stream).take(MAX_REQUEST_BYTES)).read_line(&mut line)?;
    let response = if read as u64 == MAX_REQUEST_BYTES && !line.ends_with('\n') {
        warn!(%peer, "request exceeds {MAX_REQUEST_BYTES} bytes");
        format!("error: request exceeds {MAX_REQUEST_BYTES} bytes\n")
    } else {
        let line = line.trim_end_matches(['\r', '\n']);
        debug!(%peer, line, "command received");
        reactor.handle_command(line)
    };

    let mut stream = stream;
    stream.write_all(response.as_bytes())?;
    stream.flush()
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::actor::reactor::Event;
    use crate::actor::reactor::testing::bare_config;
    use crate::sys::headless::HeadlessWindowServer;
    use crate::sys::screen::SpaceId;
    use crate::sys::testing::RecordingOverlay;

    fn request(addr: SocketAddr, line: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(line.as_bytes()).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn answers_one_command_per_connection() {
        let ws = Arc::new(HeadlessWindowServer::single_display(1920., 1080.));
        let reactor = Arc::new(Reactor::new(
            &bare_config(),
            ws.clone(),
            Arc::new(RecordingOverlay::default()),
        ));
        let server = CommandServer::bind(0, reactor.clone()).unwrap();
        let addr = server.local_addr().unwrap();
        server.spawn().unwrap();

        let a = ws.add_window(1, "Term", SpaceId::new(1));
        reactor.handle_event(Event::WindowCreated(a));
        let b = ws.add_window(2, "Term", SpaceId::new(1));
        reactor.handle_event(Event::WindowCreated(b));

        assert_eq!(request(addr, "query desktop windows\n"), "1 2\n");
        assert_eq!(request(addr, "desktop --rotate 90\r\n"), "");
        let error = request(addr, "window --focus sideways\n");
        assert!(error.starts_with("error: "), "{error}");
    }

    #[test]
    fn oversized_requests_are_refused() {
        let ws = Arc::new(HeadlessWindowServer::single_display(1920., 1080.));
        let reactor = Arc::new(Reactor::new(
            &bare_config(),
            ws.clone(),
            Arc::new(RecordingOverlay::default()),
        ));
        let server = CommandServer::bind(0, reactor.clone()).unwrap();
        let addr = server.local_addr().unwrap();
        server.spawn().unwrap();

        let a = ws.add_window(1, "Term", SpaceId::new(1));
        reactor.handle_event(Event::WindowCreated(a));

        let mut stream = TcpStream::connect(addr).unwrap();
        let mut line = String::from("query desktop windows ");
        line.extend(std::iter::repeat_n('x', MAX_REQUEST_BYTES as usize - line.len()));
        stream.write_all(line.as_bytes()).unwrap();
        stream.shutdown(std::net::Shutdown::Write).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        assert_eq!(response, format!("error: request exceeds {MAX_REQUEST_BYTES} bytes\n"));

        assert_eq!(request(addr, "query desktop windows\n"), "1\n");
    }
}
