//! Line transport to the remote debug channel of the emulator.

use crate::debugger::error::Error;
use crate::debugger::protocol::{is_break_marker, RemoteCommand, SyncToken, BREAK_MARKER};
use crate::muted_error;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::os::fd::AsRawFd;
use std::time::{Duration, Instant};
use timeout_readwrite::TimeoutReader;

/// Bidirectional line-oriented text channel.
pub trait Transport: Send {
    /// Write a single line, a line terminator is appended by transport.
    fn send_line(&mut self, line: &str) -> Result<(), Error>;

    /// Read a single line if one is available.
    ///
    /// Return `Ok(None)` if there is nothing to read yet (not an error) and
    /// [`Error::TransportClosed`] if channel reached its end.
    fn poll_line(&mut self) -> Result<Option<String>, Error>;
}

/// Encode and send a batch of commands.
pub fn send_batch(transport: &mut dyn Transport, commands: &[RemoteCommand]) -> Result<(), Error> {
    for cmd in commands {
        let line = cmd.encode();
        log::debug!(target: "protocol", "send: {line}");
        transport.send_line(&line)?;
    }
    Ok(())
}

/// Read all immediately available lines.
pub fn drain_available(transport: &mut dyn Transport) -> Result<Vec<String>, Error> {
    let mut lines = vec![];
    while let Some(line) = transport.poll_line()? {
        lines.push(line);
    }
    Ok(lines)
}

enum Scan {
    Done,
    Skip,
    Keep,
}

fn read_until(
    transport: &mut dyn Transport,
    awaited: &str,
    timeout: Duration,
    scan: impl Fn(&str) -> Scan,
) -> Result<Vec<String>, Error> {
    let start = Instant::now();
    let mut lines = vec![];

    let timed_out = || Error::ProtocolTimeout {
        awaited: awaited.to_string(),
        waited: start.elapsed(),
    };

    loop {
        match transport.poll_line() {
            Ok(Some(line)) => match scan(&line) {
                Scan::Done => return Ok(lines),
                Scan::Skip => log::debug!(target: "protocol", "skip line: {line}"),
                Scan::Keep => lines.push(line),
            },
            Ok(None) => {}
            Err(Error::TransportClosed) => {
                log::warn!(target: "protocol", "debug channel closed while waiting for `{awaited}`");
                return Err(timed_out());
            }
            Err(e) => return Err(e),
        }

        if start.elapsed() >= timeout {
            return Err(timed_out());
        }
    }
}

/// Read lines until the reply line of a sync token appears.
///
/// Return all lines received before the sync line. Fails with [`Error::ProtocolTimeout`]
/// if sync line doesn't arrive in `timeout` or if the channel is closed first.
/// Echoes of outdated sync tokens are skipped.
pub fn read_until_sync(
    transport: &mut dyn Transport,
    token: &SyncToken,
    timeout: Duration,
) -> Result<Vec<String>, Error> {
    read_until(transport, token.as_str(), timeout, |line| {
        if token.is_reply(line) {
            Scan::Done
        } else if token.is_stale_reply(line) {
            Scan::Skip
        } else {
            Scan::Keep
        }
    })
}

/// Read lines until a stop notification appears.
pub fn read_until_break(
    transport: &mut dyn Transport,
    timeout: Duration,
) -> Result<Vec<String>, Error> {
    read_until(transport, BREAK_MARKER, timeout, |line| {
        if is_break_marker(line) {
            Scan::Done
        } else {
            Scan::Keep
        }
    })
}

/// [`Transport`] implementation over a pair of byte streams.
///
/// Reads are bounded by a poll timeout, a partially received line is kept
/// until its terminator arrives.
pub struct StreamTransport<R: Read + AsRawFd, W: Write> {
    reader: BufReader<TimeoutReader<R>>,
    writer: W,
    pending: Vec<u8>,
}

impl<R: Read + AsRawFd, W: Write> StreamTransport<R, W> {
    /// Create a new transport.
    ///
    /// # Arguments
    ///
    /// * `reader`: incoming stream
    /// * `writer`: outgoing stream
    /// * `poll_timeout`: max time of a single [`Transport::poll_line`] call
    pub fn new(reader: R, writer: W, poll_timeout: Duration) -> Self {
        Self {
            reader: BufReader::new(TimeoutReader::new(reader, poll_timeout)),
            writer,
            pending: vec![],
        }
    }

    fn take_pending(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        self.pending.clear();
        line
    }
}

impl StreamTransport<TcpStream, TcpStream> {
    /// Connect to a remote debug socket.
    pub fn connect(addr: impl ToSocketAddrs, poll_timeout: Duration) -> Result<Self, Error> {
        let stream = TcpStream::connect(addr)?;
        muted_error!(stream.set_nodelay(true), "disable nagle algorithm:");
        let reader = stream.try_clone()?;
        Ok(Self::new(reader, stream, poll_timeout))
    }
}

impl<R, W> Transport for StreamTransport<R, W>
where
    R: Read + AsRawFd + Send,
    W: Write + Send,
{
    fn send_line(&mut self, line: &str) -> Result<(), Error> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn poll_line(&mut self) -> Result<Option<String>, Error> {
        match self.reader.read_until(b'\n', &mut self.pending) {
            Ok(0) if self.pending.is_empty() => Err(Error::TransportClosed),
            // last line without terminator
            Ok(0) => Ok(Some(self.take_pending())),
            Ok(_) if self.pending.ends_with(b"\n") => Ok(Some(self.take_pending())),
            Ok(_) => Ok(None),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
