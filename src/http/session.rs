//! Session operations abstraction
//!
//! The pipeline never touches a socket directly. It talks to a
//! [`SessionOps`] implementation through [`HttpSession`], which refreshes the
//! read deadline before every read and guarantees the transport is closed
//! exactly once.

use super::{Error, Result};
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

/// Session operations trait
///
/// This trait defines the byte-stream operations the HTTP layer needs from
/// a connection.
pub trait SessionOps {
    /// Set how long the next read may block; `None` blocks indefinitely
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()>;

    /// Read data from the session
    ///
    /// Returns `Ok(0)` at end of stream and `Err(Error::Timeout)` when the
    /// read deadline passes without data.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write data to the session
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Close the session
    fn close(&mut self) -> Result<()>;
}

/// HTTP session wrapping a transport with session operations
pub struct HttpSession<S: SessionOps> {
    session: S,
    timeout: Option<Duration>,
    closed: bool,
}

impl<S: SessionOps> HttpSession<S> {
    /// Create a new HTTP session
    pub fn new(session: S) -> Self {
        HttpSession {
            session,
            timeout: Some(Duration::from_secs(10)),
            closed: false,
        }
    }

    /// Set the per-read timeout
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Get the per-read timeout
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Read data, with the deadline reset to now + timeout
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }

        loop {
            self.session.set_read_timeout(self.timeout)?;
            match self.session.read(buf) {
                Err(Error::Io(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    /// Write the whole buffer
    pub fn write_all(&mut self, mut buf: &[u8]) -> Result<()> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }

        while !buf.is_empty() {
            match self.session.write(buf) {
                Ok(0) => return Err(Error::ConnectionClosed),
                Ok(n) => buf = &buf[n..],
                Err(Error::Io(e)) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    /// Close the session; later calls are no-ops
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.session.close()
    }

    /// Whether the session has been closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Get a reference to the underlying session
    pub fn get_ref(&self) -> &S {
        &self.session
    }

    /// Get a mutable reference to the underlying session
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: SessionOps> Drop for HttpSession<S> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Plain TCP session operations
pub struct FdSessionOps {
    stream: TcpStream,
}

impl FdSessionOps {
    /// Create a new FD session operations from a TCP stream
    pub fn new(stream: TcpStream) -> Self {
        FdSessionOps { stream }
    }

    /// Get a reference to the underlying stream
    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }
}

fn map_read_error(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Error::Timeout,
        _ => Error::Io(e),
    }
}

impl SessionOps for FdSessionOps {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        // A zero duration is rejected by the socket API and means "no deadline" here
        let timeout = timeout.filter(|d| !d.is_zero());
        self.stream.set_read_timeout(timeout).map_err(Error::from)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.stream.read(buf).map_err(map_read_error)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.stream.write(buf).map_err(Error::from)
    }

    fn close(&mut self) -> Result<()> {
        self.stream.flush()?;
        match self.stream.shutdown(Shutdown::Both) {
            // The peer may already be gone
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other.map_err(Error::from),
        }
    }
}

/// Helper to create an HTTP session from a TCP stream
pub fn from_tcp_stream(stream: TcpStream) -> HttpSession<FdSessionOps> {
    HttpSession::new(FdSessionOps::new(stream))
}


#[cfg(test)]
mod tests {
    use super::scripted::{ScriptedSession, Step};
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_fd_session_ops() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(b"Hello").unwrap();
        });

        let stream = TcpStream::connect(addr).unwrap();
        let mut session = from_tcp_stream(stream);
        session.set_timeout(Some(Duration::from_secs(1)));

        let mut buf = [0u8; 5];
        let mut read = 0;
        while read < 5 {
            read += session.read(&mut buf[read..]).unwrap();
        }
        assert_eq!(&buf, b"Hello");

        handle.join().unwrap();
    }

    #[test]
    fn test_http_session_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        // Don't send anything - test timeout
        let handle = thread::spawn(move || {
            let (_stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(500));
        });

        let stream = TcpStream::connect(addr).unwrap();
        let mut session = from_tcp_stream(stream);
        session.set_timeout(Some(Duration::from_millis(100)));

        let mut buf = [0u8; 10];
        let result = session.read(&mut buf);
        assert!(matches!(result, Err(Error::Timeout)));

        handle.join().unwrap();
    }

    #[test]
    fn test_deadline_refreshed_before_every_read() {
        let scripted = ScriptedSession::new(vec![
            Step::Data(b"ab".to_vec()),
            Step::Data(b"cd".to_vec()),
        ]);
        let record = scripted.record.clone();
        let mut session = HttpSession::new(scripted);
        session.set_timeout(Some(Duration::from_millis(250)));

        let mut buf = [0u8; 8];
        assert_eq!(session.read(&mut buf).unwrap(), 2);
        assert_eq!(session.read(&mut buf).unwrap(), 2);
        assert_eq!(session.read(&mut buf).unwrap(), 0);

        let timeouts = &record.lock().unwrap().timeouts;
        assert_eq!(timeouts.len(), 3);
        assert!(timeouts.iter().all(|t| *t == Some(Duration::from_millis(250))));
    }

    #[test]
    fn test_interrupted_read_is_retried() {
        let scripted = ScriptedSession::new(vec![
            Step::Fail(io::ErrorKind::Interrupted),
            Step::Data(b"x".to_vec()),
        ]);
        let mut session = HttpSession::new(scripted);

        let mut buf = [0u8; 1];
        assert_eq!(session.read(&mut buf).unwrap(), 1);
    }

    #[test]
    fn test_close_once() {
        let scripted = ScriptedSession::new(Vec::new());
        let record = scripted.record.clone();

        {
            let mut session = HttpSession::new(scripted);
            session.close().unwrap();
            session.close().unwrap();
            assert!(session.is_closed());

            let mut buf = [0u8; 1];
            assert!(matches!(session.read(&mut buf), Err(Error::ConnectionClosed)));
        }

        assert_eq!(record.lock().unwrap().closed, 1);
    }

    #[test]
    fn test_close_on_drop() {
        let scripted = ScriptedSession::new(Vec::new());
        let record = scripted.record.clone();
        drop(HttpSession::new(scripted));
        assert_eq!(record.lock().unwrap().closed, 1);
    }
}
