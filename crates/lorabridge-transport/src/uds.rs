use std::io::{ErrorKind, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::SerialTransport;

/// Unix domain socket transport.
///
/// Stands in for a serial device when the link is bridged through a socket
/// (`socat`, a simulator, or a test harness). Timeouts map onto the socket's
/// read and write timeouts.
pub struct SocketTransport {
    stream: Option<UnixStream>,
    path: PathBuf,
}

impl SocketTransport {
    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Smallest timeout handed to the socket; a zero timeout is rejected by std.
    const MIN_TIMEOUT: Duration = Duration::from_millis(1);

    /// Connect to a listening unix domain socket.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let path_bytes = path.as_os_str().len();
        if path_bytes >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len: path_bytes,
                max: Self::MAX_PATH_LEN,
            });
        }

        let stream = UnixStream::connect(&path).map_err(|source| TransportError::Open {
            path: path.clone(),
            source,
        })?;
        info!(?path, "connected to unix domain socket");

        Ok(Self {
            stream: Some(stream),
            path,
        })
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: UnixStream, path: impl Into<PathBuf>) -> Self {
        Self {
            stream: Some(stream),
            path: path.into(),
        }
    }

    /// Socket path this transport is connected to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn stream_mut(&mut self) -> Result<&mut UnixStream> {
        self.stream.as_mut().ok_or(TransportError::Closed)
    }
}

impl SerialTransport for SocketTransport {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let stream = self.stream_mut()?;
        stream.set_read_timeout(Some(timeout.max(Self::MIN_TIMEOUT)))?;

        loop {
            match stream.read(buf) {
                Ok(0) if !buf.is_empty() => return Err(TransportError::Closed),
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    return Ok(0)
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn write(&mut self, bytes: &[u8], timeout: Duration) -> Result<()> {
        let stream = self.stream_mut()?;
        stream.set_write_timeout(Some(timeout.max(Self::MIN_TIMEOUT)))?;

        let mut offset = 0usize;
        while offset < bytes.len() {
            match stream.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    return Err(TransportError::WriteTimeout(timeout))
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        stream.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        match stream.shutdown(Shutdown::Both) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotConnected => {}
            Err(err) => return Err(TransportError::Io(err)),
        }
        debug!(path = ?self.path, "unix domain socket closed");
        Ok(())
    }

    fn try_clone(&self) -> Result<Box<dyn SerialTransport>> {
        let stream = self.stream.as_ref().ok_or(TransportError::Closed)?;
        Ok(Box::new(Self {
            stream: Some(stream.try_clone()?),
            path: self.path.clone(),
        }))
    }

    fn kind(&self) -> &'static str {
        "unix-socket"
    }
}

impl std::fmt::Debug for SocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketTransport")
            .field("path", &self.path)
            .field("open", &self.stream.is_some())
            .finish()
    }
}
