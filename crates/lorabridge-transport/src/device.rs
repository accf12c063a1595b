use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{SerialTransport, TransportConfig};

/// Character-device transport (USB serial adapters, ptys).
///
/// The descriptor is opened non-blocking and every read or write waits on
/// `poll(2)`, which is how the per-call timeouts are enforced.
pub struct DeviceTransport {
    file: Option<File>,
    path: PathBuf,
}

impl DeviceTransport {
    /// Open `config.path` read/write.
    ///
    /// Terminal devices are switched to raw 8N1 at `config.baud_rate` when
    /// `config.raw_mode` is set; other files are used as-is.
    pub fn open(config: &TransportConfig) -> Result<Self> {
        let speed = baud_constant(config.baud_rate)
            .ok_or(TransportError::UnsupportedBaudRate(config.baud_rate))?;

        let path = config.path.clone();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(&path)
            .map_err(|source| TransportError::Open {
                path: path.clone(),
                source,
            })?;

        let fd = file.as_raw_fd();
        // SAFETY: `fd` is an open descriptor owned by `file`.
        let is_tty = unsafe { libc::isatty(fd) } == 1;
        if is_tty && config.raw_mode {
            configure_raw(fd, speed).map_err(|source| TransportError::Configure {
                path: path.clone(),
                source,
            })?;
            debug!(?path, baud = config.baud_rate, "applied raw 8N1 line settings");
        }

        info!(?path, baud = config.baud_rate, tty = is_tty, "serial device opened");

        Ok(Self {
            file: Some(file),
            path,
        })
    }

    /// Device path this transport was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_mut(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(TransportError::Closed)
    }
}

impl SerialTransport for DeviceTransport {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let file = self.file_mut()?;
        if !wait_fd(file.as_raw_fd(), libc::POLLIN, timeout)? {
            return Ok(0);
        }

        loop {
            match file.read(buf) {
                // Readable with nothing to read means hang-up or end of file.
                Ok(0) if !buf.is_empty() => return Err(TransportError::Closed),
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(0),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn write(&mut self, bytes: &[u8], timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let file = self.file_mut()?;
        let fd = file.as_raw_fd();

        let mut offset = 0usize;
        while offset < bytes.len() {
            match file.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() || !wait_fd(fd, libc::POLLOUT, remaining)? {
                        return Err(TransportError::WriteTimeout(timeout));
                    }
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.file.take().is_some() {
            debug!(path = ?self.path, "serial device closed");
        }
        Ok(())
    }

    fn try_clone(&self) -> Result<Box<dyn SerialTransport>> {
        let file = self.file.as_ref().ok_or(TransportError::Closed)?;
        Ok(Box::new(Self {
            file: Some(file.try_clone()?),
            path: self.path.clone(),
        }))
    }

    fn kind(&self) -> &'static str {
        "device"
    }
}

impl std::fmt::Debug for DeviceTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceTransport")
            .field("path", &self.path)
            .field("open", &self.file.is_some())
            .finish()
    }
}

/// Wait until `fd` reports `events` or `timeout` passes. Returns false on timeout.
fn wait_fd(fd: RawFd, events: libc::c_short, timeout: Duration) -> Result<bool> {
    let millis = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
    let mut pfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };

    loop {
        // SAFETY: `pfd` is a valid, writable pollfd and the count is 1.
        let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == ErrorKind::Interrupted {
                continue;
            }
            return Err(TransportError::Io(err));
        }
        return Ok(rc > 0);
    }
}

fn configure_raw(fd: RawFd, speed: libc::speed_t) -> std::io::Result<()> {
    let mut tio = std::mem::MaybeUninit::<libc::termios>::uninit();
    // SAFETY: `tio` is valid writable storage for one termios and `fd` is open.
    if unsafe { libc::tcgetattr(fd, tio.as_mut_ptr()) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: tcgetattr succeeded, so the struct is initialized.
    let mut tio = unsafe { tio.assume_init() };

    // SAFETY: `tio` is an initialized termios owned by this frame.
    unsafe { libc::cfmakeraw(&mut tio) };
    tio.c_cflag &= !(libc::CSIZE | libc::PARENB | libc::CSTOPB);
    tio.c_cflag |= libc::CS8 | libc::CLOCAL | libc::CREAD;

    // SAFETY: as above; `speed` is one of the libc B* constants.
    let rc = unsafe {
        if libc::cfsetispeed(&mut tio, speed) != 0 || libc::cfsetospeed(&mut tio, speed) != 0 {
            -1
        } else {
            libc::tcsetattr(fd, libc::TCSANOW, &tio)
        }
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

fn baud_constant(baud: u32) -> Option<libc::speed_t> {
    let speed = match baud {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        _ => return None,
    };
    Some(speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(tag: &str, contents: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "lorabridge-device-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        let path = dir.join("device");
        std::fs::write(&path, contents).expect("temp file should be writable");
        path
    }

    #[test]
    fn reads_file_contents_then_reports_closed() {
        let path = temp_file("read", &[0xEA, 0x01, 0x55]);
        let mut transport = DeviceTransport::open(&TransportConfig::new(&path)).unwrap();

        let mut buf = [0u8; 16];
        let n = transport.read(&mut buf, Duration::from_millis(50)).unwrap();
        assert_eq!(&buf[..n], &[0xEA, 0x01, 0x55]);

        let err = transport
            .read(&mut buf, Duration::from_millis(50))
            .unwrap_err();
        assert!(matches!(err, TransportError::Closed));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn writes_land_in_file() {
        let path = temp_file("write", b"");
        let mut transport = DeviceTransport::open(&TransportConfig::new(&path)).unwrap();

        let packet = [0xEA, 0x01, 0x02, 0x6F, 0x6E, 0x02, 0x55];
        transport.write(&packet, Duration::from_secs(1)).unwrap();
        transport.close().unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, vec![0xEA, 0x01, 0x02, 0x6F, 0x6E, 0x02, 0x55]);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn closed_handle_rejects_io_and_double_close_is_ok() {
        let path = temp_file("close", b"x");
        let mut transport = DeviceTransport::open(&TransportConfig::new(&path)).unwrap();

        transport.close().unwrap();
        transport.close().unwrap();

        let mut buf = [0u8; 4];
        assert!(matches!(
            transport.read(&mut buf, Duration::from_millis(10)),
            Err(TransportError::Closed)
        ));
        assert!(matches!(
            transport.write(b"x", Duration::from_millis(10)),
            Err(TransportError::Closed)
        ));
        assert!(transport.try_clone().is_err());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn unsupported_baud_rate_rejected_before_open() {
        let config = TransportConfig::new("/nonexistent/device").with_baud_rate(12345);
        let err = DeviceTransport::open(&config).unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedBaudRate(12345)));
    }

    #[test]
    fn missing_device_reports_open_error() {
        let err = DeviceTransport::open(&TransportConfig::new("/nonexistent/ttyUSB9")).unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
    }

    #[test]
    fn known_baud_rates_map_to_constants() {
        assert_eq!(baud_constant(9600), Some(libc::B9600));
        assert_eq!(baud_constant(115200), Some(libc::B115200));
        assert_eq!(baud_constant(31250), None);
    }
}
