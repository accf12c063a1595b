//! Byte transports for the LoRa bridge link.
//!
//! The bridge firmware sits behind a USB serial adapter. This crate opens
//! that link and hides the platform details behind [`SerialTransport`]:
//! - Terminal / character devices (raw 8N1 at a configurable baud rate)
//! - Unix domain sockets, for links bridged through `socat` or simulators
//!
//! This is the lowest layer of lorabridge. Everything else builds on top of
//! the boxed [`SerialTransport`] returned by [`open`].

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod device;
#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use traits::{SerialTransport, TransportConfig, DEFAULT_BAUD_RATE};

#[cfg(unix)]
pub use device::DeviceTransport;
#[cfg(unix)]
pub use uds::SocketTransport;

/// Open the link described by `config`.
///
/// A path naming a unix domain socket is connected as a stream; anything
/// else is opened as a device.
pub fn open(config: &TransportConfig) -> Result<Box<dyn SerialTransport>> {
    #[cfg(not(unix))]
    {
        return Err(TransportError::Open {
            path: config.path.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "lorabridge transports require a unix platform",
            ),
        });
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;

        let metadata = std::fs::metadata(&config.path).map_err(|source| TransportError::Open {
            path: config.path.clone(),
            source,
        })?;

        if metadata.file_type().is_socket() {
            Ok(Box::new(SocketTransport::connect(&config.path)?))
        } else {
            Ok(Box::new(DeviceTransport::open(config)?))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::net::UnixListener;
    use std::path::PathBuf;

    use super::*;

    fn unique_dir(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!(
            "/tmp/lbt-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir
    }

    #[test]
    fn open_dispatches_socket_paths() {
        let dir = unique_dir("sock");
        let sock_path = dir.join("link.sock");
        let _listener = UnixListener::bind(&sock_path).unwrap();

        let transport = open(&TransportConfig::new(&sock_path)).unwrap();
        assert_eq!(transport.kind(), "unix-socket");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn open_dispatches_other_paths_to_device() {
        let dir = unique_dir("dev");
        let dev_path = dir.join("tty");
        std::fs::write(&dev_path, b"").unwrap();

        let transport = open(&TransportConfig::new(&dev_path)).unwrap();
        assert_eq!(transport.kind(), "device");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn open_missing_path_fails() {
        let err = open(&TransportConfig::new("/nonexistent/lorabridge")).err();
        assert!(matches!(err, Some(TransportError::Open { .. })));
    }
}
