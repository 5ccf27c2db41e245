//! Readiness notification to a supervising process.
//!
//! One-shot and fire-and-forget: failures are logged, never returned.

use std::path::PathBuf;

/// Environment variable systemd uses to pass its notification socket.
pub const NOTIFY_SOCKET_ENV: &str = "NOTIFY_SOCKET";

/// Tells a supervisor the server is bound and accepting.
pub trait ReadinessNotifier: Send + Sync {
    fn notify_ready(&self);
}

/// Used when no supervisor is present.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl ReadinessNotifier for NoopNotifier {
    fn notify_ready(&self) {
        tracing::trace!("No supervisor, skipping readiness notification");
    }
}

/// Sends `READY=1` over the systemd notification socket.
#[derive(Debug, Clone)]
pub struct SystemdNotifier {
    socket: PathBuf,
}

impl SystemdNotifier {
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
        }
    }

    /// Build from `$NOTIFY_SOCKET`, if set and non-empty.
    pub fn from_env() -> Option<Self> {
        std::env::var_os(NOTIFY_SOCKET_ENV)
            .filter(|value| !value.is_empty())
            .map(Self::new)
    }

    #[cfg(unix)]
    fn send(&self, message: &[u8]) -> std::io::Result<()> {
        use std::os::unix::net::UnixDatagram;

        let socket = UnixDatagram::unbound()?;

        #[cfg(target_os = "linux")]
        {
            use std::os::linux::net::SocketAddrExt;
            use std::os::unix::ffi::OsStrExt;
            use std::os::unix::net::SocketAddr;

            let raw = self.socket.as_os_str().as_bytes();
            if let Some(name) = raw.strip_prefix(b"@") {
                let addr = SocketAddr::from_abstract_name(name)?;
                socket.send_to_addr(message, &addr)?;
                return Ok(());
            }
        }

        socket.send_to(message, &self.socket)?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn send(&self, _message: &[u8]) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "notification sockets require unix",
        ))
    }
}

impl ReadinessNotifier for SystemdNotifier {
    fn notify_ready(&self) {
        match self.send(b"READY=1") {
            Ok(()) => tracing::debug!(socket = ?self.socket, "Readiness sent to supervisor"),
            Err(e) => tracing::warn!(
                socket = ?self.socket,
                error = %e,
                "Failed to send readiness notification"
            ),
        }
    }
}

/// Pick a notifier for the current environment.
pub fn from_env() -> Box<dyn ReadinessNotifier> {
    match SystemdNotifier::from_env() {
        Some(notifier) => Box::new(notifier),
        None => Box::new(NoopNotifier),
    }
}
