//! Utilities for command handlers.

use std::{
	io::{self, ErrorKind, IsTerminal, Write},
	time::Duration,
};

use clap::ValueEnum;

use crate::k8s::client::DEFAULT_API_TIMEOUT;

/// A writer wrapper that silently handles broken pipe errors.
///
/// When the underlying writer returns a broken pipe error (EPIPE), this wrapper
/// converts it to a successful write. This allows commands to exit cleanly when
/// output is piped to a process that closes early (e.g., `kubecfg diff . | head -1`).
pub struct BrokenPipeGuard<W> {
	inner: W,
}

impl<W> BrokenPipeGuard<W> {
	pub fn new(inner: W) -> Self {
		Self { inner }
	}
}

impl<W: Write> Write for BrokenPipeGuard<W> {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		match self.inner.write(buf) {
			Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(buf.len()),
			other => other,
		}
	}

	fn flush(&mut self) -> io::Result<()> {
		match self.inner.flush() {
			Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
			other => other,
		}
	}
}

/// When to color output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
	/// Color when stdout is a terminal.
	#[default]
	Auto,
	Always,
	Never,
}

impl ColorMode {
	pub fn should_colorize(self) -> bool {
		match self {
			ColorMode::Auto => io::stdout().is_terminal(),
			ColorMode::Always => true,
			ColorMode::Never => false,
		}
	}
}

/// Request timeout from seconds, falling back to the default when unset or zero.
pub fn request_timeout(seconds: Option<u64>) -> Duration {
	seconds
		.filter(|&seconds| seconds > 0)
		.map_or(DEFAULT_API_TIMEOUT, Duration::from_secs)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_utils::BrokenPipeWriter;

	#[test]
	fn test_broken_pipe_is_swallowed() {
		let mut guard = BrokenPipeGuard::new(BrokenPipeWriter);
		assert_eq!(guard.write(b"hello").unwrap(), 5);
		writeln!(guard, "more output").unwrap();
		guard.flush().unwrap();
	}

	#[test]
	fn test_other_errors_pass_through() {
		struct Failing;
		impl Write for Failing {
			fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
				Err(io::Error::new(ErrorKind::PermissionDenied, "denied"))
			}

			fn flush(&mut self) -> io::Result<()> {
				Ok(())
			}
		}

		let err = BrokenPipeGuard::new(Failing).write(b"x").unwrap_err();
		assert_eq!(err.kind(), ErrorKind::PermissionDenied);
	}

	#[test]
	fn test_writes_through() {
		let mut guard = BrokenPipeGuard::new(Vec::new());
		write!(guard, "report").unwrap();
		assert_eq!(guard.inner, b"report");
	}

	#[test]
	fn test_color_mode_fixed() {
		assert!(ColorMode::Always.should_colorize());
		assert!(!ColorMode::Never.should_colorize());
	}

	#[test]
	fn test_request_timeout() {
		assert_eq!(request_timeout(None), DEFAULT_API_TIMEOUT);
		assert_eq!(request_timeout(Some(5)), Duration::from_secs(5));
		assert_eq!(request_timeout(Some(0)), DEFAULT_API_TIMEOUT);
	}
}
