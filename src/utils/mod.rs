//! Utilities: logging setup (level derived from -v / -q), in-memory output capture.
//!
//! Key items:
//!   init_logging / derive_level
//!   SharedBuffer

#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::io::{self, Write};
#[cfg(test)]
use std::rc::Rc;

/// Logging helpers.
pub mod logging {
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::EnvFilter;

    /// Map CLI verbosity to a level. Default stays at `warn` so stderr narration is not
    /// drowned in diagnostics.
    pub fn derive_level(verbose: u8, quiet: bool) -> LevelFilter {
        if quiet {
            return LevelFilter::ERROR;
        }
        match verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    /// Install the global subscriber. `RUST_LOG` wins over the CLI derived level.
    pub fn init_logging(level: LevelFilter) {
        let filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .try_init();
    }
}

pub use logging::{derive_level, init_logging};

/// Clonable in-memory writer; every clone appends to the same buffer.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct SharedBuffer {
    buf: Rc<RefCell<Vec<u8>>>,
}

#[cfg(test)]
impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.borrow()).into_owned()
    }
}

#[cfg(test)]
impl Write for SharedBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn quiet_wins_over_verbose() {
        assert_eq!(derive_level(2, true), LevelFilter::ERROR);
    }

    #[test]
    fn verbosity_steps() {
        assert_eq!(derive_level(0, false), LevelFilter::WARN);
        assert_eq!(derive_level(1, false), LevelFilter::DEBUG);
        assert_eq!(derive_level(5, false), LevelFilter::TRACE);
    }

    #[test]
    fn shared_buffer_clones_share_content() {
        let buf = SharedBuffer::default();
        let mut writer = buf.clone();
        write!(writer, "hello ").unwrap();
        writeln!(writer, "world").unwrap();
        assert_eq!(buf.contents(), "hello world\n");
    }
}
