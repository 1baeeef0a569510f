use crate::error::Error;
use std::borrow::Cow;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::trace;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const FAILURE_OUTPUT_EXCERPT: usize = 2000;

/// Runs the external listing tool against a single archive.
#[derive(Debug, Clone)]
pub struct ArchiveLister {
    tool: String,
    timeout: Duration,
}

impl ArchiveLister {
    pub fn new(tool: impl Into<String>, timeout: Duration) -> Self {
        Self {
            tool: tool.into(),
            timeout,
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Run `<tool> l -slt <archive>` and capture stdout and stderr as one stream.
    ///
    /// The child is killed once the timeout elapses.
    pub fn list_raw(&self, archive: &Path) -> Result<Vec<u8>, Error> {
        let (mut reader, writer) = io::pipe()?;

        // The command owns our copies of the write end, so it must be dropped before reading
        // or the reader never sees EOF.
        let mut child = {
            let mut cmd = Command::new(&self.tool);
            cmd.arg("l")
                .arg("-slt")
                .arg(archive)
                .stdin(Stdio::null())
                .stdout(writer.try_clone()?)
                .stderr(writer);
            match cmd.spawn() {
                Ok(child) => child,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(Error::ListingToolMissing {
                        tool: self.tool.clone(),
                    })
                }
                Err(e) => return Err(Error::Io(e)),
            }
        };

        let (output_tx, output_rx) = mpsc::channel();
        thread::spawn(move || {
            let mut output = Vec::new();
            let result = reader.read_to_end(&mut output).map(|_| output);
            let _ = output_tx.send(result);
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(self.timed_out(archive));
            }
            thread::sleep(POLL_INTERVAL);
        };

        // A descendant of the tool can keep the pipe open after the tool itself exits, so the
        // output is awaited against the same deadline. The reader thread then ends once the
        // last writer closes the pipe.
        let remaining = deadline.saturating_duration_since(Instant::now());
        let output = match output_rx.recv_timeout(remaining) {
            Ok(result) => result?,
            Err(RecvTimeoutError::Timeout) => return Err(self.timed_out(archive)),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(Error::Io(io::Error::other("listing output reader panicked")))
            }
        };
        trace!(
            "{} listed {} ({} bytes, {})",
            self.tool,
            archive.display(),
            output.len(),
            status
        );

        if !status.success() {
            let text = decode_listing(&output);
            let excerpt: String = text.chars().take(FAILURE_OUTPUT_EXCERPT).collect();
            return Err(Error::ListingToolFailed {
                archive: archive.to_path_buf(),
                status,
                output: excerpt,
            });
        }

        Ok(output)
    }

    fn timed_out(&self, archive: &Path) -> Error {
        Error::ListingTimeout {
            archive: archive.to_path_buf(),
            timeout: self.timeout,
        }
    }
}

/// Decode tool output, substituting U+FFFD for invalid sequences instead of failing.
pub fn decode_listing(raw: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(raw)
}
