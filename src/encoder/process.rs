//! Encoder processes as frame sinks

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::rc::Rc;

use tracing::{debug, info, warn};

use super::command::EncoderInvocation;

/// Byte stream consuming raw frames in display order.
pub trait FrameSink {
    /// Write one complete frame. Blocks while the consumer catches up.
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Flush and close the stream. Calling it again does nothing.
    fn close(&mut self) -> io::Result<()>;
}

/// Starts encoder processes.
pub trait EncoderLauncher {
    /// Encoder binary every invocation runs.
    fn binary(&self) -> &Path;

    fn is_available(&self) -> bool {
        self.binary().is_file()
    }

    fn launch(&mut self, invocation: &EncoderInvocation) -> io::Result<Box<dyn FrameSink>>;
}

/// Spawns the real encoder with stdin piped.
#[derive(Debug, Clone)]
pub struct FfmpegLauncher {
    binary: PathBuf,
}

impl FfmpegLauncher {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl EncoderLauncher for FfmpegLauncher {
    fn binary(&self) -> &Path {
        &self.binary
    }

    fn launch(&mut self, invocation: &EncoderInvocation) -> io::Result<Box<dyn FrameSink>> {
        Ok(Box::new(EncoderPipe::spawn(invocation)?))
    }
}

/// Running encoder process fed through its stdin
pub struct EncoderPipe {
    child: Child,
    stdin: Option<ChildStdin>,
    pass_index: usize,
}

impl EncoderPipe {
    pub fn spawn(invocation: &EncoderInvocation) -> io::Result<Self> {
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "encoder stdin was not captured")
        })?;

        debug!(
            "Encoder for pass {} running as pid {}",
            invocation.pass_index,
            child.id()
        );

        Ok(Self {
            child,
            stdin: Some(stdin),
            pass_index: invocation.pass_index,
        })
    }
}

impl FrameSink for EncoderPipe {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "encoder pipe closed"))?;
        stdin.write_all(frame)
    }

    fn close(&mut self) -> io::Result<()> {
        let Some(mut stdin) = self.stdin.take() else {
            return Ok(());
        };

        let flushed = stdin.flush();
        // EOF lets the encoder finalize its output
        drop(stdin);

        let status = self.child.wait()?;
        if status.success() {
            debug!("Encoder for pass {} exited", self.pass_index);
        } else {
            warn!("Encoder for pass {} exited with {}", self.pass_index, status);
        }
        flushed
    }
}

impl Drop for EncoderPipe {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close encoder pipe for pass {}: {}", self.pass_index, e);
        }
    }
}

/// What an in-memory pipe received
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipeRecord {
    pub pass_index: usize,
    pub output: PathBuf,
    pub frames: u64,
    pub bytes: u64,
    pub closed: bool,
    /// Copy of the most recent frame, when the launcher keeps frames
    pub last_frame: Option<Vec<u8>>,
}

/// Shared view of every pipe a [`MemoryLauncher`] opened
#[derive(Debug, Clone, Default)]
pub struct PipeLedger(Rc<RefCell<Vec<PipeRecord>>>);

impl PipeLedger {
    pub fn records(&self) -> Vec<PipeRecord> {
        self.0.borrow().clone()
    }

    pub fn opened(&self) -> usize {
        self.0.borrow().len()
    }

    /// Pipes opened and not yet closed.
    pub fn open_pipes(&self) -> usize {
        self.0.borrow().iter().filter(|r| !r.closed).count()
    }

    pub fn total_frames(&self) -> u64 {
        self.0.borrow().iter().map(|r| r.frames).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.0.borrow().iter().map(|r| r.bytes).sum()
    }

    fn push(&self, record: PipeRecord) -> usize {
        let mut records = self.0.borrow_mut();
        records.push(record);
        records.len() - 1
    }

    fn update(&self, slot: usize, f: impl FnOnce(&mut PipeRecord)) {
        if let Some(record) = self.0.borrow_mut().get_mut(slot) {
            f(record);
        }
    }
}

/// Launcher that accepts frames in memory instead of running an encoder.
pub struct MemoryLauncher {
    binary: PathBuf,
    available: bool,
    keep_frames: bool,
    fail_on_pass: Option<usize>,
    fail_write_after: Option<u64>,
    ledger: PipeLedger,
}

impl MemoryLauncher {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("memory"),
            available: true,
            keep_frames: false,
            fail_on_pass: None,
            fail_write_after: None,
            ledger: PipeLedger::default(),
        }
    }

    /// Pretend the encoder binary is missing.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn keep_frames(mut self) -> Self {
        self.keep_frames = true;
        self
    }

    /// Refuse to open the pipe for `pass_index`.
    pub fn fail_on_pass(mut self, pass_index: usize) -> Self {
        self.fail_on_pass = Some(pass_index);
        self
    }

    /// Every pipe breaks once it has accepted `frames` frames.
    pub fn fail_write_after(mut self, frames: u64) -> Self {
        self.fail_write_after = Some(frames);
        self
    }

    pub fn ledger(&self) -> PipeLedger {
        self.ledger.clone()
    }
}

impl Default for MemoryLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl EncoderLauncher for MemoryLauncher {
    fn binary(&self) -> &Path {
        &self.binary
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn launch(&mut self, invocation: &EncoderInvocation) -> io::Result<Box<dyn FrameSink>> {
        if self.fail_on_pass == Some(invocation.pass_index) {
            return Err(io::Error::other(format!(
                "refusing to open pass {}",
                invocation.pass_index
            )));
        }

        let slot = self.ledger.push(PipeRecord {
            pass_index: invocation.pass_index,
            output: invocation.output.clone(),
            ..Default::default()
        });
        info!("Opened in-memory pipe for {}", invocation.output.display());

        Ok(Box::new(MemorySink {
            ledger: self.ledger.clone(),
            slot,
            keep_frames: self.keep_frames,
            write_limit: self.fail_write_after,
            written: 0,
            closed: false,
        }))
    }
}

struct MemorySink {
    ledger: PipeLedger,
    slot: usize,
    keep_frames: bool,
    write_limit: Option<u64>,
    written: u64,
    closed: bool,
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        }
        if self.write_limit.is_some_and(|limit| self.written >= limit) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "encoder stopped reading"));
        }
        self.written += 1;
        let keep = self.keep_frames;
        self.ledger.update(self.slot, |record| {
            record.frames += 1;
            record.bytes += frame.len() as u64;
            if keep {
                record.last_frame = Some(frame.to_vec());
            }
        });
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if !self.closed {
            self.closed = true;
            self.ledger.update(self.slot, |record| record.closed = true);
        }
        Ok(())
    }
}

impl Drop for MemorySink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
