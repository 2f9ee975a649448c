//! The single output surface commands write to.
//!
//! An [`OutputChannel`] owns its sink: the sink is created on first use
//! through a factory and torn down with [`OutputChannel::dispose`]. The
//! channel is shared between concurrently running commands; writes from
//! different commands may interleave.

use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

/// Destination for command output.
pub trait OutputSink: Send {
    fn clear(&mut self);
    fn append(&mut self, text: &str);

    /// Bring the output into view. Most sinks have nothing to do here.
    fn show(&mut self, _preserve_focus: bool) {}

    fn dispose(&mut self) {}
}

type SinkFactory = Box<dyn Fn(&str) -> Box<dyn OutputSink> + Send + Sync>;

/// Lazily created, explicitly disposed output channel.
pub struct OutputChannel {
    name: String,
    factory: SinkFactory,
    sink: Mutex<Option<Box<dyn OutputSink>>>,
}

impl OutputChannel {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&str) -> Box<dyn OutputSink> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(factory),
            sink: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the sink has been created and not yet disposed.
    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Append `output` with trailing whitespace replaced by one newline.
    pub fn print(&self, output: &str) {
        self.with_sink(|sink| {
            sink.append(output.trim_end());
            sink.append("\n");
            sink.show(true);
        });
    }

    /// Clear the channel, then [`print`](Self::print).
    pub fn clear_print(&self, output: &str) {
        self.with_sink(|sink| {
            sink.clear();
            sink.append(output.trim_end());
            sink.append("\n");
            sink.show(true);
        });
    }

    /// Tear the sink down. The next write creates a fresh one.
    pub fn dispose(&self) {
        if let Some(mut sink) = self.lock().take() {
            sink.dispose();
        }
    }

    fn with_sink(&self, write: impl FnOnce(&mut dyn OutputSink)) {
        let mut guard = self.lock();
        let sink = guard.get_or_insert_with(|| (self.factory)(&self.name));
        write(sink.as_mut());
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn OutputSink>>> {
        // A panic while writing leaves the text half-written, nothing worse.
        self.sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for OutputChannel {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Sink writing to any `Write`, e.g. stdout. Clearing prints nothing.
pub struct WriterSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write + Send> OutputSink for WriterSink<W> {
    fn clear(&mut self) {}

    fn append(&mut self, text: &str) {
        // Output is best effort; a closed pipe must not abort the command.
        let _ = self.writer.write_all(text.as_bytes());
    }

    fn show(&mut self, _preserve_focus: bool) {
        let _ = self.writer.flush();
    }
}

/// In-memory sink whose contents can be inspected through a shared handle.
#[derive(Clone, Default)]
pub struct BufferSink {
    contents: Arc<Mutex<String>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.contents
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl OutputSink for BufferSink {
    fn clear(&mut self) {
        if let Ok(mut contents) = self.contents.lock() {
            contents.clear();
        }
    }

    fn append(&mut self, text: &str) {
        if let Ok(mut contents) = self.contents.lock() {
            contents.push_str(text);
        }
    }
}
