//! Seam to the notification service.
//!
//! Notifications are fire-and-forget: the sync controller never learns whether
//! one was seen. [`ConsoleNotifier`] only formats them into [`ConsoleLine`]s;
//! the terminal client drains those and writes them with the rest of its
//! output.

/// Presentation options for an info dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoOptions {
    pub width: u32,
    pub backdrop: bool,
}

impl Default for InfoOptions {
    fn default() -> Self {
        Self {
            width: 600,
            backdrop: false,
        }
    }
}

pub trait Notifier {
    fn show_success(&mut self, title: &str, body: &str);
    fn show_error(&mut self, title: &str, body: &str);
    fn show_warning(&mut self, title: &str, body: &str);
    /// `html` may contain `<br>` line breaks.
    fn show_info(&mut self, title: &str, html: &str, options: &InfoOptions);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// A formatted notice waiting to be written. `text` may span several lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub stream: Stream,
    pub text: String,
}

/// Queues notifications for the terminal client. Problems go to stderr.
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    pending: Vec<ConsoleLine>,
}

impl ConsoleNotifier {
    /// Takes every notice queued since the last call, oldest first.
    pub fn drain(&mut self) -> Vec<ConsoleLine> {
        std::mem::take(&mut self.pending)
    }

    fn push(&mut self, stream: Stream, text: String) {
        self.pending.push(ConsoleLine { stream, text });
    }
}

impl Notifier for ConsoleNotifier {
    fn show_success(&mut self, title: &str, body: &str) {
        self.push(Stream::Stdout, format!("*** {title} {body}"));
    }

    fn show_error(&mut self, title: &str, body: &str) {
        self.push(Stream::Stderr, format!("!!! {title}: {body}"));
    }

    fn show_warning(&mut self, title: &str, body: &str) {
        self.push(Stream::Stderr, format!("!!! {title}: {body}"));
    }

    fn show_info(&mut self, title: &str, html: &str, _options: &InfoOptions) {
        let mut text = format!("*** {title}");
        for line in html.split("<br>") {
            text.push_str("\n    ");
            text.push_str(line);
        }
        self.push(Stream::Stdout, text);
    }
}
