use std::sync::{Arc, Mutex};

/// Something the user is told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A blocking message such as an alert.
    Message(String),
    /// The small status overlay summarising the last load.
    Diagnostic(String),
}

pub trait Notifier: Send + Sync {
    fn message(&self, text: &str);
    fn diagnostic(&self, text: &str);
}

/// Writes messages to stdout and diagnostics to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn message(&self, text: &str) {
        println!("{text}");
    }

    fn diagnostic(&self, text: &str) {
        eprintln!("[gallery] {text}");
    }
}

/// Keeps notices in memory, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter_map(|n| match n {
                Notice::Message(text) => Some(text),
                Notice::Diagnostic(_) => None,
            })
            .collect()
    }

    pub fn last_diagnostic(&self) -> Option<String> {
        self.notices().into_iter().rev().find_map(|n| match n {
            Notice::Diagnostic(text) => Some(text),
            Notice::Message(_) => None,
        })
    }

    fn push(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}

impl Notifier for MemoryNotifier {
    fn message(&self, text: &str) {
        self.push(Notice::Message(text.to_string()));
    }

    fn diagnostic(&self, text: &str) {
        self.push(Notice::Diagnostic(text.to_string()));
    }
}
