use std::collections::VecDeque;
use std::fmt;

pub const DEFAULT_CONSOLE_CAPACITY: usize = 500;

/// 訊息等級。 / Severity of a console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Info,
    Error,
}

/// 一行主控台訊息。 / One line of the user-visible console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleEntry {
    pub seq: u64,
    pub level: ConsoleLevel,
    pub message: String,
}

impl fmt::Display for ConsoleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            ConsoleLevel::Info => write!(f, "{}", self.message),
            ConsoleLevel::Error => write!(f, "Error: {}", self.message),
        }
    }
}

/// 使用者可見的操作紀錄，超過容量時捨棄最舊的訊息。 / User-visible operation log; drops the oldest lines beyond capacity.
#[derive(Debug, Clone)]
pub struct ConsoleLog {
    capacity: usize,
    next_seq: u64,
    entries: VecDeque<ConsoleEntry>,
}

impl Default for ConsoleLog {
    fn default() -> Self {
        Self::new(DEFAULT_CONSOLE_CAPACITY)
    }
}

impl ConsoleLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            next_seq: 0,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(ConsoleLevel::Info, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(ConsoleLevel::Error, message.into());
    }

    pub fn entries(&self) -> impl Iterator<Item = &ConsoleEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&ConsoleEntry> {
        self.entries.back()
    }

    /// 是否有包含指定文字的訊息。 / Whether any retained line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|entry| entry.message.contains(needle))
    }

    pub fn errors(&self) -> impl Iterator<Item = &ConsoleEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.level == ConsoleLevel::Error)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn push(&mut self, level: ConsoleLevel, message: String) {
        self.next_seq += 1;
        self.entries.push_back(ConsoleEntry {
            seq: self.next_seq,
            level,
            message,
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }
}
