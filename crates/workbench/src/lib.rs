//! Workbench coordinator tying documents, sessions, the explorer and search together.
//! 協調文件、工作階段、檔案總管與搜尋的工作台模組。

pub mod console;
pub mod coordinator;
pub mod events;

pub use console::{ConsoleEntry, ConsoleLevel, ConsoleLog, DEFAULT_CONSOLE_CAPACITY};
pub use coordinator::{
    Coordinator, OpenOutcome, SaveOutcome, SearchResults, SearchScope, WorkbenchError,
};
pub use events::{WorkbenchEvent, WorkbenchListener};
