//! Session persistence and explorer tree model for InkEdit.
//! 管理 InkEdit 工作階段紀錄與檔案總管樹的核心模組。

mod serde_path;

pub mod session;
pub mod tree;

pub use session::{
    validate_record, PersistOutcome, RestoreOutcome, RestoreTarget, SessionError, SessionRecord,
    SessionStore, SessionValidation,
};
pub use tree::{
    is_hidden, ExplorerError, ExplorerIntent, ExplorerNode, ExplorerNodeId, ExplorerNodeKind,
    ExplorerRow, ExplorerTree,
};
