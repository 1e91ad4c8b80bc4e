pub mod local;

use crate::error::{Error, Result};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tracing::error;

pub use local::LocalSourceControl;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceControlState {
    /// No provider: requests go straight to the filesystem.
    Disabled,
    Active,
    /// A provider is selected but cannot work (missing executable, bad credentials).
    ConfigurationInvalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceControlStatus {
    Unknown,
    OpSuccess,
    OpFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceControlFlag {
    Writable,
    PendingDelete,
    OpenByUser,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceControlFlags {
    pub writable: bool,
    pub pending_delete: bool,
    pub open_by_user: bool,
}

impl SourceControlFlags {
    pub fn has(&self, flag: SourceControlFlag) -> bool {
        match flag {
            SourceControlFlag::Writable => self.writable,
            SourceControlFlag::PendingDelete => self.pending_delete,
            SourceControlFlag::OpenByUser => self.open_by_user,
        }
    }
}

/// Per-file record in a source control response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceControlFileInfo {
    pub path: String,
    pub status: SourceControlStatus,
    pub flags: SourceControlFlags,
}

impl SourceControlFileInfo {
    pub fn has_flag(&self, flag: SourceControlFlag) -> bool {
        self.flags.has(flag)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScResponse {
    pub success: bool,
    pub files: Vec<SourceControlFileInfo>,
}

/// Receiving end of a request that completes on another thread.
pub type Pending = Receiver<ScResponse>;

/// Creates the channel a provider answers on.
pub fn pending() -> (Sender<ScResponse>, Pending) {
    mpsc::channel()
}

/// Bulk source control operations. Paths may contain `*` wildcards, which match across
/// directory levels.
pub trait SourceControl: Send + Sync {
    fn state(&self) -> SourceControlState;

    fn is_active(&self) -> bool {
        self.state() == SourceControlState::Active
    }

    fn is_valid(&self) -> bool {
        self.state() != SourceControlState::ConfigurationInvalid
    }

    fn get_bulk_file_info(&self, paths: &[String]) -> Pending;

    /// Renames every file matched by `from` to the corresponding location in `to`. Responses
    /// carry the destination paths.
    fn rename_bulk(&self, from: &str, to: &str) -> Pending;

    /// Responses carry the deleted paths.
    fn delete_bulk(&self, pattern: &str) -> Pending;

    /// Marks files for edit ahead of rewriting them.
    fn edit_bulk(&self, paths: &[String]) -> Pending;
}

/// Blocks until the provider answers or `timeout` expires.
pub fn wait_for_response(pending: &Pending, timeout: Duration) -> Result<ScResponse> {
    match pending.recv_timeout(timeout) {
        Ok(response) => Ok(response),
        Err(RecvTimeoutError::Timeout) => {
            error!("Timed out waiting for response from source control");
            Err(Error::Timeout(timeout))
        }
        Err(RecvTimeoutError::Disconnected) => Err(Error::SourceControl(
            "request was dropped without a response".to_string(),
        )),
    }
}
