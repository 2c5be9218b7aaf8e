/// devwatch - message center watcher
///
/// Logs into a DeviantArt account, fetches comments, replies, unread notes
/// and watched deviations, keeps the last snapshot on disk and reports what
/// is new since the previous run, either printed or handed to a
/// configured command. Note folders can also be enumerated and
/// read in full.

pub mod error;
pub mod config;
pub mod records;
pub mod utils;
pub mod difi;
pub mod client;
pub mod state_store;
pub mod delta;
pub mod report;
pub mod notify;
pub mod cli_app;

pub use error::{Result, WatchError};
pub use config::Config;
pub use client::{HttpTransport, SessionClient, Transport};
pub use delta::{get_new, get_new_by_name, Category, NewItems};
pub use records::{Comment, Deviation, FolderId, Note, NoteFolder, NoteId};
pub use state_store::{AccountSnapshot, Generation, StateStore};
