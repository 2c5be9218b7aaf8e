/// DiFi: the site's batched RPC dispatch endpoint
pub mod envelope;
pub mod views;

pub use envelope::{validate, CallIndices, Envelope};
pub use views::{Hit, ViewResult};

use crate::records::FolderId;

/// Items requested per message center view. The backend caps a view
/// somewhere between 101 and 150 items.
pub const VIEW_PAGE_SIZE: u32 = 100;

/// Notes per `display_folder` page
pub const NOTES_PAGE_SIZE: u32 = 25;

/// `c[]` descriptor listing message center folders
pub fn get_folders_call() -> String {
    "MessageCenter;get_folders".to_string()
}

/// `c[]` descriptor for one message center view of the inbox
pub fn get_views_call(inbox_id: &str, view: &str) -> String {
    format!(
        "MessageCenter;get_views;{},oq:{}:0:{}:f{}",
        inbox_id,
        view,
        VIEW_PAGE_SIZE,
        if view == "devwatch" { ":tg=deviations" } else { "" }
    )
}

/// `c[]` descriptor rendering one page of a notes folder
pub fn display_folder_call(folder: &FolderId, offset: u32) -> String {
    format!("\"Notes\",\"display_folder\",[{},{},0]", folder.rpc_arg(), offset)
}

/// `c[]` descriptor rendering a single note
pub fn display_note_call(folder: &FolderId, note_id: u64) -> String {
    format!("\"Notes\",\"display_note\",[{},{}]", folder.rpc_arg(), note_id)
}

/// Request parameters for a batch: one `c[]` per call plus `t=json`
pub fn batch_params(calls: &[String]) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = calls
        .iter()
        .map(|c| ("c[]".to_string(), c.clone()))
        .collect();
    params.push(("t".to_string(), "json".to_string()));
    params
}
