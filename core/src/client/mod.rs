/// Authenticated session against the site's web backend
pub mod pages;
pub mod transport;

pub use transport::{HttpTransport, Transport};

use crate::config::{Config, Credentials, Endpoints};
use crate::difi::{self, Envelope, ViewResult, NOTES_PAGE_SIZE};
use crate::error::{Result, WatchError};
use crate::records::{FolderId, Note, NoteFolder, NoteId};
use crate::state_store::{AccountSnapshot, Generation, StateStore};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Call slots of the batched message center query
const COMMENTS_CALL: usize = 0;
const REPLIES_CALL: usize = 1;
const UNREAD_NOTES_CALL: usize = 2;
const DEVIATIONS_CALL: usize = 3;

const MESSAGE_VIEWS: [&str; 4] = ["fb_comments", "fb_replies", "notes_unread", "devwatch"];

/// Session cookie the note calls must echo back as the `ui` form field
const USERINFO_COOKIE: &str = "userinfo";

/// One login session. Owns the cookie state; never shared between threads.
pub struct SessionClient<T: Transport = HttpTransport> {
    transport: T,
    credentials: Credentials,
    endpoints: Endpoints,
    inbox_id: Option<String>,
    logged_in: bool,
}

impl SessionClient<HttpTransport> {
    /// Client over a real HTTP session configured from `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(config.request_timeout)?;
        Ok(Self::new(
            transport,
            config.credentials()?,
            config.endpoints.clone(),
        ))
    }
}

impl<T: Transport> SessionClient<T> {
    pub fn new(transport: T, credentials: Credentials, endpoints: Endpoints) -> Self {
        Self {
            transport,
            credentials,
            endpoints,
            inbox_id: None,
            logged_in: false,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Log in with the form's anti-forgery tokens; session cookies are kept
    /// for every later call.
    pub fn login(&mut self) -> Result<()> {
        self.logged_in = false;
        self.submit_login()
            .map_err(|e| WatchError::LoginFailed(Box::new(e)))?;
        self.logged_in = true;
        info!("Logged in as {}", self.credentials.username);
        Ok(())
    }

    fn submit_login(&mut self) -> Result<()> {
        let login_url = self.endpoints.login_url();
        let page = self
            .transport
            .get(&login_url)
            .map_err(|e| e.during("load the login page"))?;
        let tokens = pages::login_tokens(&page)?;

        let form = vec![
            ("username".to_string(), self.credentials.username.clone()),
            ("password".to_string(), self.credentials.password.clone()),
            ("validate_token".to_string(), tokens.validate_token),
            ("validate_key".to_string(), tokens.validate_key),
            ("remember_me".to_string(), "1".to_string()),
        ];
        self.transport
            .post_form(&login_url, &form)
            .map_err(|e| e.during("submit the login form"))?;
        Ok(())
    }

    fn require_login(&self, operation: &'static str) -> Result<()> {
        if self.logged_in {
            Ok(())
        } else {
            Err(WatchError::NotLoggedIn(operation))
        }
    }

    /// Issue message center calls (query-string POST) and check the
    /// addressed call slots
    fn message_center(&mut self, calls: &[String], context: &str) -> Result<Envelope> {
        let params = difi::batch_params(calls);
        let body = self
            .transport
            .post_query(&self.endpoints.difi_url(), &params)
            .map_err(|e| e.during(context))?;
        let envelope = Envelope::from_body(&body, context)?;
        if !difi::validate(&envelope, 0..calls.len()) {
            return Err(WatchError::Rpc {
                context: context.to_string(),
                response: body,
            });
        }
        Ok(envelope)
    }

    /// Issue a single notes call (form POST carrying the `ui` cookie)
    fn notes_call(&mut self, call: String, context: &str) -> Result<Envelope> {
        let difi_url = self.endpoints.difi_url();
        let ui = self.userinfo(&difi_url, context)?;
        let mut form = difi::batch_params(&[call]);
        form.push(("ui".to_string(), ui));

        let body = self
            .transport
            .post_form(&difi_url, &form)
            .map_err(|e| e.during(context))?;
        let envelope = Envelope::from_body(&body, context)?;
        if !difi::validate(&envelope, 0) {
            return Err(WatchError::Rpc {
                context: context.to_string(),
                response: body,
            });
        }
        Ok(envelope)
    }

    fn userinfo(&self, url: &str, context: &str) -> Result<String> {
        let raw = self.transport.cookie(url, USERINFO_COOKIE).ok_or_else(|| {
            WatchError::Auth(format!("no '{}' session cookie while {}", USERINFO_COOKIE, context))
        })?;
        urlencoding::decode(&raw)
            .map(|s| s.into_owned())
            .map_err(|e| WatchError::Auth(format!("malformed '{}' cookie: {}", USERINFO_COOKIE, e)))
    }

    /// Inbox folder id, fetched once per client
    fn inbox_id(&mut self) -> Result<String> {
        if let Some(id) = &self.inbox_id {
            return Ok(id.clone());
        }

        const CONTEXT: &str = "fetching the inbox folder id";
        let envelope = self.message_center(&[difi::get_folders_call()], CONTEXT)?;
        let folders = envelope
            .content(0)
            .and_then(Value::as_array)
            .ok_or_else(|| WatchError::parse(CONTEXT, "folder list missing from response"))?;

        let id = folders
            .iter()
            .find(|f| f.get("is_inbox").map(is_truthy).unwrap_or(false))
            .and_then(|f| f.get("folderid"))
            .and_then(|id| match id {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .ok_or_else(|| WatchError::parse(CONTEXT, "no message center folder is flagged as the inbox"))?;

        debug!("Inbox folder id: {}", id);
        self.inbox_id = Some(id.clone());
        Ok(id)
    }

    /// Fetch comments, replies, unread notes and watched deviations in one
    /// batch, rotate them into `snapshot` and persist it.
    pub fn get_messages(&mut self, snapshot: &mut AccountSnapshot, store: &StateStore) -> Result<()> {
        self.require_login("get_messages")?;
        let inbox_id = self.inbox_id()?;

        const CONTEXT: &str = "fetching comments, replies, unread notes and deviations";
        let calls: Vec<String> = MESSAGE_VIEWS
            .iter()
            .map(|view| difi::get_views_call(&inbox_id, view))
            .collect();
        let envelope = self.message_center(&calls, CONTEXT)?;

        let view = |index: usize| -> Result<ViewResult> {
            let content = envelope
                .content(index)
                .ok_or_else(|| WatchError::parse(CONTEXT, format!("call {} missing", index)))?;
            ViewResult::from_content(content, CONTEXT)
        };

        let comments = view(COMMENTS_CALL)?;
        let replies = view(REPLIES_CALL)?;
        let unread_notes = view(UNREAD_NOTES_CALL)?;
        let deviations = view(DEVIATIONS_CALL)?;

        let fetched = Generation {
            comments: comments.comments()?,
            comments_count: comments.count()?,
            replies: replies.comments()?,
            replies_count: replies.count()?,
            unread_notes: unread_notes.notes()?,
            unread_notes_count: unread_notes.count()?,
            deviations: deviations.deviations()?,
            deviations_count: deviations.count()?,
        };
        info!(
            "Fetched {} comments, {} replies, {} unread notes, {} deviations",
            fetched.comments_count,
            fetched.replies_count,
            fetched.unread_notes_count,
            fetched.deviations_count
        );

        snapshot.rotate(fetched);
        store.save(snapshot)
    }

    /// Folders listed on the notes overview page
    pub fn get_note_folders(&mut self) -> Result<Vec<NoteFolder>> {
        self.require_login("get_note_folders")?;
        let page = self
            .transport
            .get(&self.endpoints.notes_url())
            .map_err(|e| e.during("load the notes page"))?;
        pages::note_folders(&page)
    }

    fn folder_page(&mut self, folder: &FolderId, offset: u32) -> Result<Vec<NoteId>> {
        let context = format!("fetching notes from offset {} of folder '{}'", offset, folder);
        let envelope = self.notes_call(difi::display_folder_call(folder, offset), &context)?;
        pages::folder_page_note_ids(envelope.html_body(0, &context)?, &context)
    }

    /// Every note id in a folder, walking pages of 25 until one comes back
    /// empty. Used to audit the stored notes.
    pub fn get_note_ids_in_folder(&mut self, folder: &FolderId) -> Result<BTreeSet<NoteId>> {
        self.require_login("get_note_ids_in_folder")?;
        let mut ids = BTreeSet::new();
        let mut offset = 0;

        loop {
            let page = self.folder_page(folder, offset)?;
            if page.is_empty() {
                break;
            }
            debug!("Folder '{}' offset {}: {} notes", folder, offset, page.len());
            ids.extend(page);
            offset += NOTES_PAGE_SIZE;
        }

        Ok(ids)
    }

    /// Full rendering of a single note
    pub fn get_note_in_folder(&mut self, folder: &FolderId, note_id: NoteId) -> Result<Note> {
        self.require_login("get_note_in_folder")?;
        let context = format!("fetching note {} from folder '{}'", note_id, folder);
        let envelope = self.notes_call(difi::display_note_call(folder, note_id.get()), &context)?;
        let view = pages::note_view(envelope.html_body(0, &context)?, &context)?;

        let mut note = Note::new(note_id, view.title, view.sender, view.ts);
        note.text = Some(view.text);
        note.folder_id = Some(folder.clone());
        Ok(note)
    }

    /// One page (at most 25) of notes. Folder previews mangle links and line
    /// breaks, so each note is fetched again on its own.
    pub fn get_notes_in_folder(&mut self, folder: &FolderId, offset: u32) -> Result<Vec<Note>> {
        self.require_login("get_notes_in_folder")?;
        self.folder_page(folder, offset)?
            .into_iter()
            .map(|id| self.get_note_in_folder(folder, id))
            .collect()
    }
}

/// Truthiness of a loosely typed flag: any non-empty string counts, so
/// `"0"` is set
fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("1")));
        assert!(is_truthy(&json!("0")));
        assert!(is_truthy(&json!("false")));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!([])));
    }
}
