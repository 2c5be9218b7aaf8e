/// Message center records
///
/// Every record is identified by a single key: equality and hashing only look
/// at that key, so collections of records can be diffed as sets.
use crate::error::{Result, WatchError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Comment on one of the account's deviations, or a reply notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "ID")]
    pub id: u64,

    /// Description of the page the comment was posted on
    pub title: String,

    pub who: String,

    /// UNIX timestamp
    pub ts: i64,

    #[serde(rename = "URL")]
    pub url: String,

    pub body: String,
}

impl Comment {
    pub fn new(
        id: u64,
        title: impl Into<String>,
        who: impl Into<String>,
        ts: i64,
        url: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            who: who.into(),
            ts,
            url: url.into(),
            body: body.into(),
        }
    }

    pub fn key(&self) -> u64 {
        self.id
    }
}

impl PartialEq for Comment {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Comment {}

impl Hash for Comment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// New submission from a watched account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "DeviationFields")]
pub struct Deviation {
    /// Raw compound id as reported by the site ("<n>:<n>")
    #[serde(rename = "ID")]
    pub id: String,

    pub title: String,
    pub ts: i64,

    #[serde(rename = "URL")]
    pub url: String,

    pub username: String,

    #[serde(skip)]
    key: u64,
}

impl Deviation {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        ts: i64,
        url: impl Into<String>,
        username: impl Into<String>,
    ) -> Result<Self> {
        let id = id.into();
        let key = deviation_key(&id)?;
        Ok(Self {
            id,
            title: title.into(),
            ts,
            url: url.into(),
            username: username.into(),
            key,
        })
    }

    pub fn key(&self) -> u64 {
        self.key
    }
}

fn deviation_key(id: &str) -> Result<u64> {
    id.split(':')
        .nth(1)
        .and_then(|n| n.parse::<u64>().ok())
        .ok_or_else(|| {
            WatchError::Identifier(format!(
                "deviation id '{}' is not of the form <number>:<number>",
                id
            ))
        })
}

#[derive(Deserialize)]
struct DeviationFields {
    #[serde(rename = "ID")]
    id: String,
    title: String,
    ts: i64,
    #[serde(rename = "URL")]
    url: String,
    username: String,
}

impl TryFrom<DeviationFields> for Deviation {
    type Error = WatchError;

    fn try_from(f: DeviationFields) -> Result<Self> {
        Deviation::new(f.id, f.title, f.ts, f.url, f.username)
    }
}

impl PartialEq for Deviation {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Deviation {}

impl Hash for Deviation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// Numeric note id; the site hands these out as strings or integers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "LooseInt", into = "u64")]
pub struct NoteId(u64);

impl NoteId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for NoteId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<NoteId> for u64 {
    fn from(id: NoteId) -> Self {
        id.0
    }
}

impl TryFrom<&str> for NoteId {
    type Error = WatchError;

    fn try_from(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(WatchError::Identifier(format!(
                "note id '{}' is not an integer",
                s
            )));
        }
        s.parse::<u64>()
            .map(NoteId)
            .map_err(|e| WatchError::Identifier(format!("note id '{}': {}", s, e)))
    }
}

impl std::str::FromStr for NoteId {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self> {
        NoteId::try_from(s)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Integer or numeric string; the backend and older state files use both
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum LooseInt {
    Int(i64),
    Str(String),
}

impl LooseInt {
    pub(crate) fn as_i64(&self, field: &str) -> Result<i64> {
        match self {
            LooseInt::Int(n) => Ok(*n),
            LooseInt::Str(s) => s.trim().parse::<i64>().map_err(|_| {
                WatchError::Identifier(format!("{} '{}' is not an integer", field, s))
            }),
        }
    }

    pub(crate) fn as_u64(&self, field: &str) -> Result<u64> {
        let n = self.as_i64(field)?;
        u64::try_from(n)
            .map_err(|_| WatchError::Identifier(format!("{} '{}' is negative", field, n)))
    }

    pub(crate) fn as_string(&self) -> String {
        match self {
            LooseInt::Int(n) => n.to_string(),
            LooseInt::Str(s) => s.clone(),
        }
    }
}

impl TryFrom<LooseInt> for NoteId {
    type Error = WatchError;

    fn try_from(raw: LooseInt) -> Result<Self> {
        match &raw {
            LooseInt::Int(_) => raw.as_u64("note id").map(NoteId),
            LooseInt::Str(s) => NoteId::try_from(s.as_str()),
        }
    }
}

/// Private note
///
/// A note can live in several folders; each fetched note is scoped to the
/// folder it was read from and no merging across folders is attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    #[serde(rename = "ID")]
    pub id: NoteId,

    pub title: String,
    pub who: String,
    pub ts: i64,

    /// Only known when the note was fetched individually
    #[serde(skip)]
    pub text: Option<String>,

    #[serde(skip)]
    pub folder_id: Option<FolderId>,
}

impl Note {
    pub fn new(id: NoteId, title: impl Into<String>, who: impl Into<String>, ts: i64) -> Self {
        Self {
            id,
            title: title.into(),
            who: who.into(),
            ts,
            text: None,
            folder_id: None,
        }
    }

    pub fn key(&self) -> u64 {
        self.id.get()
    }
}

impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Note {}

impl Hash for Note {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// Folder id: numeric for user folders, a word ("unread", "starred", ...) for
/// the built-in views
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderId(String);

impl FolderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_numeric(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit())
    }

    /// Form used inside DiFi call arguments. Sentinel ids must be quoted or
    /// the backend reads them as a class name.
    pub fn rpc_arg(&self) -> String {
        if self.is_numeric() {
            self.0.clone()
        } else {
            format!("\"{}\"", self.0)
        }
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for FolderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct NoteFolder {
    pub id: FolderId,
    pub title: String,

    /// Count shown by the site; a sanity check only, never authoritative
    pub site_note_count: Option<u64>,
}

impl NoteFolder {
    pub fn new(id: impl Into<FolderId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            site_note_count: None,
        }
    }
}

impl From<String> for FolderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq for NoteFolder {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NoteFolder {}

impl Hash for NoteFolder {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_comment_identity_ignores_other_fields() {
        let a = Comment::new(5, "Page", "alice", 100, "https://a", "hi");
        let b = Comment::new(5, "Other page", "bob", 200, "https://b", "edited");
        assert_eq!(a, b);

        let set: HashSet<Comment> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_note_id_from_string_matches_integer() {
        let from_str = NoteId::try_from("123").unwrap();
        assert_eq!(from_str, NoteId::from(123));

        let a = Note::new(from_str, "t", "w", 0);
        let b = Note::new(NoteId::from(123), "other", "x", 1);
        let set: HashSet<Note> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_note_id_rejects_non_numeric() {
        assert!(matches!(
            NoteId::try_from("abc"),
            Err(WatchError::Identifier(_))
        ));
        assert!(NoteId::try_from("").is_err());
        assert!(NoteId::try_from("-4").is_err());
    }

    #[test]
    fn test_deviation_key_from_compound_id() {
        let d = Deviation::new("12:4567", "Sunset", 0, "https://d", "carol").unwrap();
        assert_eq!(d.key(), 4567);
        assert_eq!(d.id, "12:4567");

        assert!(matches!(
            Deviation::new("4567", "x", 0, "u", "c"),
            Err(WatchError::Identifier(_))
        ));
    }

    #[test]
    fn test_deviation_deserialize_recomputes_key() {
        let json = r#"{"ID":"1:99","title":"t","ts":5,"URL":"u","username":"n"}"#;
        let d: Deviation = serde_json::from_str(json).unwrap();
        assert_eq!(d.key(), 99);
    }

    #[test]
    fn test_note_deserialize_accepts_string_id() {
        let json = r#"{"ID":"42","title":"t","who":"w","ts":1}"#;
        let n: Note = serde_json::from_str(json).unwrap();
        assert_eq!(n.key(), 42);
        assert!(n.text.is_none());

        let out = serde_json::to_value(&n).unwrap();
        assert_eq!(out["ID"], 42);
        assert!(out.get("text").is_none());
    }

    #[test]
    fn test_loose_int_forms() {
        let parse = |raw: &str| serde_json::from_str::<LooseInt>(raw).unwrap();
        assert_eq!(parse("17").as_u64("count").unwrap(), 17);
        assert_eq!(parse("\" 17 \"").as_i64("count").unwrap(), 17);
        assert_eq!(parse("\"3:456\"").as_string(), "3:456");
        assert!(matches!(
            parse("-2").as_u64("count"),
            Err(WatchError::Identifier(_))
        ));

        let negative = serde_json::from_str::<Note>(r#"{"ID":-5,"title":"t","who":"w","ts":1}"#);
        assert!(negative.is_err());
    }

    #[test]
    fn test_folder_rpc_arg() {
        assert_eq!(FolderId::new("1234").rpc_arg(), "1234");
        assert_eq!(FolderId::new("unread").rpc_arg(), "\"unread\"");
    }
}
