/// Message center view results (`MessageCenter;get_views`)
use crate::error::{Result, WatchError};
use crate::records::{Comment, Deviation, LooseInt, Note, NoteId};
use crate::utils::extract_text;
use serde::Deserialize;
use serde_json::Value;

/// One item of a view
#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    pub(crate) msgid: LooseInt,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub who: String,
    pub(crate) ts: LooseInt,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub username: String,
}

impl Hit {
    fn numeric_id(&self) -> Result<u64> {
        self.msgid.as_u64("message id")
    }

    /// Comments and replies share the same shape
    pub fn to_comment(&self) -> Result<Comment> {
        Ok(Comment::new(
            self.numeric_id()?,
            extract_text(&self.title, true),
            extract_text(&self.who, true),
            self.ts.as_i64("timestamp")?,
            self.url.clone(),
            extract_text(&self.body, false),
        ))
    }

    pub fn to_note(&self) -> Result<Note> {
        Ok(Note::new(
            NoteId::from(self.numeric_id()?),
            extract_text(&self.title, true),
            extract_text(&self.who, true),
            self.ts.as_i64("timestamp")?,
        ))
    }

    pub fn to_deviation(&self) -> Result<Deviation> {
        Deviation::new(
            self.msgid.as_string(),
            extract_text(&self.title, true),
            self.ts.as_i64("timestamp")?,
            self.url.clone(),
            extract_text(&self.username, true),
        )
    }
}

/// `content[0].result` of a view call
#[derive(Debug, Clone, Deserialize)]
pub struct ViewResult {
    /// Total reported by the site, may exceed `hits.len()`
    pub(crate) count: LooseInt,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct ViewContent {
    result: ViewResult,
}

impl ViewResult {
    pub fn from_content(content: &Value, context: &str) -> Result<Self> {
        let first = content
            .get(0)
            .ok_or_else(|| WatchError::parse(context, "view content is empty"))?;
        let parsed: ViewContent = serde_json::from_value(first.clone())
            .map_err(|e| WatchError::parse(context, format!("unexpected view layout: {}", e)))?;
        Ok(parsed.result)
    }

    pub fn count(&self) -> Result<u64> {
        self.count.as_u64("result count")
    }

    pub fn comments(&self) -> Result<Vec<Comment>> {
        self.hits.iter().map(Hit::to_comment).collect()
    }

    pub fn notes(&self) -> Result<Vec<Note>> {
        self.hits.iter().map(Hit::to_note).collect()
    }

    pub fn deviations(&self) -> Result<Vec<Deviation>> {
        self.hits.iter().map(Hit::to_deviation).collect()
    }
}
