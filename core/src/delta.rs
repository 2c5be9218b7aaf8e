/// New-item detection between two snapshot generations
use crate::error::{Result, WatchError};
use crate::records::{Comment, Deviation, Note};
use crate::state_store::AccountSnapshot;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// Message center categories tracked by the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Comments,
    Replies,
    UnreadNotes,
    Deviations,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Comments,
        Category::Replies,
        Category::UnreadNotes,
        Category::Deviations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Comments => "comments",
            Category::Replies => "replies",
            Category::UnreadNotes => "unread_notes",
            Category::Deviations => "deviations",
        }
    }
}

impl FromStr for Category {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                WatchError::InvalidArgument(format!(
                    "unknown message category '{}' (expected comments, replies, unread_notes or deviations)",
                    s
                ))
            })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Items of one category absent from the previous generation
#[derive(Debug, Clone, PartialEq)]
pub enum NewItems {
    Comments(HashSet<Comment>),
    Replies(HashSet<Comment>),
    UnreadNotes(HashSet<Note>),
    Deviations(HashSet<Deviation>),
}

impl NewItems {
    pub fn category(&self) -> Category {
        match self {
            NewItems::Comments(_) => Category::Comments,
            NewItems::Replies(_) => Category::Replies,
            NewItems::UnreadNotes(_) => Category::UnreadNotes,
            NewItems::Deviations(_) => Category::Deviations,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            NewItems::Comments(s) | NewItems::Replies(s) => s.len(),
            NewItems::UnreadNotes(s) => s.len(),
            NewItems::Deviations(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn difference<T: Clone + Eq + Hash>(current: &[T], previous: &[T]) -> HashSet<T> {
    let previous: HashSet<&T> = previous.iter().collect();
    current
        .iter()
        .filter(|item| !previous.contains(item))
        .cloned()
        .collect()
}

/// current - previous for `category`
pub fn get_new(snapshot: &AccountSnapshot, category: Category) -> NewItems {
    let (cur, prev) = (&snapshot.current, &snapshot.previous);
    match category {
        Category::Comments => NewItems::Comments(difference(&cur.comments, &prev.comments)),
        Category::Replies => NewItems::Replies(difference(&cur.replies, &prev.replies)),
        Category::UnreadNotes => {
            NewItems::UnreadNotes(difference(&cur.unread_notes, &prev.unread_notes))
        }
        Category::Deviations => {
            NewItems::Deviations(difference(&cur.deviations, &prev.deviations))
        }
    }
}

/// Same as [`get_new`] with the category given by name
pub fn get_new_by_name(snapshot: &AccountSnapshot, category: &str) -> Result<NewItems> {
    Ok(get_new(snapshot, category.parse()?))
}
