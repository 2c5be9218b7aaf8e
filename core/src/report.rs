/// Human-readable summaries of new message center items
use crate::config::Config;
use crate::delta::{Category, NewItems};

/// Leads every notification subject
pub const HEADLINE_PREFIX: &str = "[devwatch]";

/// Summary of one category's new items
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// e.g. "New Comments"; empty when there is nothing new
    pub title: String,
    pub body: String,
    /// Users involved, in order of first appearance
    pub users: Vec<String>,
}

impl Summary {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
    }
}

/// Group consecutive entries under a heading whenever the heading changes
fn grouped<'a>(entries: impl Iterator<Item = (String, String, &'a str)>) -> (String, Vec<String>) {
    let mut current: Option<String> = None;
    let mut lines = Vec::new();
    let mut users: Vec<String> = Vec::new();

    for (heading, line, user) in entries {
        if current.as_deref() != Some(heading.as_str()) {
            lines.push(format!("\n{}\n", heading));
            current = Some(heading);
        }
        lines.push(line);
        if !users.iter().any(|u| u == user) {
            users.push(user.to_string());
        }
    }

    (lines.join("\n"), users)
}

pub fn summarise(items: &NewItems) -> Summary {
    if items.is_empty() {
        return Summary::default();
    }

    let (title, (body, users)) = match items {
        NewItems::Comments(set) | NewItems::Replies(set) => {
            let mut comments: Vec<_> = set.iter().collect();
            comments.sort_by(|a, b| {
                (&a.title, a.ts, &a.who, &a.body).cmp(&(&b.title, b.ts, &b.who, &b.body))
            });
            let title = if items.category() == Category::Comments {
                "New Comments"
            } else {
                "New Replies"
            };
            (
                title,
                grouped(comments.into_iter().map(|c| {
                    (
                        format!("On {}:", c.title),
                        format!("{} posted:\n{}", c.who, c.body),
                        c.who.as_str(),
                    )
                })),
            )
        }
        NewItems::UnreadNotes(set) => {
            let mut notes: Vec<_> = set.iter().collect();
            notes.sort_by(|a, b| (&a.who, &a.title).cmp(&(&b.who, &b.title)));
            (
                "New Unread Notes",
                grouped(
                    notes
                        .into_iter()
                        .map(|n| (format!("{} sent:", n.who), n.title.clone(), n.who.as_str())),
                ),
            )
        }
        NewItems::Deviations(set) => {
            let mut deviations: Vec<_> = set.iter().collect();
            deviations.sort_by_key(|d| (d.username.to_lowercase(), d.title.to_lowercase()));
            (
                "New Deviations",
                grouped(deviations.into_iter().map(|d| {
                    (format!("{}:", d.username), d.title.clone(), d.username.as_str())
                })),
            )
        }
    };

    Summary {
        title: title.to_string(),
        body,
        users,
    }
}

/// Whitelist filter: a whitelisted category is only reported when one of its
/// users is on the whitelist
pub fn passes_whitelist(summary: &Summary, category: Category, config: &Config) -> bool {
    if !config.whitelist_applies_to(category) {
        return true;
    }
    summary
        .users
        .iter()
        .any(|u| config.notification_whitelist.contains(u))
}

/// Final notification text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// "[devwatch] New Deviations, New Comments"
    pub headline: String,
    pub content: String,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Assemble the report from per-category deltas. Sections are ordered
/// deviations, unread notes, replies, comments.
pub fn build_report(new_items: &[NewItems], config: &Config) -> Report {
    const ORDER: [Category; 4] = [
        Category::Deviations,
        Category::UnreadNotes,
        Category::Replies,
        Category::Comments,
    ];

    let mut titles = Vec::new();
    let mut sections = Vec::new();

    for category in ORDER {
        for items in new_items.iter().filter(|i| i.category() == category) {
            let summary = summarise(items);
            if summary.is_empty() {
                continue;
            }
            titles.push(summary.title.clone());
            if passes_whitelist(&summary, category, config) {
                sections.push(format!("{}:\n{}", summary.title, summary.body));
            }
        }
    }

    if sections.is_empty() {
        return Report::default();
    }

    Report {
        headline: format!("{} {}", HEADLINE_PREFIX, titles.join(", ")),
        content: sections.join("\n\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Comment, Deviation, Note, NoteId};
    use std::collections::HashSet;

    fn comments(items: Vec<Comment>) -> NewItems {
        NewItems::Comments(items.into_iter().collect::<HashSet<_>>())
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarise(&NewItems::Replies(HashSet::new()));
        assert!(summary.is_empty());
        assert!(summary.users.is_empty());
    }

    #[test]
    fn test_comment_summary_groups_by_title() {
        let items = comments(vec![
            Comment::new(1, "Sunset", "bob", 2, "u", "nice"),
            Comment::new(2, "Sunset", "alice", 1, "u", "wow"),
            Comment::new(3, "Forest", "alice", 3, "u", "green"),
        ]);
        let summary = summarise(&items);
        assert_eq!(summary.title, "New Comments");
        assert_eq!(
            summary.body,
            "\nOn Forest:\n\nalice posted:\ngreen\n\nOn Sunset:\n\nalice posted:\nwow\nbob posted:\nnice"
        );
        assert_eq!(summary.users, vec!["alice", "bob"]);
    }

    #[test]
    fn test_note_and_deviation_summaries() {
        let notes = NewItems::UnreadNotes(
            [Note::new(NoteId::from(1), "Hi", "zed", 0)].into_iter().collect(),
        );
        let summary = summarise(&notes);
        assert_eq!(summary.title, "New Unread Notes");
        assert_eq!(summary.body, "\nzed sent:\n\nHi");

        let devs = NewItems::Deviations(
            [
                Deviation::new("1:2", "b-side", 0, "u", "Carol").unwrap(),
                Deviation::new("1:3", "A-side", 0, "u", "carol").unwrap(),
            ]
            .into_iter()
            .collect(),
        );
        let summary = summarise(&devs);
        assert_eq!(summary.title, "New Deviations");
        assert!(summary.body.starts_with("\ncarol:\n\nA-side"));
    }

    #[test]
    fn test_whitelist_suppresses_section() {
        let mut config = Config::default();
        config.notification_whitelist = vec!["alice".to_string()];
        config.apply_whitelist_to = vec![Category::Comments];

        let items = vec![
            comments(vec![Comment::new(1, "T", "mallory", 0, "u", "spam")]),
            NewItems::Deviations(
                [Deviation::new("1:2", "Art", 0, "u", "dave").unwrap()]
                    .into_iter()
                    .collect(),
            ),
        ];
        let report = build_report(&items, &config);
        assert!(report.content.starts_with("New Deviations:"));
        assert!(!report.content.contains("mallory"));

        let items = vec![comments(vec![Comment::new(1, "T", "alice", 0, "u", "hi")])];
        let report = build_report(&items, &config);
        assert!(report.content.contains("alice posted"));
        assert_eq!(report.headline, "[devwatch] New Comments");
    }

    #[test]
    fn test_nothing_new_is_empty_report() {
        let config = Config::default();
        let report = build_report(&[comments(vec![])], &config);
        assert!(report.is_empty());
    }
}
