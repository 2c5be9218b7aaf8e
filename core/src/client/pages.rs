/// Markup parsing for the login page, notes overview and note fragments.
///
/// Nothing outside the client depends on the site's HTML layout.
use crate::error::{Result, WatchError};
use crate::records::{NoteFolder, NoteId};
use crate::utils::{render_body, selector};
use chrono::{Local, NaiveDateTime, TimeZone};
use scraper::{ElementRef, Html};

/// Absolute note timestamp, e.g. `Jun 9, 2014, 11:08:28 PM`
pub const NOTE_TIMESTAMP_FORMAT: &str = "%b %d, %Y, %I:%M:%S %p";

/// Hidden anti-forgery fields of the login form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginTokens {
    pub validate_token: String,
    pub validate_key: String,
}

pub fn login_tokens(html: &str) -> Result<LoginTokens> {
    let page = Html::parse_document(html);
    let form = page
        .select(&selector("form#form-login")?)
        .next()
        .ok_or_else(|| WatchError::Auth("unable to find login form on login page".to_string()))?;

    let hidden = |name: &str| -> Result<String> {
        let input = form
            .select(&selector(&format!("input[name=\"{}\"]", name))?)
            .next();
        input
            .and_then(|i| i.value().attr("value"))
            .map(str::to_string)
            .ok_or_else(|| {
                WatchError::Auth(format!(
                    "unable to fetch hidden field '{}' from the login form",
                    name
                ))
            })
    };

    Ok(LoginTokens {
        validate_token: hidden("validate_token")?,
        validate_key: hidden("validate_key")?,
    })
}

/// Folder links on the notes overview page
pub fn note_folders(html: &str) -> Result<Vec<NoteFolder>> {
    const CONTEXT: &str = "listing note folders";
    let page = Html::parse_document(html);
    let mut folders = Vec::new();

    for link in page.select(&selector("a.folder-link")?) {
        let attr = |name: &str| {
            link.value().attr(name).ok_or_else(|| {
                WatchError::parse(
                    CONTEXT,
                    format!("link tag '{}' has no '{}' attribute", link.html(), name),
                )
            })
        };

        let id = attr("data-folderid")?;
        let title = attr("title")?;
        let rel = attr("rel")?;

        // rel holds the displayed note count, e.g. "1,234"
        let count = rel
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .replace(',', "");
        let count = count.parse::<u64>().map_err(|_| {
            WatchError::parse(
                CONTEXT,
                format!("note count '{}' of link tag '{}' is not a number", rel, link.html()),
            )
        })?;

        let mut folder = NoteFolder::new(id, title);
        folder.site_note_count = Some(count);
        folders.push(folder);
    }

    Ok(folders)
}

/// Note ids listed on one `display_folder` page, in page order
pub fn folder_page_note_ids(html: &str, context: &str) -> Result<Vec<NoteId>> {
    let fragment = Html::parse_fragment(html);
    let details_sel = selector(".note-details")?;
    let link_sel = selector("span > a")?;
    let mut ids = Vec::new();

    for item in fragment.select(&selector("li.note")?) {
        let details = item.select(&details_sel).next().ok_or_else(|| {
            WatchError::parse(context, format!("no note details in:\n{}", item.html()))
        })?;
        let link = details.select(&link_sel).next().ok_or_else(|| {
            WatchError::parse(context, format!("no note details link in:\n{}", item.html()))
        })?;
        let id = link.value().attr("data-noteid").ok_or_else(|| {
            WatchError::parse(context, format!("no note id on details link in:\n{}", item.html()))
        })?;
        ids.push(NoteId::try_from(id)?);
    }

    Ok(ids)
}

/// Fields of a fully rendered note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteView {
    pub title: String,
    pub sender: String,
    pub ts: i64,
    pub text: String,
}

pub fn note_view(html: &str, context: &str) -> Result<NoteView> {
    let fragment = Html::parse_fragment(html);
    let missing = |what: &str| {
        WatchError::parse(context, format!("unable to obtain {} from note HTML:\n{}", what, html))
    };

    let title = first(&fragment, "span.mcb-title")?
        .ok_or_else(|| missing("note title"))?
        .text()
        .collect::<String>();

    let sender = first(&fragment, "span.mcb-from")?
        .ok_or_else(|| missing("note sender"))?
        .value()
        .attr("username")
        .ok_or_else(|| missing("note sender username"))?
        .to_string();

    let ts_span = first(&fragment, "span.mcb-ts")?.ok_or_else(|| missing("timestamp span"))?;
    let ts_title = ts_span
        .value()
        .attr("title")
        .ok_or_else(|| missing("timestamp title"))?;
    let ts_text = ts_span.text().collect::<String>();
    let ts = note_timestamp(ts_title, &ts_text, context)?;

    let body = first(&fragment, ".mcb-body.wrap-text")?.ok_or_else(|| missing("note text"))?;

    Ok(NoteView {
        title,
        sender,
        ts,
        text: render_body(body),
    })
}

fn first<'a>(fragment: &'a Html, css: &str) -> Result<Option<ElementRef<'a>>> {
    Ok(fragment.select(&selector(css)?).next())
}

/// Resolve a note's timestamp to UNIX seconds.
///
/// The `title` attribute normally carries the absolute time. Once it reads
/// like "2 hours ago" the absolute time is in the element text instead.
/// Only observed on English pages; other locales are unverified.
pub fn note_timestamp(title_attr: &str, element_text: &str, context: &str) -> Result<i64> {
    let raw = if title_attr.contains("ago") {
        element_text
    } else {
        title_attr
    };
    parse_timestamp(raw.trim(), context)
}

/// Parse an absolute note timestamp as local time
pub fn parse_timestamp(value: &str, context: &str) -> Result<i64> {
    let naive = NaiveDateTime::parse_from_str(value, NOTE_TIMESTAMP_FORMAT).map_err(|e| {
        WatchError::Timestamp {
            value: value.to_string(),
            context: context.to_string(),
            source: e,
        }
    })?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
        .ok_or_else(|| {
            WatchError::parse(context, format!("timestamp '{}' does not exist in local time", value))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::FolderId;

    const LOGIN_PAGE: &str = r#"<html><body>
        <form id="form-login" method="post">
          <input type="hidden" name="validate_token" value="tok123">
          <input type="hidden" name="validate_key" value="key456">
          <input name="username"><input name="password" type="password">
        </form></body></html>"#;

    #[test]
    fn test_login_tokens() {
        let tokens = login_tokens(LOGIN_PAGE).unwrap();
        assert_eq!(tokens.validate_token, "tok123");
        assert_eq!(tokens.validate_key, "key456");
    }

    #[test]
    fn test_login_form_missing() {
        let err = login_tokens("<html><body><form id='other'></form></body></html>").unwrap_err();
        assert!(matches!(err, WatchError::Auth(_)));
    }

    #[test]
    fn test_login_token_missing() {
        let html = r#"<form id="form-login"><input name="validate_token" value="t"></form>"#;
        let err = login_tokens(html).unwrap_err();
        assert!(err.to_string().contains("validate_key"));
    }

    #[test]
    fn test_note_folders() {
        let html = r#"<div>
            <a class="folder-link" data-folderid="1" title="Inbox" rel="1,234">Inbox</a>
            <a class="folder-link" data-folderid="unread" title="Unread" rel="7">Unread</a>
        </div>"#;
        let folders = note_folders(html).unwrap();
        assert_eq!(folders.len(), 2);
        assert_eq!(folders[0].id, FolderId::new("1"));
        assert_eq!(folders[0].site_note_count, Some(1234));
        assert_eq!(folders[1].title, "Unread");
        assert!(!folders[1].id.is_numeric());
    }

    #[test]
    fn test_note_folder_missing_attribute() {
        let html = r#"<a class="folder-link" data-folderid="1" rel="3">x</a>"#;
        let err = note_folders(html).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'title'"));
        assert!(msg.contains("folder-link"));
    }

    #[test]
    fn test_folder_page_note_ids() {
        let html = r#"<ul>
            <li class="note"><div class="note-details"><span><a data-noteid="11">a</a></span></div></li>
            <li class="note"><div class="note-details"><span><a data-noteid="12">b</a></span></div></li>
        </ul>"#;
        let ids = folder_page_note_ids(html, "test").unwrap();
        assert_eq!(ids, vec![NoteId::from(11), NoteId::from(12)]);
        assert!(folder_page_note_ids("<ul></ul>", "test").unwrap().is_empty());
    }

    #[test]
    fn test_folder_page_bad_note_id() {
        let html = r#"<li class="note"><div class="note-details"><span><a data-noteid="x1">a</a></span></div></li>"#;
        assert!(matches!(
            folder_page_note_ids(html, "test"),
            Err(WatchError::Identifier(_))
        ));
    }

    #[test]
    fn test_parse_timestamp_local() {
        let ts = parse_timestamp("Jun 9, 2014, 11:08:28 PM", "test").unwrap();
        let expected = Local
            .with_ymd_and_hms(2014, 6, 9, 23, 8, 28)
            .earliest()
            .unwrap()
            .timestamp();
        assert_eq!(ts, expected);
    }

    #[test]
    fn test_relative_title_falls_back_to_text() {
        let from_text = note_timestamp("3 days ago", "Jun 9, 2014, 11:08:28 PM", "test").unwrap();
        let direct = parse_timestamp("Jun 9, 2014, 11:08:28 PM", "test").unwrap();
        assert_eq!(from_text, direct);

        // A relative phrase is never parsed as a timestamp
        assert!(matches!(
            parse_timestamp("3 days ago", "test"),
            Err(WatchError::Timestamp { .. })
        ));
    }

    #[test]
    fn test_note_view() {
        let html = r#"<div>
            <span class="mcb-title">Hello there</span>
            <span class="mcb-from" username="alice">~alice</span>
            <span class="mcb-ts" title="Jun 9, 2014, 11:08:28 PM">Jun 9</span>
            <div class="mcb-body wrap-text">Line 1<br>Line 2 <a href="http://www.deviantart.com/users/outgoing?https://x.org">x.org</a></div>
        </div>"#;
        let view = note_view(html, "test").unwrap();
        assert_eq!(view.title, "Hello there");
        assert_eq!(view.sender, "alice");
        assert_eq!(view.text, "Line 1\nLine 2 https://x.org");
        assert_eq!(view.ts, parse_timestamp("Jun 9, 2014, 11:08:28 PM", "t").unwrap());
    }

    #[test]
    fn test_note_view_missing_sender_username() {
        let html = r#"<span class="mcb-title">t</span><span class="mcb-from">x</span>"#;
        let err = note_view(html, "fetching note 5 from folder 1").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("note sender username"));
        assert!(msg.contains("fetching note 5 from folder 1"));
    }
}
