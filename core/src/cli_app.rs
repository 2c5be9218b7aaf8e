use crate::client::SessionClient;
use crate::config::Config;
use crate::delta::{get_new, Category};
use crate::notify;
use crate::records::{FolderId, Note};
use crate::report::build_report;
use crate::state_store::StateStore;
use anyhow::{bail, Context};
use colored::*;
use std::path::PathBuf;
use tracing::info;

/// Global flags accepted before or after the command
#[derive(Debug, Default)]
struct Options {
    config: Option<PathBuf>,
    state_file: Option<PathBuf>,
    positional: Vec<String>,
}

fn parse_options(args: &[String]) -> anyhow::Result<Options> {
    let mut options = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = iter.next().context("--config needs a path")?;
                options.config = Some(PathBuf::from(value));
            }
            "--state-file" => {
                let value = iter.next().context("--state-file needs a path")?;
                options.state_file = Some(PathBuf::from(value));
            }
            _ => options.positional.push(arg.clone()),
        }
    }

    Ok(options)
}

/// Entry point of the `devwatch` binary. `args` includes the program name.
pub fn run(args: Vec<String>) -> anyhow::Result<()> {
    let bin = args
        .first()
        .map(|s| s.as_str())
        .unwrap_or("devwatch")
        .to_string();

    let options = parse_options(args.get(1..).unwrap_or_default())?;
    let command = options
        .positional
        .first()
        .map(String::as_str)
        .unwrap_or("check");

    if matches!(command, "help" | "--help" | "-h") {
        print_usage(&bin);
        return Ok(());
    }

    let mut config = Config::load(options.config.as_deref()).context("Loading configuration")?;
    if let Some(state_file) = &options.state_file {
        config.state_file = state_file.clone();
    }

    let outcome = dispatch(command, &options, &config, &bin);
    if let Err(e) = &outcome {
        notify::report_failure(&config, &format!("{:?}", e));
    }
    outcome
}

fn dispatch(command: &str, options: &Options, config: &Config, bin: &str) -> anyhow::Result<()> {
    match command {
        "check" => check(config)?,
        "folders" => list_folders(config)?,
        "audit" => {
            let Some(folder) = options.positional.get(1) else {
                eprintln!("{}", format!("Usage: {} audit <folder_id>", bin).yellow());
                bail!("missing folder id");
            };
            audit_folder(config, &FolderId::from(folder.as_str()))?;
        }
        "notes" => {
            let Some(folder) = options.positional.get(1) else {
                eprintln!("{}", format!("Usage: {} notes <folder_id> [offset]", bin).yellow());
                bail!("missing folder id");
            };
            let offset = match options.positional.get(2) {
                Some(raw) => raw
                    .parse::<u32>()
                    .with_context(|| format!("offset '{}' is not a number", raw))?,
                None => 0,
            };
            show_notes(config, &FolderId::from(folder.as_str()), offset)?;
        }
        other => {
            eprintln!("{} Unknown command: {}", "✗".red().bold(), other.red());
            print_usage(bin);
            bail!("unknown command '{}'", other);
        }
    }

    Ok(())
}

fn print_usage(bin: &str) {
    println!("{}", "devwatch - message center watcher".bright_cyan().bold());
    println!();
    println!("{}", "Usage:".bright_white().bold());
    println!("  {} [--config <path>] [--state-file <path>] <command> [args]", bin.cyan());
    println!();
    println!("{}", "Commands:".bright_white().bold());
    println!("  {}                        Report new items since the last run (default)", "check".cyan());
    println!("  {}                      List note folders", "folders".cyan());
    println!("  {} <folder_id>            Compare stored notes with the site count", "audit".cyan());
    println!("  {} <folder_id> [offset]   Print one page of notes", "notes".cyan());
}

fn logged_in_client(config: &Config) -> anyhow::Result<SessionClient> {
    let mut client = SessionClient::from_config(config)?;
    client.login()?;
    Ok(client)
}

fn check(config: &Config) -> anyhow::Result<()> {
    let store = StateStore::new(&config.state_file);
    let mut snapshot = store.load()?;
    let mut client = logged_in_client(config)?;

    client.get_messages(&mut snapshot, &store)?;

    let new_items: Vec<_> = Category::ALL
        .into_iter()
        .map(|category| get_new(&snapshot, category))
        .collect();
    for items in &new_items {
        info!("{} new {}", items.len(), items.category());
    }

    let report = build_report(&new_items, config);
    if report.is_empty() {
        info!("Nothing new");
        return Ok(());
    }

    notify::deliver_report(config, &report)?;
    Ok(())
}

fn list_folders(config: &Config) -> anyhow::Result<()> {
    let mut client = logged_in_client(config)?;
    let folders = client.get_note_folders()?;

    if folders.is_empty() {
        println!("{}", "No note folders found".yellow());
        return Ok(());
    }

    println!("{}", "Note folders:".bright_white().bold());
    for folder in folders {
        let count = folder
            .site_note_count
            .map(|c| c.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!("  {} {} ({})", folder.id.to_string().cyan(), folder.title, count.dimmed());
    }
    Ok(())
}

fn audit_folder(config: &Config, folder_id: &FolderId) -> anyhow::Result<()> {
    let mut client = logged_in_client(config)?;

    let site_count = client
        .get_note_folders()?
        .into_iter()
        .find(|f| &f.id == folder_id)
        .and_then(|f| f.site_note_count);
    let ids = client.get_note_ids_in_folder(folder_id)?;

    println!(
        "{} Folder {}: {} notes enumerated",
        "✓".green(),
        folder_id.to_string().cyan(),
        ids.len()
    );

    match site_count {
        Some(expected) if expected == ids.len() as u64 => {
            println!("  Matches the site-reported count");
        }
        Some(expected) => {
            let diff = expected as i64 - ids.len() as i64;
            println!(
                "  {} site reports {} notes (difference {:+})",
                "⚠".yellow(),
                expected,
                diff
            );
        }
        None => println!("  {}", "No site-reported count for this folder".dimmed()),
    }
    Ok(())
}

fn show_notes(config: &Config, folder_id: &FolderId, offset: u32) -> anyhow::Result<()> {
    let mut client = logged_in_client(config)?;
    let notes = client.get_notes_in_folder(folder_id, offset)?;

    if notes.is_empty() {
        println!("{}", "No notes at this offset".yellow());
        return Ok(());
    }

    for note in &notes {
        print_note(note);
    }
    Ok(())
}

fn print_note(note: &Note) {
    println!(
        "{} {} {}",
        format!("#{}", note.id).cyan(),
        note.title.bright_white().bold(),
        format!("from {}", note.who).dimmed()
    );
    if let Some(text) = &note.text {
        println!("{}", text);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_options() {
        let options =
            parse_options(&args(&["--config", "/tmp/c.json", "notes", "1", "--state-file", "s.json", "25"]))
                .unwrap();
        assert_eq!(options.config, Some(PathBuf::from("/tmp/c.json")));
        assert_eq!(options.state_file, Some(PathBuf::from("s.json")));
        assert_eq!(options.positional, args(&["notes", "1", "25"]));
    }

    #[test]
    fn test_flag_without_value() {
        assert!(parse_options(&args(&["check", "--config"])).is_err());
    }
}
