/// Report delivery through a user-configured command
///
/// The command line is split shell-style but never run through a shell.
/// `%s` becomes the subject before splitting; `%m` is replaced inside each
/// fragment afterwards, so a message with quotes or newlines reaches the
/// program as one argument.
use crate::config::Config;
use crate::error::{Result, WatchError};
use crate::report::{Report, HEADLINE_PREFIX};
use colored::*;
use std::process::Command;
use tracing::{debug, error, warn};

/// Split `command` and substitute the subject and message placeholders
pub fn command_fragments(command: &str, subject: &str, message: &str) -> Result<Vec<String>> {
    let command = command.replace("%s", subject);
    let fragments = shlex::split(&command)
        .ok_or_else(|| WatchError::Config(format!("unable to split command '{}'", command)))?;
    if fragments.is_empty() {
        return Err(WatchError::Config("command to run is empty".to_string()));
    }
    Ok(fragments
        .into_iter()
        .map(|fragment| fragment.replace("%m", message))
        .collect())
}

/// Check a configured command line before it is needed
pub fn validate_command(command: &str) -> Result<()> {
    command_fragments(command, "", "").map(|_| ())
}

/// Run the program directly and wait for it. A non-zero exit is logged,
/// not treated as an error.
pub fn run_command(fragments: &[String]) -> Result<()> {
    let (program, args) = fragments
        .split_first()
        .ok_or_else(|| WatchError::Config("command to run is empty".to_string()))?;

    debug!("Running notification command {:?}", program);
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|e| WatchError::Notify {
            command: program.clone(),
            source: e,
        })?;

    if !status.success() {
        warn!("Notification command {:?} exited with {}", program, status);
    }
    Ok(())
}

/// Hand the report to `command_to_run`, or print it when none is set
pub fn deliver_report(config: &Config, report: &Report) -> Result<()> {
    match &config.command_to_run {
        Some(command) => {
            let fragments = command_fragments(command, &report.headline, &report.content)?;
            run_command(&fragments)
        }
        None => {
            println!("{}", report.headline.bright_white().bold());
            println!();
            println!("{}", report.content);
            Ok(())
        }
    }
}

/// Pass a failure to `command_to_run_on_failure`, if configured. Problems
/// running it are only logged; the run still fails with its own error.
pub fn report_failure(config: &Config, message: &str) {
    let Some(command) = &config.command_to_run_on_failure else {
        return;
    };

    let subject = format!("{} Error", HEADLINE_PREFIX);
    let outcome = command_fragments(command, &subject, message).and_then(|f| run_command(&f));
    if let Err(e) = outcome {
        error!("Calling the command to run on failure failed: {}", e);
    }
}
