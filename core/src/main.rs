/// devwatch - one-shot message center check
use std::env;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Logs go to stderr so the report on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    match devwatch_core::cli_app::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // {:?} prints the whole cause chain
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}
