use std::process;

use clap::Parser;
use sheet_linker::Cli;

fn main() {
    // Logging is installed by the CLI once the settings file has been read
    let cli = Cli::parse();

    if let Err(e) = cli.execute() {
        eprintln!("Error: {e}");

        // Print the full error chain if available
        let mut source = e.source();
        while let Some(err) = source {
            eprintln!("  Caused by: {err}");
            source = err.source();
        }

        process::exit(1);
    }
}
