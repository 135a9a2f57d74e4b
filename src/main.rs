//! repoman - APT repository source manager

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = repoman::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
