mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    match CliCommand::run_from_args().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("harvest error: {:#}", err);
            std::process::exit(1);
        }
    }
}
