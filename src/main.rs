//! bargain-client - plays a bargaining game against a remote server.

use std::process::ExitCode;

use bargain_client::cli::Cli;
use bargain_client::BargainError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("bargain-client: {:#}", e);
            let code = e
                .downcast_ref::<BargainError>()
                .map(BargainError::exit_code)
                .unwrap_or(1);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
