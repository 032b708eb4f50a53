// comedy show booking board

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
	match gigbook::start_server().await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			tracing::error!("gigbook stopped: {e}");
			eprintln!("gigbook: {e}");
			ExitCode::FAILURE
		}
	}
}
