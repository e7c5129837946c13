use anyhow::Result;
use gatehouse::cli::{self, actions::Action};

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    // Start the program
    let action = cli::start()?;

    // Handle the action
    match action {
        Action::Server(args) => cli::actions::server::execute(*args).await?,
    }

    cli::telemetry::shutdown_tracer();

    Ok(())
}
