use imagegen_core::logging::{LoggingDestination, init_logging};

#[tokio::main]
async fn main() {
    if let Err(err) = init_logging(LoggingDestination::FileAndStderr) {
        eprintln!("Warning: logging disabled: {err}");
    }

    if let Err(err) = imagegen_cli::run().await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
