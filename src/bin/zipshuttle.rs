use zipshuttle::cli::start;
use zipshuttle::driver;
use zipshuttle::error::AppError;

#[tokio::main]
async fn main() {
    let config = match start::start() {
        Ok(config) => config,
        Err(err) => exit_with(&err),
    };

    match driver::run(config).await {
        Ok(()) => log::info!("done"),
        Err(err) => exit_with(&err),
    }
}

/// Exits the process with the error's exit code, matching the original
/// tool's use of plain process-exit status values (400/401/500/502/
/// 503/504); the OS truncates to a byte the same way `os.Exit` does.
fn exit_with(err: &AppError) -> ! {
    eprintln!("error: {err}");
    std::process::exit(err.exit_code());
}
