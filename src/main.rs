//! Binary entrypoint that launches the site server.

use std::process::ExitCode;

use agritrade_site::start_agritrade_site;

/// Start the server with configuration taken from the environment.
fn main() -> ExitCode {
    start_agritrade_site::run()
}
