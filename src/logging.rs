use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Server default when `RUST_LOG` is unset
const SERVER_DIRECTIVES: &str = "info,fund_catalog=debug";

fn cli_directives(verbose: bool) -> &'static str {
    if verbose {
        "fund_catalog=debug,warn"
    } else {
        "off"
    }
}

/// CLI logging on stderr: silent unless `--verbose` or `RUST_LOG` says otherwise
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli_directives(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false).without_time())
        .init();
}

pub fn init_server_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(SERVER_DIRECTIVES));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}
