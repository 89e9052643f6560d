//! Tracing subscriber setup for both commands.
//!
//! `-v` raises the level from INFO to DEBUG, `-vv` to TRACE. `RUST_LOG` is
//! honoured on top of that. HTTP plumbing stays at INFO unless the third
//! `-v` is given.

use thiserror::Error;
use tracing_subscriber::filter::{EnvFilter, LevelFilter, ParseError};
use tracing_subscriber::fmt::Subscriber;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("invalid log directive: {0}")]
    Directive(#[from] ParseError),
    #[error("logging already initialized: {0}")]
    Init(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Level for a `-v` count.
pub fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn create_filter(verbose: u8) -> Result<EnvFilter, LoggingError> {
    let mut filter = EnvFilter::from_default_env().add_directive(level_for(verbose).into());

    if verbose < 3 {
        for directive in [
            "hyper=info",
            "hyper_util=info",
            "h2=info",
            "reqwest=info",
            "tower=info",
        ] {
            filter = filter.add_directive(directive.parse()?);
        }
    }

    Ok(filter)
}

/// Install the global subscriber, writing to stderr so stdout stays free
/// for command output.
pub fn init(verbose: u8) -> Result<(), LoggingError> {
    let subscriber = Subscriber::builder()
        .with_env_filter(create_filter(verbose)?)
        .with_writer(std::io::stderr)
        .with_target(verbose > 0)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
