use clap::Parser;
use frame_overlay::cli::commands::{cmd_position, cmd_qualify};
use frame_overlay::cli::config::{Cli, Commands, load_config};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref());
    let trace_file = config.resolve_trace_file(cli.trace_file.as_deref());

    let result = match &cli.command {
        Commands::Qualify { page } => cmd_qualify(page, cli.verbose).map(|_| ()),
        Commands::Position { scenario } => {
            cmd_position(scenario, &config, trace_file, cli.verbose).map(|_| ())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise the level follows `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
