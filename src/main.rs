use clap::Parser;
use taskdeck::cli::commands::Cli;
use taskdeck::cli::handlers;
use taskdeck::tracing_setup;

fn main() {
    tracing_setup::init_tracing();
    let cli = Cli::parse();

    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
