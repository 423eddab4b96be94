use clap::Parser;
use perpwatch::adapter::inbound::cli::command::{CheckCommand, Cli, Commands, CursorCommand};
use perpwatch::adapter::inbound::cli::output::{self, OutputConfig};
use perpwatch::adapter::inbound::cli::{check, cursor, run};

#[tokio::main]
async fn main() {
    // Both reqwest and tokio-tungstenite pull in rustls; pick the provider once.
    let _ = rustls::crypto::ring::default_provider().install_default();
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    output::configure(OutputConfig::new(cli.json, cli.quiet));

    let result = match &cli.command {
        Commands::Run(args) => run::execute(args).await,
        Commands::Check(CheckCommand::Config(args)) => check::execute_config(&args.config),
        Commands::Cursor(CursorCommand::Show(args)) => cursor::execute_show(&args.config).await,
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
