use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use varaforge::Config;
use varaforge::config::LogFormat;
use varaforge::cli::{self, Cli, Commands, Session};

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    // `config` and `paths` must work without (and must not create) a config file.
    let config = match cli.command {
        Commands::Config(_) | Commands::Paths => None,
        _ => Some(cli.load_config()),
    };

    init_logging(&cli, config.as_ref().and_then(|c| c.as_ref().ok()));

    match &cli.command {
        Commands::Config(args) => cli::config::run(args, cli.config.as_deref()),
        Commands::Paths => cli::paths::run(),
        Commands::Scaffold(args) => cli::scaffold::run(args, &session(&cli, config)?).await,
        Commands::Compile(args) => cli::compile::run(args, &session(&cli, config)?).await,
        Commands::Test(args) => cli::test::run(args, &session(&cli, config)?).await,
        Commands::Client(args) => cli::client::run(args, &session(&cli, config)?),
        Commands::Doctor => cli::doctor::run(&session(&cli, config)?).await,
    }
}

fn session(cli: &Cli, config: Option<Result<Config>>) -> Result<Session> {
    let config = config.unwrap_or_else(|| cli.load_config())?;
    cli.session(config)
}

/// `--verbose` beats `RUST_LOG`, which beats `logging.level` from config.
fn init_logging(cli: &Cli, config: Option<&Config>) {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        let level = config.map_or("info", |c| c.logging.level.as_str());
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.map(|c| c.logging.format).unwrap_or_default() {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
