use clap::Parser;
use journal_cli::cli::Cli;
use journal_logging::{JournalSubscriberBuilder, LogConfig};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _guard = JournalSubscriberBuilder::new()
        .with_config(LogConfig::default())
        .with_level(&cli.log_level)
        .init();

    let stdout = std::io::stdout();
    journal_cli::run(&cli, &mut stdout.lock())
}
