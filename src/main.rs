use clap::Parser;
use subconv::cli::Cli;

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();
    args.run()
}
