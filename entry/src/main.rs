/// makoview: per-site RNA modification lookup
///
/// This is the entry point for the makoview CLI.
/// It parses the CLI arguments and runs one of
/// three subcommands:
/// - positions
/// - search
/// - explore
///
/// `positions` and `search` run a single lookup against the
/// differential-results ('sites') and modification ('reads')
/// SQLite files; `explore` keeps a session open and reads
/// one query per line from stdin.
///
/// To get help on the subcommands, you can run:
///
/// ```shell
/// makoview search --help
/// ```
///
use clap::Parser;
use log::{error, info, Level};
use makoview::{run, Cli, Commands};
use simple_logger::init_with_level;

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap();
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Explore(_)) {
        init();
    }

    run(cli).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();
    info!("Elapsed time: {:?}", elapsed);
}

fn init() {
    let message = format!(
        r#"

        makoview: per-site RNA modification lookup

        type a transcript id to list its positions,
        or '<transcript_id> <position>' to summarise
        the reads behind that site. 'quit' or 'exit'
        ends the session.

        > version: {}

        "#,
        config::VERSION
    );

    println!("{}", message);
}
