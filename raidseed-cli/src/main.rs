use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use raidseed_core::{run, FinderReport, FinderSettings, GameVersion};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Game {
    Scarlet,
    Violet,
}

impl From<Game> for GameVersion {
    fn from(game: Game) -> Self {
        match game {
            Game::Scarlet => GameVersion::Scarlet,
            Game::Violet => GameVersion::Violet,
        }
    }
}

fn parse_seed(src: &str) -> Result<u32, String> {
    let res = if let Some(hex) = src.strip_prefix("0x").or_else(|| src.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        src.parse::<u32>()
    };
    res.map_err(|e| format!("invalid seed '{src}': {e}"))
}

#[derive(Debug, Parser)]
#[command(name = "raidseed", version, about = "Raid encounter seed checker")]
struct Args {
    /// Encounter table file, or a directory of tables.
    #[arg(long, required_unless_present = "settings")]
    input: Option<PathBuf>,

    /// First seed to check (decimal or 0x-prefixed hex).
    #[arg(long, value_parser = parse_seed, default_value = "0")]
    seed: u32,

    /// Number of consecutive seeds to check.
    #[arg(long, default_value_t = 1)]
    count: u64,

    #[arg(long, value_enum)]
    game: Option<Game>,

    #[arg(long)]
    stars: Option<u8>,

    #[arg(long)]
    stage: Option<usize>,

    /// Skip records with unknown enum bytes instead of failing the table.
    #[arg(long, default_value_t = false)]
    skip_malformed: bool,

    /// Print the report as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Load settings from a JSON file instead of the flags above.
    #[arg(long, value_name = "JSON")]
    settings: Option<PathBuf>,
}

fn init_logging(debug: bool) {
    let fallback = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &FinderReport) {
    for table in &report.tables {
        println!(
            "{} ({} records)",
            table.source.display(),
            table.record_count
        );
        if !table.skipped_records.is_empty() {
            println!("  skipped records: {:?}", table.skipped_records);
        }
        for hit in &table.hits {
            println!(
                "  seed {:08X}  stage {}  #{:<3} species {:>4}-{} {}*  id {:08X}",
                hit.seed, hit.stage, hit.record, hit.species, hit.form, hit.stars, hit.identifier
            );
        }
    }
    println!("{} hit(s)", report.total_hits());
}

fn main() {
    let args = Args::parse();

    let settings = match args.settings.as_ref() {
        Some(path) => match FinderSettings::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Failed to load settings {:?}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => FinderSettings {
            // clap enforces --input unless --settings was given.
            input_path: args.input.unwrap_or_default(),
            seed_start: args.seed,
            seed_count: args.count,
            game: args.game.map(GameVersion::from),
            stars: args.stars,
            stage: args.stage,
            skip_malformed: args.skip_malformed,
            debug: args.debug,
        },
    };

    init_logging(settings.debug || args.debug);
    tracing::debug!(?settings, "resolved settings");

    match run(&settings) {
        Ok(report) if args.json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
        },
        Ok(report) => print_report(&report),
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}
