use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use academize::{
    clamp_cycles, clamp_intensity, deep_think_humanize, humanize, split_paragraphs,
    HumanizeReport, Lexicon, TableLexicon,
};

#[derive(Parser)]
#[command(
    name = "academize",
    about = "Rewrite machine-generated prose into academic-sounding text",
    version
)]
struct Cli {
    /// File paths to rewrite (reads stdin if none provided)
    files: Vec<PathBuf>,

    /// Transforms applied to each sentence, clamped to 1-5
    #[arg(short, long, default_value_t = 3)]
    intensity: i32,

    /// Re-run the whole pipeline over its own output for several cycles
    #[arg(long)]
    deep_think: bool,

    /// Deep-think cycle count, clamped to 1-8
    #[arg(long, default_value_t = 5)]
    cycles: i32,

    /// Seed for the random source (entropy if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// JSON synonym lexicon to use instead of the built-in table
    #[arg(long)]
    lexicon: Option<PathBuf>,

    /// Emit a JSON report instead of plain text
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // The lexicon is a hard dependency; fail before reading any input.
    let loaded;
    let lexicon: &dyn Lexicon = match &cli.lexicon {
        Some(path) => {
            loaded = TableLexicon::from_path(path)
                .with_context(|| format!("loading lexicon {}", path.display()))?;
            &loaded
        }
        None => TableLexicon::builtin(),
    };

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    if cli.files.is_empty() {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("reading stdin")?;
        emit(&cli, &input, &mut rng, lexicon)?;
    } else {
        for path in &cli.files {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            emit(&cli, &text, &mut rng, lexicon)?;
        }
    }
    Ok(())
}

fn emit(cli: &Cli, input: &str, rng: &mut StdRng, lexicon: &dyn Lexicon) -> anyhow::Result<()> {
    let output = if cli.deep_think {
        deep_think_humanize(input, cli.cycles, rng, lexicon)
    } else {
        humanize(input, cli.intensity, rng, lexicon)
    };

    if cli.json {
        let report = HumanizeReport {
            deep_think: cli.deep_think,
            // Deep think always runs at maximum intensity.
            intensity: if cli.deep_think {
                5
            } else {
                clamp_intensity(cli.intensity)
            },
            cycles: if cli.deep_think {
                clamp_cycles(cli.cycles)
            } else {
                1
            },
            paragraphs: split_paragraphs(&output).len(),
            word_count: output.split_whitespace().count(),
            output,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{output}");
    }
    Ok(())
}
