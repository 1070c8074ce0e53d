//! redmark CLI - Red-only watermarking and distillation dataset tooling.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use redmark::watermark::{DEFAULT_Z_THRESHOLD, build_vocab_from_mapping};
use redmark::{
    BigramModel, Config, LanguageModel, Partition, RedBiasedTeacher, build_eligible_token_set,
    build_red_blue_partition, detect, run_pipeline,
};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "redmark")]
#[command(version)]
#[command(about = "Red-only text watermarking with entropy-gated biased sampling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the eligible set and red/blue partition for a vocabulary
    Partition {
        /// Path to a JSON token → id vocabulary (e.g. tokenizer vocab.json)
        #[arg(long)]
        vocab: PathBuf,

        /// Write the partition JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Measure the red rate of a token sequence against a partition
    Detect {
        /// Path to a partition JSON written by `partition`
        #[arg(long)]
        partition: PathBuf,

        /// Comma-separated token ids
        #[arg(long, value_delimiter = ',', required = true)]
        tokens: Vec<u32>,

        /// z-score above which the text is reported as watermarked
        #[arg(long, default_value_t = DEFAULT_Z_THRESHOLD)]
        z_threshold: f64,
    },

    /// Run the full pipeline on a built-in bigram model
    Demo {
        /// Prompts, one per line (words must be in the demo vocabulary)
        #[arg(short, long)]
        prompts: Option<PathBuf>,

        /// Write the pipeline outputs JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")
}

const EXAMPLE_CONFIG: &str = r#"# redmark configuration file
# Every section is optional; omitted keys use the defaults shown.

[eligibility]
top_k = 5000
banned_fillers = ["ah", "er", "like", "uh", "um", "you know"]
exclude_digits = true
exclude_punctuation = true
exclude_whitespace = true
exclude_non_ascii = true

[partition]
# The seed is the watermark key
seed = 0

[bias]
delta = 1.5
entropy_threshold = 2.0
top_k = 50          # top-k co-presence gate
top_k_gate = true   # false: entropy gate only
max_tokens = 256

[scoring]
red_rate_weight = 1.0
base_logprob_weight = 1.0
oddity_weight = 1.0

[reward]
red_rate_weight = 1.0
oddity_weight = 1.0

[generation]
target_red_rate = 0.8
samples_per_prompt = 4
rng_seed = 0
compute_base_logprob = true
show_progress = false

[selection]
best_of_n = 1
max_pairs_per_prompt = 1
# Oddities that do not disqualify a clean candidate
allowed_oddities = []  # e.g. ["caps_weirdness"]
"#;

fn print_example_config() {
    println!("{EXAMPLE_CONFIG}");
}

/// Load the config file, falling back to defaults when it does not exist.
fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        Config::from_file(path).with_context(|| format!("Failed to load config from {path:?}"))?
    } else {
        warn!("Config file {:?} not found, using defaults", path);
        Config::default()
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {path:?}"))?;
            info!("Wrote {:?}", path);
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn load_vocab(path: &Path) -> Result<Vec<(u32, String)>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {path:?}"))?;
    let by_token: HashMap<String, u32> =
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {path:?}"))?;
    let by_id: HashMap<u32, String> = by_token.into_iter().map(|(t, id)| (id, t)).collect();
    Ok(build_vocab_from_mapping(&by_id))
}

const DEMO_VOCAB: [&str; 16] = [
    "the", "a", "cat", "dog", "sat", "ran", "on", "under", "mat", "tree", "quietly", "quickly",
    "and", "HOWEVER", "!!!", "um",
];

const DEMO_PROMPTS: [&str; 3] = ["the cat", "a dog ran", "the dog sat on"];

fn demo_model() -> Result<BigramModel> {
    // Mildly peaked rows keep most steps above the entropy gate
    let n = DEMO_VOCAB.len();
    let mut model = BigramModel::new(DEMO_VOCAB)?;
    for prev in 0..n {
        let logits = (0..n)
            .map(|next| if (prev + next) % 5 == 0 { 1.0 } else { 0.0 })
            .collect();
        model = model.with_transition(prev as u32, logits)?;
    }
    Ok(model)
}

fn load_prompts(path: Option<&Path>) -> Result<Vec<String>> {
    let Some(path) = path else {
        return Ok(DEMO_PROMPTS.iter().map(|p| p.to_string()).collect());
    };
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {path:?}"))?;
    let prompts: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if prompts.is_empty() {
        bail!("No prompts found in {path:?}");
    }
    Ok(prompts)
}

#[derive(Serialize)]
struct PartitionOutput<'a> {
    seed: u64,
    vocab_size: usize,
    eligible_count: usize,
    #[serde(flatten)]
    partition: &'a Partition,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Example => {
            print_example_config();
        }

        Commands::Validate => {
            let config = Config::from_file(&cli.config)
                .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
            config.validate().context("Invalid configuration")?;

            info!("Configuration is valid");
            info!(
                "  Eligibility: top {} tokens, {} banned fillers",
                config.eligibility.top_k,
                config.eligibility.banned_fillers.len()
            );
            info!(
                "  Bias: delta {:.2}, entropy threshold {:.2}, top-k gate {:?}",
                config.bias.delta,
                config.bias.entropy_threshold,
                config.bias.effective_top_k()
            );
            info!(
                "  Generation: {} samples/prompt, {} tokens, target red rate {:.0}%",
                config.generation.samples_per_prompt,
                config.bias.max_tokens,
                config.generation.target_red_rate * 100.0
            );
        }

        Commands::Partition { vocab, output } => {
            let config = load_config(&cli.config)?;
            let entries = load_vocab(&vocab)?;
            let eligible = build_eligible_token_set(&entries, &config.eligibility);
            let partition = build_red_blue_partition(&eligible, config.partition.seed);
            info!(
                vocab = entries.len(),
                eligible = eligible.len(),
                red = partition.red.len(),
                blue = partition.blue.len(),
                "Built partition"
            );
            write_json(
                &PartitionOutput {
                    seed: config.partition.seed,
                    vocab_size: entries.len(),
                    eligible_count: eligible.len(),
                    partition: &partition,
                },
                output.as_deref(),
            )?;
        }

        Commands::Detect {
            partition,
            tokens,
            z_threshold,
        } => {
            let content = std::fs::read_to_string(&partition)
                .with_context(|| format!("Failed to read {partition:?}"))?;
            let key: Partition = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {partition:?}"))?;
            let report = detect(&tokens, &key.red, &key.eligible());
            info!(
                "Red rate {:.3} (expected {:.3}), z = {:.2}: {}",
                report.red_rate,
                report.expected_ratio,
                report.z_score,
                if report.is_watermarked(z_threshold) {
                    "watermarked"
                } else {
                    "not watermarked"
                }
            );
            write_json(&report, None)?;
        }

        Commands::Demo { prompts, output } => {
            let config = load_config(&cli.config)?;
            let model = demo_model()?;
            let prompts = load_prompts(prompts.as_deref())?;
            for prompt in &prompts {
                model
                    .encode(prompt)
                    .with_context(|| format!("Prompt {prompt:?} is outside the demo vocabulary"))?;
            }

            let eligible = build_eligible_token_set(&model.vocabulary(), &config.eligibility);
            let partition = build_red_blue_partition(&eligible, config.partition.seed);
            let teacher = RedBiasedTeacher::from_partition(&model, &partition, config.bias.clone())?;
            let outputs = run_pipeline(&teacher, &model, &prompts, &config)?;

            eprintln!("\n=== Watermark Demo Complete ===");
            eprintln!("Prompts:     {}", outputs.stats.total_prompts);
            eprintln!("Candidates:  {}", outputs.stats.total_candidates);
            eprintln!("Selected:    {}", outputs.stats.total_selected);
            eprintln!("DPO pairs:   {}", outputs.stats.total_pairs);
            eprintln!("Odd:         {}", outputs.stats.oddity_candidates);
            eprintln!("Red rate:    {:.3}", outputs.stats.mean_red_rate);
            eprintln!("Runtime:     {:.2}s", outputs.stats.runtime_secs);
            write_json(&outputs, output.as_deref())?;
        }
    }

    Ok(())
}
