use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use webnovel_translator::models::{GeminiClient, GeminiConfig};
use webnovel_translator::pipeline::trace::TraceWriter;
use webnovel_translator::pipeline::{
    discover_inputs, init_default_config, BatchOptions, BatchRunner, PipelineConfig,
    RunOverrides, Translator,
};
use webnovel_translator::progress::ConsoleProgress;
use webnovel_translator::scrape::HtmlScraper;
use webnovel_translator::sites::SiteRegistry;
use webnovel_translator::store::FsChapterStore;

#[derive(Parser, Debug)]
#[command(name = "webnovel-translator")]
#[command(about = "Translate scraped web-novel chapters (HTML) into English markdown with Gemini", long_about = None)]
struct Args {
    /// Generate default config + prompt files, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write config/prompt files (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite existing translations (or config files with --init-config)
    #[arg(long)]
    force: bool,

    /// Saved chapter page (.html) or a directory of them
    #[arg(value_name = "INPUT", default_value = "input")]
    input: PathBuf,

    /// Output root; chapters go to <DIR>/<novel title>/ch-<N>.md
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Config file path (default: search for webnovel-translator.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Earlier chapters to send as consistency context
    #[arg(long, value_name = "N")]
    context_chapters: Option<u32>,

    /// Translate without earlier chapters as context
    #[arg(long)]
    no_context: bool,

    /// Extra instructions appended to the prompt for every chapter
    #[arg(long, value_name = "TEXT", conflicts_with = "instructions_file")]
    instructions: Option<String>,

    /// Read extra instructions from a file
    #[arg(long, value_name = "PATH")]
    instructions_file: Option<PathBuf>,

    /// Keep the most complete attempt when all attempts fall short
    #[arg(long)]
    accept_partial: bool,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "webnovel_translator=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let instructions = match args.instructions_file.as_ref() {
        Some(p) => Some(
            std::fs::read_to_string(p)
                .with_context(|| format!("read instructions: {}", p.display()))?,
        ),
        None => args.instructions.clone(),
    };

    let cfg = PipelineConfig::from_paths_and_args(
        &args.input,
        args.config.clone(),
        RunOverrides {
            output_dir: args.output_dir.clone(),
            context_chapters: args.context_chapters,
            no_context: args.no_context,
        },
    )
    .context("build config")?;

    let inputs = discover_inputs(&args.input).context("find input files")?;
    if inputs.is_empty() {
        eprintln!(
            "No .html files found in {}.\n\nUSAGE:\n  webnovel-translator <input dir or file> [-o output]\n\nTIPS:\n  - Save chapter pages as HTML into ./input and run without arguments.\n  - Set GEMINI_API_KEY (or [model].api_key_env) before running.\n",
            args.input.display()
        );
        return Ok(ExitCode::FAILURE);
    }

    let sites = SiteRegistry::from_config(&cfg.app.sites).context("load [sites] rules")?;
    let model = GeminiClient::new(GeminiConfig::from_app_config(&cfg.app)?)?;
    let trace = TraceWriter::new(cfg.trace_dir.clone(), cfg.trace_prompts)?;
    let translator = Translator::new(
        cfg.translation.clone(),
        model,
        FsChapterStore::new(&cfg.output_dir),
        cfg.prompts.clone(),
    )
    .with_trace(trace)
    .allow_partial(args.accept_partial);

    let progress = ConsoleProgress::new(true);
    progress.info(format!(
        "{} chapter file(s) -> {} (model {}, context {})",
        inputs.len(),
        cfg.output_dir.display(),
        cfg.translation.model_identifier,
        cfg.translation.context_window
    ));

    let mut runner = BatchRunner::new(
        translator,
        HtmlScraper::new(cfg.content_id.clone()),
        sites,
        progress,
        BatchOptions {
            force: args.force,
            instructions,
        },
    );
    let summary = runner.run(&inputs);
    eprintln!("{}", summary.render());

    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
