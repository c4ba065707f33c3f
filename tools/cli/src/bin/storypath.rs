use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use story_path_engine::{
    script_json_schema, trace_story, Context, EngineConfig, PlayOutcome, PlayerState, Save,
    SaveKind, SaveRecord, SaveSlotStore, ScriptRaw, ScriptStore, StoryPath, UiTrace,
    SCRIPT_SCHEMA_VERSION,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Story path engine CLI")]
struct Cli {
    /// Engine configuration (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log more (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a script file or a directory of script parts.
    Validate { script: PathBuf },
    /// Play a script headlessly and write the trace as YAML.
    Trace {
        script: PathBuf,
        #[arg(long, default_value_t = 100)]
        steps: usize,
        /// Branch indices to pick at successive choices.
        #[arg(long, value_delimiter = ',')]
        choices: Vec<usize>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the replay plan a save (JSON or .vnps slot file) restores to.
    Restore {
        save: PathBuf,
        #[arg(long)]
        script: PathBuf,
    },
    /// List the assets worth prefetching from a path.
    Prefetch {
        script: PathBuf,
        /// Path in wire form, e.g. '[["jump","start"],[null,2]]'.
        #[arg(long)]
        path: String,
    },
    /// List the slots of a save directory.
    Slots { dir: PathBuf },
    /// Print the JSON schema of the script format.
    Schema {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the effective configuration, or write the defaults with --init.
    Config {
        #[arg(long)]
        init: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct TraceEnvelope {
    trace_format_version: u16,
    script_schema_version: String,
    outcome: PlayOutcome,
    trace: UiTrace,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Validate { script } => validate_script(&script, config),
        Command::Trace {
            script,
            steps,
            choices,
            output,
        } => trace_script(&script, config, steps, &choices, output.as_deref()),
        Command::Restore { save, script } => show_restore(&save, &script, config),
        Command::Prefetch { script, path } => show_prefetch(&script, &path, config),
        Command::Slots { dir } => list_slots(&dir),
        Command::Schema { output } => {
            let schema = serde_json::to_string_pretty(&script_json_schema())?;
            write_or_print(output.as_deref(), &schema)
        }
        Command::Config { init } => match init {
            Some(path) => {
                EngineConfig::default().save(&path)?;
                info!(path = %path.display(), "wrote default configuration");
                Ok(())
            }
            None => write_or_print(None, &config.to_toml_string()?),
        },
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn load_script(path: &Path, config: EngineConfig) -> Result<Arc<ScriptStore>> {
    let parsed = if path.is_dir() {
        ScriptRaw::load_dir(path, config.limits)
    } else {
        ScriptRaw::load_file(path, config.limits)
    };
    let raw = parsed.with_context(|| format!("parse {}", path.display()))?;
    let store = raw
        .compile(config.limits)
        .with_context(|| format!("compile {}", path.display()))?;
    debug!(script_id = %store.script_id_hex(), "script compiled");
    Ok(Arc::new(store))
}

fn validate_script(path: &Path, config: EngineConfig) -> Result<()> {
    let store = load_script(path, config)?;
    println!(
        "ok: {} scenes, script id {}",
        store.scene_names().count(),
        store.script_id_hex()
    );
    Ok(())
}

fn trace_script(
    path: &Path,
    config: EngineConfig,
    steps: usize,
    choices: &[usize],
    output: Option<&Path>,
) -> Result<()> {
    let store = load_script(path, config)?;
    let (trace, outcome) = trace_story(store, config, choices, steps)?;
    let envelope = TraceEnvelope {
        trace_format_version: 1,
        script_schema_version: SCRIPT_SCHEMA_VERSION.to_string(),
        outcome,
        trace,
    };
    write_or_print(output, &serde_yaml::to_string(&envelope)?)
}

fn read_save(path: &Path, store: &ScriptStore) -> Result<Save> {
    if path.extension().and_then(|ext| ext.to_str()) == Some("vnps") {
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let record = SaveRecord::from_binary(&bytes)?;
        record.validate_script_id(store.script_id())?;
        return Ok(record.save);
    }
    let json = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Save::from_json(&json).with_context(|| format!("parse save {}", path.display()))
}

fn show_restore(save_path: &Path, script_path: &Path, config: EngineConfig) -> Result<()> {
    let store = load_script(script_path, config)?;
    let save = read_save(save_path, &store)?;
    let mut context = Context::new("cli", store, config);
    let plan = context.restore(save)?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn show_prefetch(script_path: &Path, path: &str, config: EngineConfig) -> Result<()> {
    let store = load_script(script_path, config)?;
    let path: StoryPath = serde_json::from_str(path).context("parse path")?;
    let mut context = Context::preview("prefetch", store, config);
    context.restore(Save::new(path, PlayerState::new(), SaveKind::Auto, Vec::new()))?;
    println!("{}", serde_json::to_string_pretty(&context.prefetch_assets())?);
    Ok(())
}

fn list_slots(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let store = SaveSlotStore::new(dir);
    for entry in store.list_slots()? {
        let meta = entry.metadata;
        println!(
            "{}{:>4}  {:?}  {}  scene={}  items={}",
            if meta.quick { "q" } else { " " },
            meta.slot_id,
            meta.kind,
            meta.updated_unix_ms,
            meta.scene.as_deref().unwrap_or("-"),
            meta.path_len
        );
    }
    Ok(())
}

fn write_or_print(output: Option<&Path>, contents: &str) -> Result<()> {
    match output {
        Some(output) => {
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(output, contents).with_context(|| format!("write {}", output.display()))
        }
        None => {
            print!("{contents}");
            if !contents.ends_with('\n') {
                println!();
            }
            Ok(())
        }
    }
}
