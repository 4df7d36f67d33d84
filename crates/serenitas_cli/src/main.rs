use anyhow::Context;
use clap::Parser;
use serenitas_core::RegulationConfig;
use serenitas_limbic::RegulationEngine;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod script;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the regulation policy (TOML); built-in defaults if missing
    #[arg(short, long, env = "SERENITAS_CONFIG", default_value = "serenitas.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Stimulus script to replay
    script: PathBuf,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let config = RegulationConfig::load_or_default(&args.config);
    let engine = RegulationEngine::from_config(&config)?;

    let source = std::fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read script: {}", args.script.display()))?;
    let steps = script::parse(&source)?;
    info!("Replaying {} commands from {}", steps.len(), args.script.display());

    script::execute(&engine, &steps).await?;

    let final_state = engine.get_current_state();
    let history = engine.finish();
    let critical_transitions = history.critical_transitions().count();

    let report = serde_json::json!({
        "final_state": final_state,
        "critical": final_state.is_critical(),
        "critical_transitions": critical_transitions,
        "history": history,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
