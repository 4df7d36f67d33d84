//! Stimulus script format.
//!
//! One command per line, `#` starts a comment:
//!
//! ```text
//! stimulus db_error 0.8
//! penalty 0.25
//! decay 5
//! ```

use anyhow::{anyhow, bail, Context, Result};
use serenitas_limbic::RegulationEngine;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Stimulus { id: String, intensity: f64 },
    Penalty(f64),
    Decay(u32),
}

/// A command with the 1-based script line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub line: usize,
    pub command: Command,
}

pub fn parse(source: &str) -> Result<Vec<Step>> {
    source
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let line = line.split('#').next().unwrap_or("").trim();
            (!line.is_empty()).then_some((i + 1, line))
        })
        .map(|(lineno, line)| {
            parse_line(line)
                .map(|command| Step {
                    line: lineno,
                    command,
                })
                .with_context(|| format!("line {}: '{}'", lineno, line))
        })
        .collect()
}

fn parse_line(line: &str) -> Result<Command> {
    let mut parts = line.split_whitespace();
    let verb = parts.next().ok_or_else(|| anyhow!("empty command"))?;
    let command = match verb {
        "stimulus" => {
            let id = parts.next().ok_or_else(|| anyhow!("missing stimulus id"))?;
            let intensity = parts
                .next()
                .ok_or_else(|| anyhow!("missing intensity"))?
                .parse()
                .context("intensity is not a number")?;
            Command::Stimulus { id: id.to_string(), intensity }
        }
        "penalty" => {
            let amount = parts
                .next()
                .ok_or_else(|| anyhow!("missing amount"))?
                .parse()
                .context("amount is not a number")?;
            Command::Penalty(amount)
        }
        "decay" => {
            let n = match parts.next() {
                Some(n) => n.parse().context("tick count is not a positive integer")?,
                None => 1,
            };
            Command::Decay(n)
        }
        other => bail!("unknown command '{}'", other),
    };
    if let Some(extra) = parts.next() {
        bail!("unexpected trailing argument '{}'", extra);
    }
    Ok(command)
}

/// Run every step in order. Stops at the first rejected command.
pub async fn execute(engine: &RegulationEngine, steps: &[Step]) -> Result<()> {
    for Step { line, command } in steps {
        match command {
            Command::Stimulus { id, intensity } => {
                engine
                    .apply_stimulus(id, *intensity)
                    .await
                    .with_context(|| format!("line {} rejected", line))?;
            }
            Command::Penalty(amount) => {
                engine
                    .apply_penalty(*amount)
                    .await
                    .with_context(|| format!("line {} rejected", line))?;
            }
            Command::Decay(n) => {
                for _ in 0..*n {
                    engine.decay_tick().await;
                }
            }
        }
    }
    Ok(())
}
