//! Command-line interface for the sentiment explorer.
//!
//! Command handlers write to any `Write` sink so the binary can hand them
//! stdout while logs go to stderr.

use crate::api::Explorer;
use crate::chart::Chart;
use crate::classifier::SentimentInput;
use crate::config::Config;
use crate::model::SentimentBackend;
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Sentiment analysis with SHAP- and LIME-style explanations", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults are used when it does not exist)
    #[arg(long, global = true, default_value = "xai.toml")]
    pub config: PathBuf,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify a text as Positive or Negative
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Also print the class probabilities
        #[arg(long)]
        verbose_probabilities: bool,
    },
    /// Explain the classification of a text
    Explain {
        #[command(flatten)]
        input: InputArgs,

        #[arg(long, value_enum)]
        method: Method,

        /// Write the chart as SVG
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the explanation as JSON
        #[arg(long)]
        json: bool,
    },
    /// Analyze and explain one text per line of stdin
    Session {
        #[arg(long, value_enum, default_value_t = Method::Lime)]
        method: Method,
    },
    /// Show model location and execution device
    Info,
}

#[derive(Args, Debug)]
pub struct InputArgs {
    /// Text to analyze
    pub text: Option<String>,

    /// Read the text from a file instead
    #[arg(long, conflicts_with = "text")]
    pub file: Option<PathBuf>,
}

impl InputArgs {
    pub fn read(&self) -> Result<String> {
        match (&self.text, &self.file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("cannot read {}", path.display()))?;
                Ok(SentimentInput::from_bytes(&bytes)?)
            }
            (None, None) => bail!("provide TEXT or --file PATH"),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Shap,
    Lime,
}

/// Load configuration and model, then dispatch to the chosen command.
pub fn run(cli: Cli) -> Result<()> {
    let config = Config::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let explorer = Explorer::with_config(config).context("loading sentiment model")?;
    info!(device = %explorer.device(), "model loaded");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Analyze {
            input,
            verbose_probabilities,
        } => analyze(&explorer, &input.read()?, verbose_probabilities, &mut out),
        Command::Explain {
            input,
            method,
            output,
            json,
        } => explain(
            &explorer,
            &input.read()?,
            method,
            output.as_deref(),
            json,
            &mut out,
        ),
        Command::Session { method } => {
            session(&explorer, method, std::io::stdin().lock(), &mut out)
        }
        Command::Info => print_info(&explorer, &mut out),
    }
}

pub fn analyze<M: SentimentBackend + ?Sized>(
    explorer: &Explorer<M>,
    text: &str,
    verbose_probabilities: bool,
    out: &mut impl Write,
) -> Result<()> {
    let prediction = explorer.predict(text)?;
    if verbose_probabilities {
        writeln!(out, "{}", prediction)?;
    } else {
        writeln!(out, "{}", prediction.label)?;
    }
    Ok(())
}

pub fn explain<M: SentimentBackend + ?Sized>(
    explorer: &Explorer<M>,
    text: &str,
    method: Method,
    output: Option<&Path>,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    match method {
        Method::Shap => {
            let (explanation, chart) = explorer.explain_shap(text)?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&explanation)?)?;
            } else {
                write!(out, "{}", explanation.record)?;
                writeln!(
                    out,
                    "base value {:.4}, output {:.4} ({} evaluations)",
                    explanation.base_value, explanation.output_value, explanation.evaluations
                )?;
            }
            if let Some(path) = output {
                write_svg(path, &chart)?;
            }
        }
        Method::Lime => {
            let explanation = explorer.explain_lime(text)?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&explanation)?)?;
            } else {
                write!(out, "{}", explanation.record)?;
                writeln!(
                    out,
                    "intercept {:.4}, local prediction {:.4}, score {:.4}",
                    explanation.intercept, explanation.local_prediction, explanation.score
                )?;
            }
            if let Some(path) = output {
                let (features, values) = explanation.record.split();
                write_svg(path, &explorer.render_lime(&features, &values)?)?;
            }
        }
    }
    Ok(())
}

/// One request per input line; a failing line is reported and skipped.
pub fn session<M: SentimentBackend + ?Sized>(
    explorer: &Explorer<M>,
    method: Method,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let outcome = analyze(explorer, text, false, out)
            .and_then(|_| explain(explorer, text, method, None, false, out));
        if let Err(e) = outcome {
            warn!(error = %e, "request failed");
            writeln!(out, "Error: {:#}", e)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn print_info<M: SentimentBackend + ?Sized>(
    explorer: &Explorer<M>,
    out: &mut impl Write,
) -> Result<()> {
    let model = &explorer.config().model;
    writeln!(out, "Checkpoint: {}", model.checkpoint)?;
    writeln!(out, "Model directory: {}", model.model_dir)?;
    writeln!(out, "Device: {}", explorer.device())?;
    Ok(())
}

fn write_svg(path: &Path, chart: &impl Chart) -> Result<()> {
    std::fs::write(path, chart.to_svg())
        .with_context(|| format!("cannot write {}", path.display()))?;
    info!(path = %path.display(), chart = chart.title(), "chart written");
    Ok(())
}
