//! Copyright © 2025-2026 Terjemah Hadith Team. All Rights Reserved.
//!
//! This file is part of Terjemah Hadith.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!   http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! Command-line entry point for the translation pipeline.
//!
//! Exit code is 0 only when every requested field ended up translated;
//! any failed unit (or a user interrupt) exits non-zero after printing
//! the summary and persisting progress.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};

use terjemah_hadith::config::{api_key_from_env, PipelineConfig};
use terjemah_hadith::gateway::{GatewayConfig, HttpTransport, TranslationGateway};
use terjemah_hadith::ledger::ProgressLedger;
use terjemah_hadith::pipeline::Orchestrator;
use terjemah_hadith::source::{SourceLocation, SourceReader};
use terjemah_hadith::writer::OutputWriter;

/// Raised by the SIGINT handler; checked between units of work.
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigint(_signal: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

#[derive(Parser)]
#[command(name = "terjemah")]
#[command(version)]
#[command(about = "Translate canonical Hadith collections into Malay (Malaysia)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the translation batch over one or more collections
    Run {
        /// Collection slugs to translate, e.g. bukhari,muslim
        #[arg(long, value_delimiter = ',', required = true)]
        books: Vec<String>,

        /// Skip fields already translated in a previous run; pass
        /// `--resume false` to re-translate everything
        #[arg(
            long,
            action = ArgAction::Set,
            num_args = 0..=1,
            default_value_t = true,
            default_missing_value = "true"
        )]
        resume: bool,

        /// Provider attempts per field before it is marked failed
        #[arg(long, default_value_t = 5)]
        max_retries: u32,

        /// Minimum interval between provider calls, in milliseconds
        #[arg(long, default_value_t = 4000)]
        rate_limit_ms: u64,

        /// Worker threads issuing provider calls
        #[arg(long, default_value_t = 2)]
        workers: usize,

        /// Dataset location: a local directory or an HTTP base URL
        #[arg(long)]
        source: Option<String>,

        /// Output directory
        #[arg(long, default_value = "hadiths")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let Commands::Run {
        books,
        resume,
        max_retries,
        rate_limit_ms,
        workers,
        source,
        output,
    } = cli.command;

    // Credential is checked before any work begins.
    let api_key = api_key_from_env().context("cannot start")?;

    let mut config = PipelineConfig {
        resume,
        max_retries,
        rate_limit_ms,
        workers,
        output_dir: output,
        ..PipelineConfig::default()
    };
    if let Some(source) = source {
        config.source = SourceLocation::parse(&source);
    }

    unsafe {
        libc::signal(libc::SIGINT, handle_sigint as libc::sighandler_t);
    }

    let transport = HttpTransport::new(api_key, config.request_timeout())?;
    let gateway = TranslationGateway::new(transport, GatewayConfig::from_pipeline(&config))?;
    let reader = SourceReader::new(config.source.clone())?;
    let writer = OutputWriter::new(config.output_dir.clone());
    let ledger = ProgressLedger::load(config.output_dir.join("progress.json"))?;

    let orchestrator =
        Orchestrator::new(&gateway, &reader, &writer, &ledger, &config, &SHUTDOWN);
    let summary = orchestrator.run(&books)?;

    println!("{summary}");
    Ok(summary.is_success())
}
