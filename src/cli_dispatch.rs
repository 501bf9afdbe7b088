use anyhow::Context;
use clap::Parser;

use crate::cli_args::{Cli, Commands, GenerateArgs, SourceKind};
use crate::controller::{ChannelSink, GenerationController, RunOutcome};
use crate::events::{JsonlFileSink, MultiSink};
use crate::machine::{Phase, StateSnapshot};
use crate::provider_runtime::{default_base_url, doctor_check, http_config_from_generate_args};
use crate::providers::mock::ScriptedSource;
use crate::providers::ollama::OllamaSource;
use crate::providers::openai_compat::OpenAiCompatSource;
use crate::providers::PaletteSource;
use crate::types::GenerationRequest;

pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Generate(args) => run_generate(args).await,
        Commands::Doctor(args) => match doctor_check(&args).await {
            Ok(msg) => {
                println!("{msg}");
                Ok(())
            }
            Err(msg) => Err(anyhow::anyhow!(msg)),
        },
    }
}

async fn run_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let request = GenerationRequest::new(&args.prompt, args.limit)
        .context("invalid generation request")?;
    let source = build_source(&args, &request)?;

    let mut events = MultiSink::new();
    if let Some(path) = &args.events_file {
        events.push(Box::new(JsonlFileSink::new(path)?));
    }

    let mut controller = GenerationController::with_events(events);
    let (sink, mut rx) = ChannelSink::new();
    controller.subscribe(Box::new(sink));

    let stop = controller.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("stopping after the current snapshot...");
            stop.request_stop();
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(snapshot) = rx.recv().await {
            render_progress(&snapshot);
        }
    });

    let outcome = match controller.start(source.as_ref(), &request).await {
        Ok(outcome) => outcome,
        Err(e) => return Err(anyhow::anyhow!(e)),
    };
    drop(controller);
    let _ = printer.await;

    match outcome {
        RunOutcome::Completed => Ok(()),
        RunOutcome::Stopped => {
            println!("generation stopped");
            Ok(())
        }
        RunOutcome::Failed => Err(anyhow::anyhow!("generation failed")),
    }
}

fn build_source(
    args: &GenerateArgs,
    request: &GenerationRequest,
) -> anyhow::Result<Box<dyn PaletteSource>> {
    let base_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| default_base_url(args.provider).to_string());
    let http = http_config_from_generate_args(args);
    let source: Box<dyn PaletteSource> = match args.provider {
        SourceKind::Ollama => Box::new(OllamaSource::new(&base_url, &args.model, http)?),
        SourceKind::Lmstudio | SourceKind::Llamacpp => Box::new(OpenAiCompatSource::new(
            &base_url,
            &args.model,
            args.api_key.clone(),
            http,
        )?),
        SourceKind::Mock => Box::new(ScriptedSource::canned(request.prompt(), request.limit())),
    };
    Ok(source)
}

fn render_progress(snapshot: &StateSnapshot) {
    match snapshot.phase {
        Phase::Generating => {
            if !snapshot.palettes.is_empty() {
                println!("-- {} palette(s) so far --", snapshot.palettes.len());
            }
        }
        // Stopped and Failed settle to Idle right away; the final list is
        // rendered once, from the settled snapshot.
        Phase::Idle => {
            for palette in &snapshot.palettes {
                println!(
                    "{:>3}  {:<28} {}",
                    palette.id(),
                    palette.name(),
                    palette.colors().join(" -> ")
                );
            }
            if let Some(err) = &snapshot.last_error {
                eprintln!("error: {}", err.message);
            }
        }
        Phase::Stopped | Phase::Failed => {}
    }
}
