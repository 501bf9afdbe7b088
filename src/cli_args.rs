use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "gradientgen",
    version,
    about = "Generate gradient color palettes from a mood or theme, streamed from a local model"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate palettes for a prompt, rendering results as they arrive
    Generate(GenerateArgs),

    /// Check that the configured model backend is reachable
    Doctor(DoctorArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    Ollama,
    Lmstudio,
    Llamacpp,
    Mock,
}

#[derive(Debug, Parser)]
pub struct GenerateArgs {
    /// Mood or theme to generate palettes for
    pub prompt: String,

    /// How many palettes to ask for (1-10, embedded in the instructions)
    #[arg(long, default_value_t = 3)]
    pub limit: u8,

    #[arg(long, value_enum, default_value_t = SourceKind::Ollama)]
    pub provider: SourceKind,

    /// Base URL of the backend; defaults per provider
    #[arg(long)]
    pub base_url: Option<String>,

    /// Model name to request from the backend
    #[arg(long, default_value = "llama3.2")]
    pub model: String,

    /// Bearer token for OpenAI-compatible backends
    #[arg(long)]
    pub api_key: Option<String>,

    /// Append structured generation events to this JSONL file
    #[arg(long)]
    pub events_file: Option<PathBuf>,

    #[arg(long, default_value_t = 2000)]
    pub http_connect_timeout_ms: u64,

    /// Overall request timeout; 0 disables
    #[arg(long, default_value_t = 120_000)]
    pub http_timeout_ms: u64,

    /// Abort if the stream goes quiet this long; 0 disables
    #[arg(long, default_value_t = 30_000)]
    pub http_stream_idle_timeout_ms: u64,
}

#[derive(Debug, Parser)]
pub struct DoctorArgs {
    #[arg(long, value_enum, default_value_t = SourceKind::Ollama)]
    pub provider: SourceKind,

    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long)]
    pub api_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Commands, SourceKind};

    #[test]
    fn parses_generate_with_defaults() {
        let cli = Cli::parse_from(["gradientgen", "generate", "sunset over the ocean"]);
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.prompt, "sunset over the ocean");
        assert_eq!(args.limit, 3);
        assert_eq!(args.provider, SourceKind::Ollama);
        assert!(args.base_url.is_none());
    }

    #[test]
    fn parses_provider_and_limit_flags() {
        let cli = Cli::parse_from([
            "gradientgen",
            "generate",
            "forest",
            "--limit",
            "7",
            "--provider",
            "lmstudio",
            "--base-url",
            "http://127.0.0.1:9999/v1",
        ]);
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.limit, 7);
        assert_eq!(args.provider, SourceKind::Lmstudio);
        assert_eq!(args.base_url.as_deref(), Some("http://127.0.0.1:9999/v1"));
    }

    #[test]
    fn parses_doctor() {
        let cli = Cli::parse_from(["gradientgen", "doctor", "--provider", "mock"]);
        let Commands::Doctor(args) = cli.command else {
            panic!("expected doctor");
        };
        assert_eq!(args.provider, SourceKind::Mock);
    }
}
