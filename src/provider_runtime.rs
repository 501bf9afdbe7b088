use std::time::Duration;

use reqwest::Client;

use crate::cli_args::{DoctorArgs, GenerateArgs, SourceKind};
use crate::providers::http::HttpConfig;

/// Reachability probe for the configured backend, run before generating or
/// via the `doctor` subcommand.
pub(crate) async fn doctor_check(args: &DoctorArgs) -> Result<String, String> {
    let base_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| default_base_url(args.provider).to_string());
    let client = Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
        .map_err(|e| format!("failed to build HTTP client: {e}"))?;

    match args.provider {
        SourceKind::Mock => Ok(format!("OK: mock source ready at {}", base_url)),
        SourceKind::Ollama => {
            let tags_url = format!("{}/api/tags", base_url.trim_end_matches('/'));
            let resp = client
                .get(&tags_url)
                .send()
                .await
                .map_err(|e| format!("could not reach {tags_url}: {e}"))?;
            if resp.status().is_success() {
                Ok(format!("OK: ollama reachable at {}", base_url))
            } else {
                Err(format!(
                    "ollama responded with HTTP {} at {}",
                    resp.status(),
                    tags_url
                ))
            }
        }
        SourceKind::Lmstudio | SourceKind::Llamacpp => {
            let models_url = format!("{}/models", base_url.trim_end_matches('/'));
            let mut req = client.get(&models_url);
            if let Some(key) = args.api_key.as_deref() {
                req = req.bearer_auth(key);
            }
            let resp = req
                .send()
                .await
                .map_err(|e| format!("could not reach {models_url}: {e}"))?;
            if resp.status().is_success() {
                Ok(format!(
                    "OK: {} reachable at {}",
                    source_cli_name(args.provider),
                    base_url
                ))
            } else {
                Err(format!(
                    "{} responded with HTTP {} at {}",
                    source_cli_name(args.provider),
                    resp.status(),
                    models_url
                ))
            }
        }
    }
}

pub(crate) fn default_base_url(provider: SourceKind) -> &'static str {
    match provider {
        SourceKind::Lmstudio => "http://localhost:1234/v1",
        SourceKind::Llamacpp => "http://localhost:8080/v1",
        SourceKind::Ollama => "http://localhost:11434",
        SourceKind::Mock => "mock://local",
    }
}

pub(crate) fn source_cli_name(provider: SourceKind) -> &'static str {
    match provider {
        SourceKind::Lmstudio => "lmstudio",
        SourceKind::Llamacpp => "llamacpp",
        SourceKind::Ollama => "ollama",
        SourceKind::Mock => "mock",
    }
}

pub(crate) fn http_config_from_generate_args(args: &GenerateArgs) -> HttpConfig {
    HttpConfig {
        connect_timeout_ms: args.http_connect_timeout_ms,
        request_timeout_ms: args.http_timeout_ms,
        stream_idle_timeout_ms: args.http_stream_idle_timeout_ms,
        ..HttpConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::{default_base_url, source_cli_name};
    use crate::cli_args::SourceKind;

    #[test]
    fn default_urls_are_stable() {
        assert_eq!(default_base_url(SourceKind::Ollama), "http://localhost:11434");
        assert_eq!(
            default_base_url(SourceKind::Lmstudio),
            "http://localhost:1234/v1"
        );
    }

    #[test]
    fn cli_names_match_value_enum() {
        assert_eq!(source_cli_name(SourceKind::Llamacpp), "llamacpp");
        assert_eq!(source_cli_name(SourceKind::Mock), "mock");
    }
}
