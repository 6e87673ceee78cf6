use cg_core::error::AppError;

/// Transport to a local Ollama instance. Strictly limited to
/// `127.0.0.1`; remote model endpoints are refused.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim_end_matches('/').to_string();

        let rejected = || {
            AppError::new(
                "REMOTE_NOT_ALLOWED",
                "Ollama base URL must be localhost (127.0.0.1)",
            )
            .with_details(format!("base_url={base_url}"))
        };

        // Harden against prefix-based bypasses (127.0.0.1.evil.com etc.).
        let Some(rest) = base_url.strip_prefix("http://127.0.0.1") else {
            return Err(rejected());
        };
        if !rest.is_empty() {
            let Some(port_str) = rest.strip_prefix(':') else {
                return Err(rejected());
            };
            let digits: String = port_str.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() || digits.len() != port_str.len() {
                return Err(rejected());
            }
            match digits.parse::<u32>() {
                Ok(port) if (1..=65535).contains(&port) => {}
                _ => return Err(rejected()),
            }
        }

        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = ureq::get(&url)
            .timeout(std::time::Duration::from_millis(800))
            .call();

        match resp {
            Ok(r) if r.status() == 200 => Ok(()),
            Ok(r) => Err(
                AppError::new("OLLAMA_UNHEALTHY", "Ollama health check failed")
                    .with_details(format!("status={}", r.status())),
            ),
            Err(e) => Err(AppError::new(
                "OLLAMA_UNREACHABLE",
                "Failed to reach Ollama on 127.0.0.1",
            )
            .with_details(e.to_string())
            .with_retryable(true)),
        }
    }
}
