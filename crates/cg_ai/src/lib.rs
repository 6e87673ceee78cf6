pub mod corpus;
pub mod embeddings;
pub mod generate;
pub mod index;
pub mod llm;
pub mod ollama;
pub mod retrieve;

#[cfg(test)]
mod tests {
    use crate::ollama::OllamaClient;

    #[test]
    fn ollama_client_accepts_localhost_only() {
        assert!(OllamaClient::new("http://127.0.0.1:11434").is_ok());
        assert!(OllamaClient::new("http://127.0.0.1").is_ok());
        assert!(OllamaClient::new("http://127.0.0.1:11434/").is_ok());

        assert!(OllamaClient::new("http://localhost:11434").is_err());
        assert!(OllamaClient::new("https://127.0.0.1:11434").is_err());
        assert!(OllamaClient::new("http://127.0.0.1.evil.com:11434").is_err());
        assert!(OllamaClient::new("http://127.0.0.1:0").is_err());
        assert!(OllamaClient::new("http://127.0.0.1:99999").is_err());
        assert!(OllamaClient::new("http://127.0.0.1:11434x").is_err());
    }

    #[test]
    fn ollama_client_normalizes_trailing_slash() {
        let client = OllamaClient::new("http://127.0.0.1:11434/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:11434");
    }
}
