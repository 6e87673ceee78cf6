pub mod bibliography;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod registry;
pub mod review;

#[cfg(test)]
mod tests {
    use super::error::AppError;
    use super::registry::CitationRegistry;

    #[test]
    fn app_error_is_structured() {
        let err = AppError::new("REGISTRY_CLOSED", "registry closed").with_retryable(false);
        assert_eq!(err.code, "REGISTRY_CLOSED");
        assert_eq!(err.message, "registry closed");
        assert_eq!(err.retryable, false);
    }

    #[test]
    fn finalized_registry_rejects_register() {
        let mut reg = CitationRegistry::new();
        reg.register("a").expect("register");
        reg.finalize();
        let err = reg.register("b").expect_err("should be closed");
        assert_eq!(err.code, "REGISTRY_CLOSED");
    }
}
