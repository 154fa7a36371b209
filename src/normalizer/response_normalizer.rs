/// Trait for cleaning raw generation output before it is parsed
pub trait ResponseNormalizer: Send + Sync {
    /// Normalize the raw response text
    fn normalize(&self, raw_output: &str) -> String;

    /// Get the name of this normalizer for logging
    fn name(&self) -> &'static str;
}
