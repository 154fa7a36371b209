mod json_payload;
mod response_normalizer;

pub use json_payload::JsonPayloadNormalizer;
pub use response_normalizer::ResponseNormalizer;
