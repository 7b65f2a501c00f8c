//! Configuration helpers for mock-backed and live generators

use std::time::Duration;
use vidgen::{Config, PollConfig, ProviderConfig, VideoGenerator};

/// Poll settings that keep mock-backed tests fast
pub fn fast_poll() -> PollConfig {
    PollConfig::fixed(Duration::from_millis(10))
}

/// Pika entry pointing at a mock server, authenticated with a static token
pub fn pika_config(endpoint: &str) -> ProviderConfig {
    ProviderConfig {
        endpoint: Some(endpoint.to_string()),
        api_key: Some(STATIC_TOKEN.to_string()),
        ..ProviderConfig::new("Pika")
    }
}

/// Kling entry pointing at a mock server, authenticated with signed tokens
pub fn kling_config(endpoint: &str) -> ProviderConfig {
    ProviderConfig {
        endpoint: Some(endpoint.to_string()),
        access_key: Some("test-access".to_string()),
        secret_key: Some("test-secret".to_string()),
        ..ProviderConfig::new("可灵")
    }
}

/// Generator over the given providers with fast polling
pub fn create_generator(providers: Vec<ProviderConfig>) -> VideoGenerator {
    let config = Config {
        providers,
        poll: fast_poll(),
        ..Default::default()
    };
    VideoGenerator::new(config).expect("valid test config")
}

/// Token sent by static-token test providers
pub const STATIC_TOKEN: &str = "test-token";

/// Load a provider configuration from environment variables
///
/// - `VIDGEN_PROVIDER` - provider name (default: kling)
/// - `VIDGEN_API_KEY` - static token (runway, pika)
/// - `VIDGEN_ACCESS_KEY` / `VIDGEN_SECRET_KEY` - signing keys (kling)
/// - `VIDGEN_ENDPOINT` - API base URL (optional)
pub fn load_live_provider() -> Option<ProviderConfig> {
    dotenvy::dotenv().ok();

    let name = std::env::var("VIDGEN_PROVIDER").unwrap_or_else(|_| "kling".to_string());
    let config = ProviderConfig {
        endpoint: std::env::var("VIDGEN_ENDPOINT").ok(),
        api_key: std::env::var("VIDGEN_API_KEY").ok(),
        access_key: std::env::var("VIDGEN_ACCESS_KEY").ok(),
        secret_key: std::env::var("VIDGEN_SECRET_KEY").ok(),
        ..ProviderConfig::new(name)
    };
    let has_credentials = config.api_key.is_some()
        || (config.access_key.is_some() && config.secret_key.is_some());
    has_credentials.then_some(config)
}
