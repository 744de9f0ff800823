use crate::handler::ChainPolicy;

/// Application-wide settings.
///
/// ```ignore
/// let app = App::with_config(Config {
///     chain_policy: ChainPolicy::Once,
///     ..Default::default()
/// });
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// How repeated `next()` calls from one handler are treated.
    pub chain_policy: ChainPolicy,

    /// Largest request body accepted, in bytes. Larger bodies get a `413`.
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain_policy: ChainPolicy::Reentrant,
            max_body_bytes: 10 * 1024 * 1024, // 10 MB
        }
    }
}
