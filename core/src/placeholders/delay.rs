//! Refresh cadence derived from the placeholders a profile embeds.

use labpresence_types::{MIN_REFRESH_DELAY, RpcConfig};

use super::registry::PlaceholderRegistry;
use super::template::TemplateEngine;

#[derive(Debug, Clone, Copy)]
pub struct DelayResolver<'r> {
    registry: &'r PlaceholderRegistry,
}

impl<'r> DelayResolver<'r> {
    pub fn new(registry: &'r PlaceholderRegistry) -> Self {
        Self { registry }
    }

    /// Fastest safe cadence for `config`: the largest minimum-delay hint of
    /// any placeholder used in its details or state, floored at 0.1 s.
    /// Placeholders without a hint contribute nothing.
    pub fn minimum_delay_for(&self, config: &RpcConfig) -> f32 {
        let engine = TemplateEngine::new(self.registry);
        config
            .templates()
            .flat_map(|text| engine.find_placeholders_in(text))
            .filter_map(|placeholder| placeholder.minimum_delay())
            .fold(MIN_REFRESH_DELAY, f32::max)
    }

    /// The configured delay raised, never lowered, to satisfy the
    /// placeholders in `config`.
    pub fn effective_delay(&self, config: &RpcConfig, configured: f32) -> f32 {
        configured.max(self.minimum_delay_for(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholders::Placeholder;

    fn registry() -> PlaceholderRegistry {
        let mut registry = PlaceholderRegistry::new();
        registry
            .register(Placeholder::new("fps", |_| Ok("72".to_string())).with_minimum_delay(4.0))
            .unwrap();
        registry.register_fn("levelName", |_| Ok("Hub".to_string())).unwrap();
        registry
            .register(Placeholder::new("health", |_| Ok("100".to_string())).with_minimum_delay(1.5))
            .unwrap();
        registry
    }

    #[test]
    fn test_floor_without_placeholders() {
        let registry = registry();
        let resolver = DelayResolver::new(&registry);
        assert_eq!(resolver.minimum_delay_for(&RpcConfig::new("Just text")), 0.1);
        assert_eq!(resolver.minimum_delay_for(&RpcConfig::default()), 0.1);
        // unconstrained placeholders keep the floor
        assert_eq!(resolver.minimum_delay_for(&RpcConfig::new("%levelName%")), 0.1);
    }

    #[test]
    fn test_hint_raises_configured_delay() {
        let registry = registry();
        let resolver = DelayResolver::new(&registry);
        let config = RpcConfig::with_state("%levelName%", "%fps% FPS");

        assert_eq!(resolver.minimum_delay_for(&config), 4.0);
        assert_eq!(resolver.effective_delay(&config, 0.75), 4.0);
        assert_eq!(resolver.effective_delay(&config, 5.0), 5.0);
    }

    #[test]
    fn test_largest_hint_wins_across_fields() {
        let registry = registry();
        let resolver = DelayResolver::new(&registry);
        let config = RpcConfig::with_state("HP %health%", "%fps%");
        assert_eq!(resolver.minimum_delay_for(&config), 4.0);

        let config = RpcConfig::new("HP %health%");
        assert_eq!(resolver.minimum_delay_for(&config), 1.5);
    }

    #[test]
    fn test_escaped_tokens_do_not_constrain() {
        let registry = registry();
        let resolver = DelayResolver::new(&registry);
        assert_eq!(resolver.minimum_delay_for(&RpcConfig::new(r"\%fps\%")), 0.1);
    }
}
