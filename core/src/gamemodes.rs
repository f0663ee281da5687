//! Multiplayer gamemodes that customise the small image and timestamp.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use hashbrown::HashMap;

use crate::error::{ProviderError, RegistryError};
use crate::presence::Timestamp;

/// Image key used when a gamemode barcode has no known art asset.
pub const UNKNOWN_GAMEMODE_KEY: &str = "unknown_gamemode";

pub type TooltipProvider = Arc<dyn Fn() -> Result<String, ProviderError> + Send + Sync>;
pub type OverrideTimeProvider = Arc<dyn Fn() -> Result<Option<Timestamp>, ProviderError> + Send + Sync>;

/// Gamemode hooks, keyed by barcode.
#[derive(Clone)]
pub struct Gamemode {
    barcode: String,
    tooltip: Option<TooltipProvider>,
    override_time: Option<OverrideTimeProvider>,
    minimum_delay: Option<f32>,
}

impl fmt::Debug for Gamemode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gamemode")
            .field("barcode", &self.barcode)
            .field("tooltip", &self.tooltip.is_some())
            .field("override_time", &self.override_time.is_some())
            .field("minimum_delay", &self.minimum_delay)
            .finish()
    }
}

impl Gamemode {
    pub fn new(barcode: impl Into<String>) -> Self {
        Self {
            barcode: barcode.into(),
            tooltip: None,
            override_time: None,
            minimum_delay: None,
        }
    }

    /// Text for the small image while this gamemode runs.
    pub fn with_tooltip<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        self.tooltip = Some(Arc::new(provider));
        self
    }

    /// Timestamp shown instead of the regular one (e.g. round timer).
    pub fn with_override_time<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> Result<Option<Timestamp>, ProviderError> + Send + Sync + 'static,
    {
        self.override_time = Some(Arc::new(provider));
        self
    }

    pub fn with_minimum_delay(mut self, secs: f32) -> Self {
        self.minimum_delay = (secs >= 0.0).then_some(secs);
        self
    }

    pub fn barcode(&self) -> &str {
        &self.barcode
    }

    pub fn minimum_delay(&self) -> Option<f32> {
        self.minimum_delay
    }

    /// Provider output, or an empty string when there is no provider or it
    /// failed.
    pub fn tooltip(&self) -> String {
        let Some(provider) = &self.tooltip else {
            return String::new();
        };
        self.guarded("tooltip", || provider()).unwrap_or_default()
    }

    pub fn override_time(&self) -> Option<Timestamp> {
        let provider = self.override_time.as_ref()?;
        self.guarded("override time", || provider()).flatten()
    }

    /// Run a provider, logging errors and panics as `None`.
    fn guarded<T>(&self, provider: &str, f: impl FnOnce() -> Result<T, ProviderError>) -> Option<T> {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                tracing::error!(gamemode = %self.barcode, provider, error = %e, "Gamemode provider failed");
                None
            }
            Err(_) => {
                tracing::error!(gamemode = %self.barcode, provider, "Gamemode provider panicked");
                None
            }
        }
    }

    /// Origin tag for timestamp overrides installed on behalf of this
    /// gamemode.
    pub fn override_origin(&self) -> String {
        override_origin(&self.barcode)
    }
}

/// Timestamp override origin for the gamemode with `barcode`.
pub fn override_origin(barcode: &str) -> String {
    format!("gamemode:{barcode}")
}

#[derive(Debug, Default)]
pub struct GamemodeRegistry {
    gamemodes: Vec<Gamemode>,
}

impl GamemodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, gamemode: Gamemode) -> Result<(), RegistryError> {
        if gamemode.barcode.trim().is_empty() {
            return Err(RegistryError::InvalidArgument(
                "gamemode barcode cannot be empty".to_string(),
            ));
        }
        if gamemode.tooltip.is_none() && gamemode.override_time.is_none() {
            return Err(RegistryError::InvalidArgument(format!(
                "gamemode '{}' needs a tooltip and/or override time provider",
                gamemode.barcode
            )));
        }
        if self.is_registered(&gamemode.barcode) {
            return Err(RegistryError::DuplicateName(gamemode.barcode));
        }

        tracing::debug!(gamemode = %gamemode.barcode, "Registered gamemode");
        self.gamemodes.push(gamemode);
        Ok(())
    }

    pub fn unregister(&mut self, barcode: &str) -> bool {
        let before = self.gamemodes.len();
        self.gamemodes.retain(|g| g.barcode != barcode);
        self.gamemodes.len() != before
    }

    pub fn is_registered(&self, barcode: &str) -> bool {
        self.get(barcode).is_some()
    }

    pub fn get(&self, barcode: &str) -> Option<&Gamemode> {
        self.gamemodes.iter().find(|g| g.barcode == barcode)
    }

    pub fn len(&self) -> usize {
        self.gamemodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gamemodes.is_empty()
    }

    pub fn barcodes(&self) -> impl Iterator<Item = &str> {
        self.gamemodes.iter().map(|g| g.barcode.as_str())
    }
}

/// Barcode → art asset key table, published as a flat JSON object.
#[derive(Debug, Clone, Default)]
pub struct KnownGamemodeKeys {
    keys: HashMap<String, String>,
}

impl KnownGamemodeKeys {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let keys: std::collections::HashMap<String, String> = serde_json::from_str(json)?;
        Ok(Self {
            keys: keys.into_iter().collect(),
        })
    }

    pub fn insert(&mut self, barcode: impl Into<String>, key: impl Into<String>) {
        self.keys.insert(barcode.into(), key.into());
    }

    pub fn key_for(&self, barcode: &str) -> &str {
        self.keys.get(barcode).map_or(UNKNOWN_GAMEMODE_KEY, String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// The gamemode the lobby is currently playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveGamemode {
    pub barcode: String,
    pub title: String,
}

impl ActiveGamemode {
    pub fn new(barcode: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            barcode: barcode.into(),
            title: title.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_rules() {
        let mut registry = GamemodeRegistry::new();

        let err = registry.register(Gamemode::new("Lakatrazz.Deathmatch")).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArgument(_)));

        let err = registry
            .register(Gamemode::new(" ").with_tooltip(|| Ok(String::new())))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArgument(_)));

        registry
            .register(Gamemode::new("Lakatrazz.Deathmatch").with_tooltip(|| Ok("#1 place".to_string())))
            .unwrap();
        let err = registry
            .register(Gamemode::new("Lakatrazz.Deathmatch").with_override_time(|| Ok(None)))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("Lakatrazz.Deathmatch".to_string()));

        assert_eq!(registry.len(), 1);
        assert!(registry.unregister("Lakatrazz.Deathmatch"));
        assert!(!registry.unregister("Lakatrazz.Deathmatch"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_failing_providers_degrade() {
        let gamemode = Gamemode::new("Lakatrazz.Entangled")
            .with_tooltip(|| Err("no partner data".into()))
            .with_override_time(|| Err("no round".into()));
        assert_eq!(gamemode.tooltip(), "");
        assert_eq!(gamemode.override_time(), None);
    }

    #[test]
    fn test_panicking_providers_degrade() {
        let gamemode = Gamemode::new("Lakatrazz.Smash Bones")
            .with_tooltip(|| panic!("tooltip bug"))
            .with_override_time(|| panic!("timer bug"));
        assert_eq!(gamemode.tooltip(), "");
        assert_eq!(gamemode.override_time(), None);
    }

    #[test]
    fn test_providers_and_delay() {
        let round = Timestamp::new(Some(1), Some(2));
        let gamemode = Gamemode::new("Lakatrazz.Hide And Seek")
            .with_tooltip(|| Ok("Hider | 3 hiders left!".to_string()))
            .with_override_time(move || Ok(Some(round)))
            .with_minimum_delay(2.0);

        assert_eq!(gamemode.tooltip(), "Hider | 3 hiders left!");
        assert_eq!(gamemode.override_time(), Some(round));
        assert_eq!(gamemode.minimum_delay(), Some(2.0));
        assert_eq!(gamemode.override_origin(), "gamemode:Lakatrazz.Hide And Seek");
        assert_eq!(Gamemode::new("x").with_minimum_delay(-1.0).minimum_delay(), None);
    }

    #[test]
    fn test_known_keys() {
        let keys = KnownGamemodeKeys::from_json(r#"{"Lakatrazz.Deathmatch": "deathmatch"}"#).unwrap();
        assert_eq!(keys.key_for("Lakatrazz.Deathmatch"), "deathmatch");
        assert_eq!(keys.key_for("Someone.Custom"), UNKNOWN_GAMEMODE_KEY);
        assert!(KnownGamemodeKeys::from_json("[1, 2]").is_err());
    }
}
