//! Extension points for other mods.
//!
//! A plugin gets one shot at registration through [`PluginContext`]. After
//! the manager has started, the placeholder registry is sealed and late
//! registrations are reported as bugs.

use crate::error::RegistryError;
use crate::events::EventHooks;
use crate::gamemodes::GamemodeRegistry;
use crate::placeholders::PlaceholderRegistry;

/// Mutable access to everything a plugin may extend.
pub struct PluginContext<'a> {
    pub placeholders: &'a mut PlaceholderRegistry,
    pub gamemodes: &'a mut GamemodeRegistry,
    pub hooks: &'a mut EventHooks,
}

pub trait Plugin: Send {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn author(&self) -> &str {
        ""
    }

    /// Register placeholders, gamemodes and hooks.
    fn init(&mut self, ctx: &mut PluginContext<'_>) -> Result<(), RegistryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub author: String,
}

#[derive(Default)]
pub struct PluginManager {
    plugins: Vec<Box<dyn Plugin>>,
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.plugins.iter().map(|p| p.name())).finish()
    }
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialise `plugin` against `ctx` and keep it. A failed `init` is
    /// returned and the plugin is dropped, though anything it registered
    /// before failing stays registered.
    pub fn register(
        &mut self,
        mut plugin: Box<dyn Plugin>,
        ctx: &mut PluginContext<'_>,
    ) -> Result<(), RegistryError> {
        let name = plugin.name().trim().to_string();
        if name.is_empty() {
            return Err(RegistryError::InvalidArgument("plugin name cannot be empty".to_string()));
        }
        if self.is_registered(&name) {
            return Err(RegistryError::DuplicateName(name));
        }

        plugin.init(ctx)?;
        tracing::info!(
            plugin = %name,
            version = %plugin.version(),
            author = %plugin.author(),
            "Registered plugin"
        );
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name().trim() == name)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn plugins(&self) -> Vec<PluginInfo> {
        self.plugins
            .iter()
            .map(|p| PluginInfo {
                name: p.name().to_string(),
                version: p.version().to_string(),
                author: p.author().to_string(),
            })
            .collect()
    }
}
