//! Named, aliasable value providers.
//!
//! The registry is plain data: it validates and stores placeholders and
//! answers lookups. Scanning templates for tokens lives in
//! [`super::template`].

use std::fmt;
use std::sync::Arc;

use hashbrown::HashSet;

use crate::error::{ProviderError, RegistryError};

/// Provider callback. Receives the `|`-separated arguments of the token.
pub type Resolver = Arc<dyn Fn(&[&str]) -> Result<String, ProviderError> + Send + Sync>;

/// A named dynamic value usable as `%name%` inside templates.
#[derive(Clone)]
pub struct Placeholder {
    name: String,
    aliases: Vec<String>,
    resolver: Resolver,
    minimum_delay: Option<f32>,
}

impl fmt::Debug for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Placeholder")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("minimum_delay", &self.minimum_delay)
            .finish_non_exhaustive()
    }
}

impl Placeholder {
    pub fn new<F>(name: impl Into<String>, resolver: F) -> Self
    where
        F: Fn(&[&str]) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            resolver: Arc::new(resolver),
            minimum_delay: None,
        }
    }

    pub fn builder(name: impl Into<String>) -> PlaceholderBuilder {
        PlaceholderBuilder {
            name: name.into(),
            ..PlaceholderBuilder::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Minimum seconds between refreshes while this placeholder is shown.
    /// Negative values (the `-1` "unconstrained" convention) clear the hint.
    pub fn with_minimum_delay(mut self, secs: f32) -> Self {
        self.minimum_delay = (secs >= 0.0).then_some(secs);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// `None` when the placeholder imposes no refresh constraint
    pub fn minimum_delay(&self) -> Option<f32> {
        self.minimum_delay
    }

    /// Primary name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Call the provider directly. Errors are returned as-is; the template
    /// engine is what turns them into empty output.
    pub fn resolve(&self, args: &[&str]) -> Result<String, ProviderError> {
        (self.resolver)(args)
    }
}

/// Builder for placeholders assembled piecemeal (e.g. by plugins).
#[derive(Default)]
pub struct PlaceholderBuilder {
    name: String,
    aliases: Vec<String>,
    minimum_delay: Option<f32>,
    resolver: Option<Resolver>,
}

impl PlaceholderBuilder {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn minimum_delay(mut self, secs: f32) -> Self {
        self.minimum_delay = (secs >= 0.0).then_some(secs);
        self
    }

    pub fn resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&[&str]) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn build(self) -> Result<Placeholder, RegistryError> {
        let Some(resolver) = self.resolver else {
            return Err(RegistryError::InvalidArgument(format!(
                "placeholder '{}' has no resolver",
                self.name
            )));
        };
        Ok(Placeholder {
            name: self.name,
            aliases: self.aliases,
            resolver,
            minimum_delay: self.minimum_delay,
        })
    }
}

/// Registration-ordered set of placeholders. Names and aliases share one
/// namespace.
#[derive(Debug, Default)]
pub struct PlaceholderRegistry {
    entries: Vec<Placeholder>,
    taken: HashSet<String>,
    sealed: bool,
}

impl PlaceholderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a placeholder. Fails if its name is unusable or if its name or
    /// any alias is already taken by another entry's name or alias.
    pub fn register(&mut self, placeholder: Placeholder) -> Result<(), RegistryError> {
        {
            let mut own = HashSet::new();
            for name in placeholder.names() {
                validate_name(name)?;
                if self.taken.contains(name) || !own.insert(name) {
                    return Err(RegistryError::DuplicateName(name.to_string()));
                }
            }
        }

        if self.sealed {
            tracing::error!(
                placeholder = %placeholder.name(),
                "BUG: placeholder registered after the presence loop started"
            );
        }

        self.taken.extend(placeholder.names().map(str::to_string));
        tracing::debug!(placeholder = %placeholder.name(), "Registered placeholder");
        self.entries.push(placeholder);
        Ok(())
    }

    /// Shorthand for a placeholder without aliases or delay hint
    pub fn register_fn<F>(&mut self, name: impl Into<String>, resolver: F) -> Result<(), RegistryError>
    where
        F: Fn(&[&str]) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        self.register(Placeholder::new(name, resolver))
    }

    /// Remove by primary name. Returns whether an entry was removed.
    pub fn unregister(&mut self, name: &str) -> bool {
        let Some(index) = self.entries.iter().position(|p| p.name == name) else {
            return false;
        };
        let removed = self.entries.remove(index);
        for n in removed.names() {
            self.taken.remove(n);
        }
        true
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Lookup by primary name only.
    pub fn find(&self, name: &str) -> Option<&Placeholder> {
        self.entries.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Primary names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|p| p.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Placeholder> {
        self.entries.iter()
    }

    /// Mark the registry as in steady-state use. Later registrations still
    /// succeed but are reported as bugs.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}

fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::InvalidArgument(
            "placeholder name cannot be empty".to_string(),
        ));
    }
    if name.contains(['%', '|']) {
        return Err(RegistryError::InvalidArgument(format!(
            "placeholder name '{name}' cannot contain '%' or '|'"
        )));
    }
    Ok(())
}
