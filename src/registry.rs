use std::cell::RefCell;
use std::collections::HashMap;

use crate::template::Template;

/// Partials a template carries with it, forming a private namespace that
/// shadows the registry while that template renders.
pub type PartialMap = HashMap<String, Template>;

/// Resolver invoked for dynamic partial names not yet in the registry.
pub type DynamicResolver = Box<dyn Fn(&str) -> Option<Template>>;

/// Named partials for one rendering subsystem instance.
///
/// The registry is plain owned state: the embedding application constructs
/// one, registers its templates, and passes it by reference into every
/// render. Dynamic resolutions are cached here for the registry's lifetime,
/// so a given target name hits the resolver at most once.
#[derive(Default)]
pub struct PartialRegistry {
    templates: RefCell<HashMap<String, Template>>,
    resolver: Option<DynamicResolver>,
}

impl PartialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with a resolver for dynamically referenced
    /// partial names. The resolver must complete synchronously; returning
    /// `None` makes the reference render as nothing (with a warning).
    pub fn with_resolver<F>(resolver: F) -> Self
    where
        F: Fn(&str) -> Option<Template> + 'static,
    {
        Self {
            templates: RefCell::new(HashMap::new()),
            resolver: Some(Box::new(resolver)),
        }
    }

    pub fn set_resolver<F>(&mut self, resolver: F)
    where
        F: Fn(&str) -> Option<Template> + 'static,
    {
        self.resolver = Some(Box::new(resolver));
    }

    /// Registers a template under `name`, replacing any previous entry.
    pub fn register<N: Into<String>>(&self, name: N, template: Template) {
        self.templates.borrow_mut().insert(name.into(), template);
    }

    pub fn get(&self, name: &str) -> Option<Template> {
        self.templates.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.borrow().contains_key(name)
    }

    /// Resolves a dynamically referenced partial, caching the result.
    pub(crate) fn resolve_dynamic(&self, name: &str) -> Option<Template> {
        if let Some(found) = self.get(name) {
            return Some(found);
        }
        let resolved = self.resolver.as_ref().and_then(|resolve| resolve(name))?;
        self.templates
            .borrow_mut()
            .insert(name.to_string(), resolved.clone());
        Some(resolved)
    }

    /// Swaps the cached entry for `name`, used when a dynamic partial gets
    /// a view attached on first render.
    pub(crate) fn replace(&self, name: &str, template: Template) {
        self.templates.borrow_mut().insert(name.to_string(), template);
    }
}
