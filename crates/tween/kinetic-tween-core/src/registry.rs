//! Extensibility registry.
//!
//! Maps stable string identifiers to factories producing node blueprints or
//! conditions. Registration is an explicit call; there is no implicit
//! scanning. The runner and composition layer never see concrete registered
//! types, only the blueprint/condition values the factories return.

use hashbrown::HashMap;

use crate::condition::Condition;
use crate::error::RegistryError;
use crate::node::Blueprint;

type NodeFactory = Box<dyn Fn() -> Blueprint>;
type ConditionFactory = Box<dyn Fn() -> Condition>;

#[derive(Default)]
pub struct Registry {
    nodes: HashMap<String, NodeFactory>,
    conditions: HashMap<String, ConditionFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node factory under `type_id`. Re-registering an id
    /// replaces the previous factory.
    pub fn register_node(&mut self, type_id: &str, factory: impl Fn() -> Blueprint + 'static) {
        log::debug!("registering node factory '{type_id}'");
        self.nodes.insert(type_id.to_string(), Box::new(factory));
    }

    pub fn register_condition(
        &mut self,
        type_id: &str,
        factory: impl Fn() -> Condition + 'static,
    ) {
        log::debug!("registering condition factory '{type_id}'");
        self.conditions
            .insert(type_id.to_string(), Box::new(factory));
    }

    /// Produce a fresh blueprint for `type_id`.
    pub fn node(&self, type_id: &str) -> Result<Blueprint, RegistryError> {
        self.nodes
            .get(type_id)
            .map(|factory| factory())
            .ok_or_else(|| RegistryError::UnknownNode(type_id.to_string()))
    }

    /// Produce a fresh condition for `type_id`.
    pub fn condition(&self, type_id: &str) -> Result<Condition, RegistryError> {
        self.conditions
            .get(type_id)
            .map(|factory| factory())
            .ok_or_else(|| RegistryError::UnknownCondition(type_id.to_string()))
    }

    pub fn has_node(&self, type_id: &str) -> bool {
        self.nodes.contains_key(type_id)
    }

    pub fn has_condition(&self, type_id: &str) -> bool {
        self.conditions.contains_key(type_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factories_produce_fresh_values() {
        let mut registry = Registry::new();
        registry.register_node("blink", || Blueprint::wait(0.25));
        registry.register_condition("never", || Condition::custom(|| false));

        assert!(registry.has_node("blink"));
        assert!(registry.node("blink").is_ok());
        assert!(!registry.condition("never").unwrap().eval());
    }

    #[test]
    fn unknown_ids_are_reported() {
        let registry = Registry::new();
        assert_eq!(
            registry.node("missing").unwrap_err(),
            RegistryError::UnknownNode("missing".into())
        );
        assert_eq!(
            registry.condition("missing").unwrap_err(),
            RegistryError::UnknownCondition("missing".into())
        );
    }

    #[test]
    fn re_registration_replaces() {
        let mut registry = Registry::new();
        registry.register_node("n", || Blueprint::wait(0.1));
        registry.register_node("n", || Blueprint::wait(0.2));
        let bp = registry.node("n").unwrap();
        assert_eq!(bp.timing.duration, 0.2);
    }
}
