//! Named, saved behavior trees

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::behavior::tree::BehaviorTree;
use crate::core::error::{KernelError, Result};

/// Library of trees agents can be spawned from
///
/// Overrides installed on a live agent die with it unless promoted here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateLibrary {
    templates: BTreeMap<String, BehaviorTree>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save a tree (overrides stripped) under `name`, replacing any previous one
    pub fn save(&mut self, name: impl Into<String>, tree: &BehaviorTree) {
        let name = name.into();
        let mut stored = tree.pristine();
        stored.template = Some(name.clone());
        self.templates.insert(name, stored);
    }

    /// Save a tree with its currently winning overrides baked in
    pub fn promote(&mut self, name: impl Into<String>, tree: &BehaviorTree) {
        let name = name.into();
        let mut baked = tree.baked();
        baked.template = Some(name.clone());
        tracing::info!(
            "Promoted tree with {} overrides to template '{}'",
            tree.override_count(),
            name
        );
        self.templates.insert(name, baked);
    }

    /// Fresh copy of a template for a new agent
    pub fn instantiate(&self, name: &str) -> Result<BehaviorTree> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| KernelError::UnknownTemplate(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&BehaviorTree> {
        self.templates.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::node::{Action, Node, NodeId};
    use crate::behavior::tree::TreeBuilder;

    fn tree() -> BehaviorTree {
        let mut b = TreeBuilder::new();
        let wait = b.action(Action::Wait { ticks: 1 });
        let root = b.sequence(vec![wait]);
        b.build(root).unwrap()
    }

    #[test]
    fn test_unknown_template() {
        let lib = TemplateLibrary::new();
        assert!(matches!(lib.instantiate("ghost"), Err(KernelError::UnknownTemplate(_))));
    }

    #[test]
    fn test_save_strips_overrides() {
        let mut live = tree();
        live.install_override(NodeId(0), 1, Node::action(Action::Expire))
            .unwrap();

        let mut lib = TemplateLibrary::new();
        lib.save("idle", &live);
        lib.promote("doomed", &live);

        let idle = lib.instantiate("idle").unwrap();
        assert_eq!(idle.override_count(), 0);
        assert_eq!(idle.effective(NodeId(0)), Some(&Node::action(Action::Wait { ticks: 1 })));
        assert_eq!(idle.template.as_deref(), Some("idle"));

        let doomed = lib.instantiate("doomed").unwrap();
        assert_eq!(doomed.effective(NodeId(0)), Some(&Node::action(Action::Expire)));
        assert_eq!(lib.names().collect::<Vec<_>>(), vec!["doomed", "idle"]);
    }
}
