//! Mutation observation for document changes.

use crate::document::NodeId;
use crate::error::{DomError, DomResult};
use derive_more::Display;
use std::sync::Arc;

/// Handle returned by `Document::observe`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[display("observer#{_0}")]
pub struct ObserverId(pub(crate) u64);

/// Callback receiving a batch of records.
pub type MutationCallback = Arc<dyn Fn(&[MutationRecord]) + Send + Sync>;

/// Mutation observer initialization options.
#[derive(Clone, Debug, Default)]
pub struct MutationObserverInit {
    /// Observe child list changes.
    pub child_list: bool,
    /// Observe attribute changes.
    pub attributes: bool,
    /// Observe entire subtree.
    pub subtree: bool,
    /// Filter to specific attributes.
    pub attribute_filter: Option<Vec<String>>,
}

impl MutationObserverInit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child_list(mut self) -> Self {
        self.child_list = true;
        self
    }

    pub fn attributes(mut self) -> Self {
        self.attributes = true;
        self
    }

    pub fn subtree(mut self) -> Self {
        self.subtree = true;
        self
    }

    pub fn attribute_filter(mut self, filter: Vec<String>) -> Self {
        self.attribute_filter = Some(filter);
        self.attributes = true;
        self
    }

    pub(crate) fn validate(&self) -> DomResult<()> {
        if !self.child_list && !self.attributes {
            return Err(DomError::InvalidObserverOptions(
                "at least one of childList or attributes must be true",
            ));
        }
        Ok(())
    }

    /// Whether a record passes these options.
    pub fn accepts(&self, record: &MutationRecord) -> bool {
        match record.mutation_type {
            MutationType::ChildList => self.child_list,
            MutationType::Attributes => {
                if !self.attributes {
                    return false;
                }
                match (&self.attribute_filter, &record.attribute_name) {
                    (Some(filter), Some(name)) => filter.iter().any(|f| f == name),
                    _ => true,
                }
            }
        }
    }
}

/// Kind of mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationType {
    ChildList,
    Attributes,
}

/// Mutation record.
#[derive(Clone, Debug)]
pub struct MutationRecord {
    /// Type of mutation.
    pub mutation_type: MutationType,
    /// Target node.
    pub target: NodeId,
    /// Added nodes.
    pub added_nodes: Vec<NodeId>,
    /// Attribute name (for attribute mutations).
    pub attribute_name: Option<String>,
    /// Old value.
    pub old_value: Option<String>,
}

impl MutationRecord {
    pub fn child_added(target: NodeId) -> Self {
        Self {
            mutation_type: MutationType::ChildList,
            target,
            added_nodes: vec![target],
            attribute_name: None,
            old_value: None,
        }
    }

    pub fn attribute(target: NodeId, name: &str, old_value: Option<String>) -> Self {
        Self {
            mutation_type: MutationType::Attributes,
            target,
            added_nodes: Vec::new(),
            attribute_name: Some(name.to_string()),
            old_value,
        }
    }
}

/// Registered observer.
#[derive(Clone)]
pub(crate) struct MutationObserver {
    pub(crate) callback: MutationCallback,
    pub(crate) options: MutationObserverInit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_validate_requires_kind() {
        assert!(MutationObserverInit::new().validate().is_err());
        assert!(MutationObserverInit::new().child_list().validate().is_ok());
    }

    #[test]
    fn test_attribute_filter() {
        let mut nodes: SlotMap<NodeId, ()> = SlotMap::with_key();
        let node = nodes.insert(());
        let init = MutationObserverInit::new().attribute_filter(vec!["target".to_string()]);

        assert!(init.accepts(&MutationRecord::attribute(node, "target", None)));
        assert!(!init.accepts(&MutationRecord::attribute(node, "class", None)));
        assert!(!init.accepts(&MutationRecord::child_added(node)));
    }
}
