//! DOM Document implementation.

use crate::attributes::AttributeMap;
use crate::error::{DomError, DomResult};
use crate::mutation::{
    MutationCallback, MutationObserver, MutationObserverInit, MutationRecord, ObserverId,
};
use indexmap::IndexMap;
use parking_lot::RwLock;
use slotmap::{new_key_type, SlotMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;

new_key_type! {
    /// Unique identifier for a DOM node.
    pub struct NodeId;
}

/// An element node.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,
    pub attributes: AttributeMap,
}

impl Element {
    pub fn new(tag: &str, attributes: AttributeMap) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes,
        }
    }

    pub fn is_anchor(&self) -> bool {
        self.tag == "a"
    }
}

/// The document hosting the app and the embedded player frame.
pub struct Document {
    url: Url,
    nodes: RwLock<SlotMap<NodeId, Element>>,
    /// Insertion order, used for tree-order queries.
    order: RwLock<Vec<NodeId>>,
    observers: RwLock<IndexMap<ObserverId, MutationObserver>>,
    next_observer: AtomicU64,
}

impl Document {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            nodes: RwLock::new(SlotMap::with_key()),
            order: RwLock::new(Vec::new()),
            observers: RwLock::new(IndexMap::new()),
            next_observer: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Create an element and append it to the body.
    pub fn create_element(&self, tag: &str, attributes: AttributeMap) -> NodeId {
        let id = self.nodes.write().insert(Element::new(tag, attributes));
        self.order.write().push(id);
        self.notify(MutationRecord::child_added(id));
        id
    }

    /// Remove an element.
    pub fn remove_element(&self, node: NodeId) -> Option<Element> {
        let removed = self.nodes.write().remove(node);
        if removed.is_some() {
            self.order.write().retain(|n| *n != node);
        }
        removed
    }

    /// Snapshot of an element.
    pub fn element(&self, node: NodeId) -> Option<Element> {
        self.nodes.read().get(node).cloned()
    }

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes
            .read()
            .get(node)
            .and_then(|e| e.attributes.get(name).map(str::to_string))
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> DomResult<()> {
        let old = {
            let mut nodes = self.nodes.write();
            let element = nodes.get_mut(node).ok_or(DomError::UnknownNode)?;
            element.attributes.set(name, value)
        };
        self.notify(MutationRecord::attribute(node, name, old));
        Ok(())
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) -> DomResult<Option<String>> {
        let old = {
            let mut nodes = self.nodes.write();
            let element = nodes.get_mut(node).ok_or(DomError::UnknownNode)?;
            element.attributes.remove(name)
        };
        if old.is_some() {
            self.notify(MutationRecord::attribute(node, name, old.clone()));
        }
        Ok(old)
    }

    /// All elements with the given tag, in tree order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        let tag = tag.to_ascii_lowercase();
        let nodes = self.nodes.read();
        self.order
            .read()
            .iter()
            .copied()
            .filter(|id| nodes.get(*id).map_or(false, |e| e.tag == tag))
            .collect()
    }

    /// Anchors with an `href`.
    pub fn anchors(&self) -> Vec<NodeId> {
        let nodes = self.nodes.read();
        self.order
            .read()
            .iter()
            .copied()
            .filter(|id| {
                nodes
                    .get(*id)
                    .map_or(false, |e| e.is_anchor() && e.attributes.contains("href"))
            })
            .collect()
    }

    /// Resolve a possibly relative URL against the document URL.
    pub fn resolve_url(&self, href: &str) -> DomResult<Url> {
        self.url
            .join(href)
            .map_err(|e| DomError::InvalidUrl(format!("{}: {}", href, e)))
    }

    /// Register a mutation observer on the whole document.
    pub fn observe(
        &self,
        options: MutationObserverInit,
        callback: MutationCallback,
    ) -> DomResult<ObserverId> {
        options.validate()?;
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::SeqCst));
        self.observers
            .write()
            .insert(id, MutationObserver { callback, options });
        Ok(id)
    }

    /// Stop an observer.
    pub fn disconnect(&self, id: ObserverId) -> bool {
        self.observers.write().shift_remove(&id).is_some()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    fn notify(&self, record: MutationRecord) {
        let interested: Vec<(ObserverId, MutationCallback)> = self
            .observers
            .read()
            .iter()
            .filter(|(_, o)| o.options.accepts(&record))
            .map(|(id, o)| (*id, o.callback.clone()))
            .collect();

        let batch = [record];
        for (id, callback) in interested {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(&batch))).is_err() {
                tracing::error!("{} panicked while handling a mutation", id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::MutationType;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn doc() -> Document {
        Document::new(Url::parse("https://app.example/watch").unwrap())
    }

    #[test]
    fn test_create_and_query() {
        let doc = doc();
        let a = doc.create_element("A", AttributeMap::from_pairs([("href", "/home")]));
        doc.create_element("div", AttributeMap::new());
        let bare = doc.create_element("a", AttributeMap::new());

        assert_eq!(doc.anchors(), vec![a]);
        assert_eq!(doc.elements_by_tag("a"), vec![a, bare]);
        assert_eq!(doc.get_attribute(a, "href").as_deref(), Some("/home"));
    }

    #[test]
    fn test_resolve_url() {
        let doc = doc();
        assert_eq!(
            doc.resolve_url("/library").unwrap().as_str(),
            "https://app.example/library"
        );
        assert_eq!(
            doc.resolve_url("https://elsewhere.example/x").unwrap().host_str(),
            Some("elsewhere.example")
        );
    }

    #[test]
    fn test_observer_sees_insertions_until_disconnected() {
        let doc = doc();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = doc
            .observe(
                MutationObserverInit::new().child_list().subtree(),
                Arc::new(move |records: &[MutationRecord]| {
                    sink.lock().extend(records.iter().map(|r| r.mutation_type));
                }),
            )
            .unwrap();

        doc.create_element("a", AttributeMap::new());
        assert_eq!(*seen.lock(), vec![MutationType::ChildList]);

        assert!(doc.disconnect(id));
        doc.create_element("a", AttributeMap::new());
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_attribute_records() {
        let doc = doc();
        let a = doc.create_element("a", AttributeMap::from_pairs([("target", "_blank")]));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        doc.observe(
            MutationObserverInit::new().attribute_filter(vec!["target".to_string()]),
            Arc::new(move |records: &[MutationRecord]| {
                sink.lock()
                    .extend(records.iter().filter_map(|r| r.old_value.clone()));
            }),
        )
        .unwrap();

        assert_eq!(doc.remove_attribute(a, "target").unwrap().as_deref(), Some("_blank"));
        assert_eq!(*seen.lock(), vec!["_blank".to_string()]);
        // Removing a missing attribute produces no record.
        assert_eq!(doc.remove_attribute(a, "target").unwrap(), None);
        assert_eq!(seen.lock().len(), 1);
    }
}
