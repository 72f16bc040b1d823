//! Component tree store - an arena of scene components indexed by id
//!
//! Nodes live in a map keyed by `ComponentId`. Child lookup goes through a
//! derived index (parent id -> child ids, insertion ordered) that is kept in
//! step with every mutation. Every mutation is published as a `TreeEvent`.

use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::component::{ComponentError, ComponentId, ComponentKind, SceneComponent, SettingsPatch};
use crate::registry::{ComponentRegistry, SceneTemplate};

/// Change notification for tree observers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum TreeEvent {
    /// The whole tree was replaced
    Replaced { count: usize },
    Added(ComponentId),
    Updated(ComponentId),
    /// Ids removed by one remove call, target first
    Removed(Vec<ComponentId>),
}

/// One step of a depth-first walk
#[derive(Debug, Clone, Copy)]
pub struct WalkEntry<'a> {
    pub depth: usize,
    pub component: &'a SceneComponent,
}

/// Mutable, observable forest of scene components
pub struct ComponentTree {
    registry: ComponentRegistry,
    nodes: HashMap<ComponentId, SceneComponent>,
    /// Insertion order of node ids
    order: Vec<ComponentId>,
    /// Derived index: parent id -> ids of present nodes naming it as parent
    children: HashMap<ComponentId, Vec<ComponentId>>,
    events: broadcast::Sender<TreeEvent>,
}

impl Default for ComponentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ComponentTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentTree")
            .field("nodes", &self.order.len())
            .finish()
    }
}

impl ComponentTree {
    /// Create an empty tree
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(100);
        Self {
            registry: ComponentRegistry::new(),
            nodes: HashMap::new(),
            order: Vec::new(),
            children: HashMap::new(),
            events,
        }
    }

    /// Build a tree from previously saved components, keeping their order
    pub fn from_components(components: Vec<SceneComponent>) -> Self {
        let mut tree = Self::new();
        for component in components {
            tree.insert(component);
        }
        tree
    }

    /// Subscribe to tree changes
    pub fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: TreeEvent) {
        let _ = self.events.send(event);
    }

    /// Append a node. A node whose id is already present is dropped; the
    /// first one with that id wins.
    fn insert(&mut self, component: SceneComponent) {
        if self.nodes.contains_key(&component.id) {
            warn!(id = %component.id, "Skipping component with duplicate id");
            return;
        }
        if let Some(parent_id) = &component.parent_id {
            self.children
                .entry(parent_id.clone())
                .or_default()
                .push(component.id.clone());
        }
        self.order.push(component.id.clone());
        self.nodes.insert(component.id.clone(), component);
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.order.clear();
        self.children.clear();
    }

    /// Replace the whole tree with the default scene
    pub fn initialize_default_scene(&mut self) {
        self.initialize_from_template(&SceneTemplate::default());
    }

    /// Replace the whole tree with an instantiated template
    pub fn initialize_from_template(&mut self, template: &SceneTemplate) {
        let components = self.registry.create_scene(template);
        self.replace(components);
    }

    /// Replace the whole tree with the given components
    pub fn replace(&mut self, components: Vec<SceneComponent>) {
        self.clear();
        for component in components {
            self.insert(component);
        }
        debug!(count = self.order.len(), "Replaced component tree");
        self.publish(TreeEvent::Replaced {
            count: self.order.len(),
        });
    }

    /// Initialize the default scene only if the tree is empty.
    /// Returns true if initialization happened.
    pub fn ensure_default_scene(&mut self, template: &SceneTemplate) -> bool {
        if !self.is_empty() {
            return false;
        }
        self.initialize_from_template(template);
        true
    }

    /// Create and append a component. Placement is not validated.
    pub fn add_component(&mut self, kind: ComponentKind, parent_id: Option<ComponentId>) -> ComponentId {
        let component = self.registry.create_component(kind, parent_id);
        let id = component.id.clone();
        debug!(id = %id, kind = %kind, parent = ?component.parent_id, "Adding component");
        self.insert(component);
        self.publish(TreeEvent::Added(id.clone()));
        id
    }

    /// Create a component by type tag and append it. Placement is not validated.
    pub fn add_component_by_tag(
        &mut self,
        tag: &str,
        parent_id: Option<ComponentId>,
    ) -> Result<ComponentId, ComponentError> {
        let kind = tag.parse::<ComponentKind>()?;
        Ok(self.add_component(kind, parent_id))
    }

    /// Validate placement first, then append
    pub fn try_add_component(
        &mut self,
        kind: ComponentKind,
        parent_id: Option<ComponentId>,
    ) -> Result<ComponentId, ComponentError> {
        let component = self.registry.create_component(kind, parent_id);
        self.registry.check_placement(&component, self)?;

        let id = component.id.clone();
        self.insert(component);
        self.publish(TreeEvent::Added(id.clone()));
        Ok(id)
    }

    /// Shallow-merge a settings patch into the node with this id.
    ///
    /// Returns false if no such node exists. Never touches type or parent.
    pub fn update_component(
        &mut self,
        id: &ComponentId,
        patch: SettingsPatch,
    ) -> Result<bool, ComponentError> {
        let Some(component) = self.nodes.get_mut(id) else {
            debug!(id = %id, "Update for unknown component ignored");
            return Ok(false);
        };

        component.settings.merge(patch)?;
        debug!(id = %id, "Updated component settings");
        self.publish(TreeEvent::Updated(id.clone()));
        Ok(true)
    }

    /// Remove a node and its direct children.
    ///
    /// Grandchildren are left in place with a parent id that no longer
    /// resolves; see `orphans`. Returns the removed ids, target first.
    pub fn remove_component(&mut self, id: &ComponentId) -> Vec<ComponentId> {
        let Some(target) = self.nodes.remove(id) else {
            return Vec::new();
        };

        let mut removed = vec![target.id.clone()];
        if let Some(parent_id) = &target.parent_id {
            if let Some(siblings) = self.children.get_mut(parent_id) {
                siblings.retain(|c| c != id);
            }
        }

        // Bounded: one level below the target
        for child_id in self.children.remove(id).unwrap_or_default() {
            if self.nodes.remove(&child_id).is_some() {
                removed.push(child_id);
            }
        }

        self.order.retain(|o| !removed.contains(o));
        debug!(id = %id, removed = removed.len(), "Removed component");
        self.publish(TreeEvent::Removed(removed.clone()));
        removed
    }

    /// Remove a node unless it is a core component
    pub fn try_remove_component(
        &mut self,
        id: &ComponentId,
    ) -> Result<Vec<ComponentId>, ComponentError> {
        if self.nodes.get(id).is_some_and(|c| c.is_core) {
            return Err(ComponentError::CoreComponent(id.clone()));
        }
        Ok(self.remove_component(id))
    }

    pub fn get(&self, id: &ComponentId) -> Option<&SceneComponent> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All components in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &SceneComponent> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Components without a parent
    pub fn roots(&self) -> impl Iterator<Item = &SceneComponent> {
        self.iter().filter(|c| c.is_root())
    }

    /// Direct children of a node, in insertion order
    pub fn children(&self, id: &ComponentId) -> Vec<&SceneComponent> {
        self.children
            .get(id)
            .map(|ids| ids.iter().filter_map(|cid| self.nodes.get(cid)).collect())
            .unwrap_or_default()
    }

    /// Components whose parent id does not resolve in this tree
    pub fn orphans(&self) -> Vec<&SceneComponent> {
        self.iter()
            .filter(|c| {
                c.parent_id
                    .as_ref()
                    .is_some_and(|parent| !self.nodes.contains_key(parent))
            })
            .collect()
    }

    /// Iterative depth-first walk from every root, children in insertion order
    pub fn walk(&self) -> Vec<WalkEntry<'_>> {
        let mut entries = Vec::with_capacity(self.order.len());
        let mut stack: Vec<(usize, &SceneComponent)> =
            self.roots().map(|root| (0, root)).collect();
        stack.reverse();

        while let Some((depth, component)) = stack.pop() {
            entries.push(WalkEntry { depth, component });
            for child in self.children(&component.id).into_iter().rev() {
                stack.push((depth + 1, child));
            }
        }

        entries
    }

    /// Owned copy of all components in insertion order
    pub fn snapshot(&self) -> Vec<SceneComponent> {
        self.iter().cloned().collect()
    }
}
