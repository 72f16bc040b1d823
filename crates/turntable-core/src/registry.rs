//! Component registry - creates components, validates placement, and
//! builds the default scene from a declarative template

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::component::{ComponentError, ComponentId, ComponentKind, SceneComponent};
use crate::tree::ComponentTree;

/// One node of a scene template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateNode {
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TemplateNode>,
}

impl TemplateNode {
    pub fn leaf(kind: ComponentKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }
}

/// Ordered tree of component kinds instantiated by `create_scene`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneTemplate {
    #[serde(default)]
    pub root: Vec<TemplateNode>,
}

impl Default for SceneTemplate {
    fn default() -> Self {
        Self {
            root: vec![TemplateNode {
                kind: ComponentKind::UserModel,
                children: vec![
                    TemplateNode::leaf(ComponentKind::Edges),
                    TemplateNode::leaf(ComponentKind::Material),
                    TemplateNode::leaf(ComponentKind::Outlines),
                ],
            }],
        }
    }
}

impl SceneTemplate {
    /// Parse a template from TOML (`[[root]]` tables with nested `children`)
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Stateless factory and validator over the type catalog
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentRegistry;

impl ComponentRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Create a component with fresh id and default settings.
    ///
    /// Placement is not checked here; call `validate_component` first.
    pub fn create_component(
        &self,
        kind: ComponentKind,
        parent_id: Option<ComponentId>,
    ) -> SceneComponent {
        let descriptor = kind.descriptor();
        SceneComponent {
            id: ComponentId::generate(),
            settings: descriptor.default_settings(),
            parent_id,
            is_core: descriptor.is_core,
        }
    }

    /// Create a component from a string type tag
    pub fn create_component_by_tag(
        &self,
        tag: &str,
        parent_id: Option<ComponentId>,
    ) -> Result<SceneComponent, ComponentError> {
        let kind = tag.parse::<ComponentKind>()?;
        Ok(self.create_component(kind, parent_id))
    }

    /// Check whether `component` may be placed into `tree`
    pub fn validate_component(&self, component: &SceneComponent, tree: &ComponentTree) -> bool {
        self.check_placement(component, tree).is_ok()
    }

    /// Like `validate_component`, but reports why placement is rejected
    pub fn check_placement(
        &self,
        component: &SceneComponent,
        tree: &ComponentTree,
    ) -> Result<(), ComponentError> {
        let descriptor = component.kind().descriptor();
        let reject = |parent: String| ComponentError::InvalidPlacement {
            id: component.id.clone(),
            kind: component.kind(),
            parent,
        };

        let Some(parent_id) = &component.parent_id else {
            if descriptor.needs_parent() {
                return Err(reject("<root>".to_string()));
            }
            return Ok(());
        };

        let parent = tree
            .get(parent_id)
            .ok_or_else(|| reject(format!("missing parent {}", parent_id)))?;

        if !parent.kind().descriptor().allows_child(component.kind()) {
            return Err(reject(parent.kind().to_string()));
        }

        if descriptor.needs_parent() && !descriptor.requires_parent.contains(&parent.kind()) {
            return Err(reject(parent.kind().to_string()));
        }

        Ok(())
    }

    /// Instantiate the built-in default scene
    pub fn create_default_scene(&self) -> Vec<SceneComponent> {
        self.create_scene(&SceneTemplate::default())
    }

    /// Instantiate a template depth-first, wiring each child to its parent
    pub fn create_scene(&self, template: &SceneTemplate) -> Vec<SceneComponent> {
        let mut components = Vec::new();
        // Stack holds (node, parent id); roots are pushed reversed so they pop in order
        let mut stack: Vec<(&TemplateNode, Option<ComponentId>)> =
            template.root.iter().rev().map(|node| (node, None)).collect();

        while let Some((node, parent_id)) = stack.pop() {
            let component = self.create_component(node.kind, parent_id);
            debug!(id = %component.id, kind = %node.kind, "Created scene component");

            for child in node.children.iter().rev() {
                if !node.kind.descriptor().allows_child(child.kind) {
                    warn!(parent = %node.kind, child = %child.kind, "Template places a disallowed child");
                }
                stack.push((child, Some(component.id.clone())));
            }
            components.push(component);
        }

        components
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentSettings;

    #[test]
    fn test_create_component_copies_defaults() {
        let registry = ComponentRegistry::new();
        let a = registry.create_component(ComponentKind::Material, None);
        let b = registry.create_component(ComponentKind::Material, None);

        assert_ne!(a.id, b.id);
        assert_eq!(a.settings, b.settings);
        assert!(!a.is_core);
        assert!(matches!(a.settings, ComponentSettings::Material(_)));
    }

    #[test]
    fn test_create_unknown_tag() {
        let registry = ComponentRegistry::new();
        let err = registry.create_component_by_tag("sparkles", None).unwrap_err();
        assert!(matches!(err, ComponentError::UnknownType(_)));
    }

    #[test]
    fn test_default_scene_shape() {
        let registry = ComponentRegistry::new();
        let scene = registry.create_default_scene();

        assert_eq!(scene.len(), 4);
        let root = &scene[0];
        assert_eq!(root.kind(), ComponentKind::UserModel);
        assert!(root.is_core);
        assert!(root.parent_id.is_none());

        let child_kinds: Vec<ComponentKind> = scene[1..].iter().map(|c| c.kind()).collect();
        assert_eq!(
            child_kinds,
            vec![ComponentKind::Edges, ComponentKind::Material, ComponentKind::Outlines]
        );
        for child in &scene[1..] {
            assert_eq!(child.parent_id.as_ref(), Some(&root.id));
            assert!(!child.is_core);
        }
    }

    #[test]
    fn test_validate_component() {
        let registry = ComponentRegistry::new();
        let mut tree = ComponentTree::new();
        let root_id = tree.add_component(ComponentKind::UserModel, None);

        // Parent-required kind without a parent
        let orphan = registry.create_component(ComponentKind::Edges, None);
        assert!(!registry.validate_component(&orphan, &tree));

        // Parent that does not resolve
        let dangling = registry.create_component(
            ComponentKind::Edges,
            Some(ComponentId("nowhere".to_string())),
        );
        assert!(!registry.validate_component(&dangling, &tree));

        // Parent whose kind does not allow the child
        let edges_id = tree.add_component(ComponentKind::Edges, Some(root_id.clone()));
        let nested = registry.create_component(ComponentKind::Material, Some(edges_id));
        assert!(!registry.validate_component(&nested, &tree));

        // Valid placements
        let material = registry.create_component(ComponentKind::Material, Some(root_id));
        assert!(registry.validate_component(&material, &tree));
        let second_root = registry.create_component(ComponentKind::UserModel, None);
        assert!(registry.validate_component(&second_root, &tree));
    }

    #[test]
    fn test_template_from_toml() {
        let toml = r#"
[[root]]
type = "userModel"

[[root.children]]
type = "outlines"
"#;
        let template = SceneTemplate::from_toml(toml).unwrap();
        let scene = ComponentRegistry::new().create_scene(&template);

        assert_eq!(scene.len(), 2);
        assert_eq!(scene[1].kind(), ComponentKind::Outlines);
        assert_eq!(scene[1].parent_id.as_ref(), Some(&scene[0].id));
    }
}
