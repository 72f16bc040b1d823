//! Render plan - what the renderer should draw for the current tree

use serde::Serialize;
use tracing::debug;

use crate::component::{
    ComponentId, ComponentSettings, EdgesSettings, MaterialSettings, OutlinesSettings,
};
use crate::tree::ComponentTree;

/// A per-mesh effect contributed by a child component
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Effect {
    Edges(EdgesSettings),
    Outlines(OutlinesSettings),
    Material(MaterialSettings),
}

/// One model mesh and the effects attached to it, in tree order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshPlan {
    pub component: ComponentId,
    pub rotation: [f64; 3],
    pub scale: f64,
    pub effects: Vec<Effect>,
}

impl MeshPlan {
    pub fn material(&self) -> Option<&MaterialSettings> {
        self.effects.iter().find_map(|e| match e {
            Effect::Material(m) => Some(m),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderPlan {
    pub meshes: Vec<MeshPlan>,
}

impl RenderPlan {
    /// Build a plan from every model root in the tree.
    ///
    /// Roots of other kinds and nodes with dangling parents are not drawn.
    pub fn from_tree(tree: &ComponentTree) -> Self {
        let mut meshes = Vec::new();

        for root in tree.roots() {
            let ComponentSettings::UserModel(model) = &root.settings else {
                debug!(id = %root.id, kind = %root.kind(), "Skipping non-model root");
                continue;
            };

            let effects = tree
                .children(&root.id)
                .into_iter()
                .filter_map(|child| match &child.settings {
                    ComponentSettings::Edges(s) => Some(Effect::Edges(s.clone())),
                    ComponentSettings::Outlines(s) => Some(Effect::Outlines(s.clone())),
                    ComponentSettings::Material(s) => Some(Effect::Material(s.clone())),
                    ComponentSettings::UserModel(_) => None,
                })
                .collect();

            meshes.push(MeshPlan {
                component: root.id.clone(),
                rotation: model.rotation,
                scale: model.scale,
                effects,
            });
        }

        Self { meshes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentKind, MaterialPatch, SettingsPatch};

    #[test]
    fn test_default_scene_plan() {
        let mut tree = ComponentTree::new();
        tree.initialize_default_scene();

        let plan = RenderPlan::from_tree(&tree);
        assert_eq!(plan.meshes.len(), 1);
        let mesh = &plan.meshes[0];
        assert_eq!(mesh.scale, 0.5);
        assert_eq!(mesh.effects.len(), 3);
        assert!(matches!(mesh.effects[0], Effect::Edges(_)));
        assert!(matches!(mesh.effects[1], Effect::Material(_)));
        assert!(matches!(mesh.effects[2], Effect::Outlines(_)));
    }

    #[test]
    fn test_plan_follows_settings() {
        let mut tree = ComponentTree::new();
        let root = tree.add_component(ComponentKind::UserModel, None);
        let material = tree.add_component(ComponentKind::Material, Some(root));
        tree.update_component(
            &material,
            SettingsPatch::Material(MaterialPatch {
                wireframe: Some(true),
                ..Default::default()
            }),
        )
        .unwrap();

        // Dangling node is not part of any mesh
        tree.add_component(ComponentKind::Edges, Some(ComponentId("gone".to_string())));

        let plan = RenderPlan::from_tree(&tree);
        assert_eq!(plan.meshes.len(), 1);
        assert_eq!(plan.meshes[0].effects.len(), 1);
        assert!(plan.meshes[0].material().unwrap().wireframe);
    }
}
