//! Scene component kinds, typed settings, and settings patches
//!
//! Every component in a scene tree is one of a closed set of kinds. The
//! settings of a node are a tagged union over those kinds, so a node's type
//! and the shape of its settings can never disagree.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ComponentError {
    #[error("Unknown component type: {0}")]
    UnknownType(String),
    #[error("Settings patch for {patch} cannot be applied to a {target} component")]
    KindMismatch {
        target: ComponentKind,
        patch: ComponentKind,
    },
    #[error("Invalid setting {key} for {kind}: {reason}")]
    InvalidSetting {
        kind: ComponentKind,
        key: String,
        reason: String,
    },
    #[error("Component {id} of type {kind} cannot be placed under {parent}")]
    InvalidPlacement {
        id: ComponentId,
        kind: ComponentKind,
        parent: String,
    },
    #[error("Component {0} is a core component and cannot be removed")]
    CoreComponent(ComponentId),
}

/// Opaque unique identifier of a scene component
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(pub String);

impl ComponentId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type tag of a scene component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentKind {
    /// The loaded model mesh itself
    UserModel,
    /// Feature-edge lines drawn over the mesh
    Edges,
    /// Silhouette outline around the mesh
    Outlines,
    /// Surface material of the mesh
    Material,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 4] = [
        ComponentKind::UserModel,
        ComponentKind::Edges,
        ComponentKind::Outlines,
        ComponentKind::Material,
    ];

    /// Type tag as used in serialized trees and templates
    pub fn tag(&self) -> &'static str {
        match self {
            ComponentKind::UserModel => "userModel",
            ComponentKind::Edges => "edges",
            ComponentKind::Outlines => "outlines",
            ComponentKind::Material => "material",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ComponentKind {
    type Err = ComponentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentKind::ALL
            .into_iter()
            .find(|kind| kind.tag() == s)
            .ok_or_else(|| ComponentError::UnknownType(s.to_string()))
    }
}

/// A single setting value, as seen by settings editors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Vector(Vec<f64>),
    Text(String),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{}", b),
            SettingValue::Number(n) => write!(f, "{}", n),
            SettingValue::Vector(v) => {
                let parts: Vec<String> = v.iter().map(|n| n.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            SettingValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserModelSettings {
    /// Euler rotation in radians
    pub rotation: [f64; 3],
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgesSettings {
    /// Crease angle threshold in degrees
    pub threshold: f64,
    pub color: String,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlinesSettings {
    pub thickness: f64,
    pub color: String,
    pub angle: f64,
    pub screenspace: bool,
    pub opacity: f64,
    pub transparent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSettings {
    pub color: String,
    pub transparent: bool,
    pub opacity: f64,
    pub wireframe: bool,
}

/// Settings of a component, tagged by its kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ComponentSettings {
    UserModel(UserModelSettings),
    Edges(EdgesSettings),
    Outlines(OutlinesSettings),
    Material(MaterialSettings),
}

impl ComponentSettings {
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentSettings::UserModel(_) => ComponentKind::UserModel,
            ComponentSettings::Edges(_) => ComponentKind::Edges,
            ComponentSettings::Outlines(_) => ComponentKind::Outlines,
            ComponentSettings::Material(_) => ComponentKind::Material,
        }
    }

    /// Key/value view in declaration order
    pub fn entries(&self) -> Vec<(&'static str, SettingValue)> {
        use SettingValue::*;
        match self {
            ComponentSettings::UserModel(s) => vec![
                ("rotation", Vector(s.rotation.to_vec())),
                ("scale", Number(s.scale)),
            ],
            ComponentSettings::Edges(s) => vec![
                ("threshold", Number(s.threshold)),
                ("color", Text(s.color.clone())),
                ("scale", Number(s.scale)),
            ],
            ComponentSettings::Outlines(s) => vec![
                ("thickness", Number(s.thickness)),
                ("color", Text(s.color.clone())),
                ("angle", Number(s.angle)),
                ("screenspace", Bool(s.screenspace)),
                ("opacity", Number(s.opacity)),
                ("transparent", Bool(s.transparent)),
            ],
            ComponentSettings::Material(s) => vec![
                ("color", Text(s.color.clone())),
                ("transparent", Bool(s.transparent)),
                ("opacity", Number(s.opacity)),
                ("wireframe", Bool(s.wireframe)),
            ],
        }
    }

    /// Overlay a patch onto these settings (shallow: each present key replaces
    /// the existing value, absent keys are kept)
    pub fn merge(&mut self, patch: SettingsPatch) -> Result<(), ComponentError> {
        match (self, patch) {
            (ComponentSettings::UserModel(s), SettingsPatch::UserModel(p)) => {
                if let Some(rotation) = p.rotation {
                    s.rotation = rotation;
                }
                if let Some(scale) = p.scale {
                    s.scale = scale;
                }
            }
            (ComponentSettings::Edges(s), SettingsPatch::Edges(p)) => {
                if let Some(threshold) = p.threshold {
                    s.threshold = threshold;
                }
                if let Some(color) = p.color {
                    s.color = color;
                }
                if let Some(scale) = p.scale {
                    s.scale = scale;
                }
            }
            (ComponentSettings::Outlines(s), SettingsPatch::Outlines(p)) => {
                if let Some(thickness) = p.thickness {
                    s.thickness = thickness;
                }
                if let Some(color) = p.color {
                    s.color = color;
                }
                if let Some(angle) = p.angle {
                    s.angle = angle;
                }
                if let Some(screenspace) = p.screenspace {
                    s.screenspace = screenspace;
                }
                if let Some(opacity) = p.opacity {
                    s.opacity = opacity;
                }
                if let Some(transparent) = p.transparent {
                    s.transparent = transparent;
                }
            }
            (ComponentSettings::Material(s), SettingsPatch::Material(p)) => {
                if let Some(color) = p.color {
                    s.color = color;
                }
                if let Some(transparent) = p.transparent {
                    s.transparent = transparent;
                }
                if let Some(opacity) = p.opacity {
                    s.opacity = opacity;
                }
                if let Some(wireframe) = p.wireframe {
                    s.wireframe = wireframe;
                }
            }
            (target, patch) => {
                return Err(ComponentError::KindMismatch {
                    target: target.kind(),
                    patch: patch.kind(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserModelPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgesPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutlinesPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenspace: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparent: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wireframe: Option<bool>,
}

/// Partial settings update for one component kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SettingsPatch {
    UserModel(UserModelPatch),
    Edges(EdgesPatch),
    Outlines(OutlinesPatch),
    Material(MaterialPatch),
}

impl SettingsPatch {
    pub fn kind(&self) -> ComponentKind {
        match self {
            SettingsPatch::UserModel(_) => ComponentKind::UserModel,
            SettingsPatch::Edges(_) => ComponentKind::Edges,
            SettingsPatch::Outlines(_) => ComponentKind::Outlines,
            SettingsPatch::Material(_) => ComponentKind::Material,
        }
    }

    /// Build a patch that sets a single key, as a settings editor does when
    /// one control changes
    pub fn from_entry(
        kind: ComponentKind,
        key: &str,
        value: SettingValue,
    ) -> Result<Self, ComponentError> {
        let mut object = serde_json::Map::new();
        object.insert("type".to_string(), serde_json::Value::from(kind.tag()));
        let value = serde_json::to_value(value).map_err(|e| ComponentError::InvalidSetting {
            kind,
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        object.insert(key.to_string(), value);

        serde_json::from_value(serde_json::Value::Object(object)).map_err(|e| {
            ComponentError::InvalidSetting {
                kind,
                key: key.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

/// A node of the scene component forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneComponent {
    pub id: ComponentId,
    pub settings: ComponentSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ComponentId>,
    #[serde(default)]
    pub is_core: bool,
}

impl SceneComponent {
    pub fn kind(&self) -> ComponentKind {
        self.settings.kind()
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_model(scale: f64) -> ComponentSettings {
        ComponentSettings::UserModel(UserModelSettings {
            rotation: [0.0, 0.0, 0.0],
            scale,
        })
    }

    #[test]
    fn test_kind_from_tag() {
        assert_eq!("userModel".parse::<ComponentKind>().unwrap(), ComponentKind::UserModel);
        assert_eq!("outlines".parse::<ComponentKind>().unwrap(), ComponentKind::Outlines);

        let err = "sparkles".parse::<ComponentKind>().unwrap_err();
        assert!(matches!(err, ComponentError::UnknownType(ref t) if t == "sparkles"));
    }

    #[test]
    fn test_merge_overlays_present_keys_only() {
        let mut settings = user_model(1.0);
        settings
            .merge(SettingsPatch::UserModel(UserModelPatch {
                scale: Some(2.0),
                ..Default::default()
            }))
            .unwrap();

        assert_eq!(settings, user_model(2.0));
    }

    #[test]
    fn test_merge_rejects_other_kind() {
        let mut settings = user_model(1.0);
        let err = settings
            .merge(SettingsPatch::Material(MaterialPatch {
                wireframe: Some(true),
                ..Default::default()
            }))
            .unwrap_err();

        assert!(matches!(
            err,
            ComponentError::KindMismatch {
                target: ComponentKind::UserModel,
                patch: ComponentKind::Material
            }
        ));
        assert_eq!(settings, user_model(1.0));
    }

    #[test]
    fn test_patch_from_entry() {
        let patch =
            SettingsPatch::from_entry(ComponentKind::Outlines, "opacity", SettingValue::Number(0.5))
                .unwrap();
        assert_eq!(
            patch,
            SettingsPatch::Outlines(OutlinesPatch {
                opacity: Some(0.5),
                ..Default::default()
            })
        );

        let patch = SettingsPatch::from_entry(
            ComponentKind::UserModel,
            "rotation",
            SettingValue::Vector(vec![0.1, 0.2, 0.3]),
        )
        .unwrap();
        assert_eq!(
            patch,
            SettingsPatch::UserModel(UserModelPatch {
                rotation: Some([0.1, 0.2, 0.3]),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_patch_from_entry_rejects_bad_input() {
        // Unknown key
        assert!(SettingsPatch::from_entry(
            ComponentKind::Edges,
            "wireframe",
            SettingValue::Bool(true)
        )
        .is_err());

        // Wrong value shape
        assert!(SettingsPatch::from_entry(
            ComponentKind::Material,
            "opacity",
            SettingValue::Text("opaque".to_string())
        )
        .is_err());
    }

    #[test]
    fn test_component_json_shape() {
        let component = SceneComponent {
            id: ComponentId("c1".to_string()),
            settings: ComponentSettings::Edges(EdgesSettings {
                threshold: 15.0,
                color: "#000000".to_string(),
                scale: 1.0,
            }),
            parent_id: Some(ComponentId("root".to_string())),
            is_core: false,
        };

        let json = serde_json::to_value(&component).unwrap();
        assert_eq!(json["settings"]["type"], "edges");
        assert_eq!(json["parentId"], "root");

        let back: SceneComponent = serde_json::from_value(json).unwrap();
        assert_eq!(back, component);
    }
}
