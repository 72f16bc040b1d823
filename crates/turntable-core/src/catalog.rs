//! Static type catalog: defaults, placement rules, and setting controls
//! for every component kind

use serde::Serialize;
use std::f64::consts::{FRAC_PI_2, PI};

use crate::component::{
    ComponentKind, ComponentSettings, EdgesSettings, MaterialSettings, OutlinesSettings,
    SettingValue, UserModelSettings,
};

/// How a numeric value is shown next to its control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayFormat {
    Plain,
    /// Value is stored in radians and shown in whole degrees
    Degrees,
}

impl DisplayFormat {
    pub fn display(&self, value: f64) -> String {
        match self {
            DisplayFormat::Plain => format!("{}", value),
            DisplayFormat::Degrees => format!("{}°", radians_to_degrees(value).round()),
        }
    }

    /// Value in the unit shown to the user
    pub fn transform(&self, value: f64) -> f64 {
        match self {
            DisplayFormat::Plain => value,
            DisplayFormat::Degrees => radians_to_degrees(value),
        }
    }
}

fn radians_to_degrees(rad: f64) -> f64 {
    rad * 180.0 / PI
}

/// UI control used to edit one setting
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlDescriptor {
    Slider {
        label: Option<&'static str>,
        min: f64,
        max: f64,
        step: Option<f64>,
        display: DisplayFormat,
    },
    Color {
        label: Option<&'static str>,
    },
    Checkbox {
        label: Option<&'static str>,
    },
    Text {
        label: Option<&'static str>,
    },
    SliderArray {
        label: Option<&'static str>,
        min: f64,
        max: f64,
        step: Option<f64>,
        dimensions: usize,
        display: DisplayFormat,
    },
}

/// Pick a control for a setting that has no explicit descriptor
pub fn infer_control(key: &str, value: &SettingValue) -> ControlDescriptor {
    match key {
        "opacity" => {
            return ControlDescriptor::Slider {
                label: None,
                min: 0.0,
                max: 1.0,
                step: Some(0.01),
                display: DisplayFormat::Plain,
            }
        }
        "scale" => {
            return ControlDescriptor::Slider {
                label: None,
                min: 0.0,
                max: 10.0,
                step: Some(0.01),
                display: DisplayFormat::Plain,
            }
        }
        _ => {}
    }

    match value {
        SettingValue::Vector(values) => ControlDescriptor::SliderArray {
            label: None,
            min: -PI,
            max: PI,
            step: Some(0.01),
            dimensions: values.len(),
            display: DisplayFormat::Degrees,
        },
        SettingValue::Number(_) => ControlDescriptor::Slider {
            label: None,
            min: 0.0,
            max: 100.0,
            step: Some(0.1),
            display: DisplayFormat::Plain,
        },
        SettingValue::Bool(_) => ControlDescriptor::Checkbox { label: None },
        SettingValue::Text(s) if s.starts_with('#') => ControlDescriptor::Color { label: None },
        SettingValue::Text(_) => ControlDescriptor::Text { label: None },
    }
}

/// Immutable metadata for one component kind
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    pub name: &'static str,
    #[serde(skip)]
    defaults: fn() -> ComponentSettings,
    pub allowed_children: &'static [ComponentKind],
    /// Empty means the kind may be a root
    pub requires_parent: &'static [ComponentKind],
    pub is_core: bool,
    pub setting_controls: &'static [(&'static str, ControlDescriptor)],
}

impl ComponentDescriptor {
    /// Fresh copy of the default settings
    pub fn default_settings(&self) -> ComponentSettings {
        (self.defaults)()
    }

    pub fn allows_child(&self, kind: ComponentKind) -> bool {
        self.allowed_children.contains(&kind)
    }

    pub fn needs_parent(&self) -> bool {
        !self.requires_parent.is_empty()
    }

    /// Explicit control for a key, if the catalog declares one
    pub fn control(&self, key: &str) -> Option<&ControlDescriptor> {
        self.setting_controls
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, control)| control)
    }

    /// Explicit control for a key, falling back to inference from its value
    pub fn control_for(&self, key: &str, value: &SettingValue) -> ControlDescriptor {
        self.control(key)
            .cloned()
            .unwrap_or_else(|| infer_control(key, value))
    }
}

fn user_model_defaults() -> ComponentSettings {
    ComponentSettings::UserModel(UserModelSettings {
        rotation: [-FRAC_PI_2, 0.0, 0.0],
        scale: 0.5,
    })
}

fn edges_defaults() -> ComponentSettings {
    ComponentSettings::Edges(EdgesSettings {
        threshold: 15.0,
        color: "#000000".to_string(),
        scale: 1.0,
    })
}

fn outlines_defaults() -> ComponentSettings {
    ComponentSettings::Outlines(OutlinesSettings {
        thickness: 2.0,
        color: "#000000".to_string(),
        angle: 30.0,
        screenspace: false,
        opacity: 1.0,
        transparent: true,
    })
}

fn material_defaults() -> ComponentSettings {
    ComponentSettings::Material(MaterialSettings {
        color: "#ffffff".to_string(),
        transparent: false,
        opacity: 1.0,
        wireframe: false,
    })
}

static USER_MODEL: ComponentDescriptor = ComponentDescriptor {
    name: "User Model",
    defaults: user_model_defaults,
    allowed_children: &[
        ComponentKind::Edges,
        ComponentKind::Outlines,
        ComponentKind::Material,
    ],
    requires_parent: &[],
    is_core: true,
    setting_controls: &[
        (
            "rotation",
            ControlDescriptor::SliderArray {
                label: Some("Rotation"),
                min: -PI,
                max: PI,
                step: Some(0.01),
                dimensions: 3,
                display: DisplayFormat::Degrees,
            },
        ),
        (
            "scale",
            ControlDescriptor::Slider {
                label: Some("Scale"),
                min: 0.1,
                max: 10.0,
                step: Some(0.1),
                display: DisplayFormat::Plain,
            },
        ),
    ],
};

static EDGES: ComponentDescriptor = ComponentDescriptor {
    name: "Edges",
    defaults: edges_defaults,
    allowed_children: &[],
    requires_parent: &[ComponentKind::UserModel],
    is_core: false,
    setting_controls: &[],
};

static OUTLINES: ComponentDescriptor = ComponentDescriptor {
    name: "Outlines",
    defaults: outlines_defaults,
    allowed_children: &[],
    requires_parent: &[ComponentKind::UserModel],
    is_core: false,
    setting_controls: &[],
};

static MATERIAL: ComponentDescriptor = ComponentDescriptor {
    name: "Material",
    defaults: material_defaults,
    allowed_children: &[],
    requires_parent: &[ComponentKind::UserModel],
    is_core: false,
    setting_controls: &[],
};

impl ComponentKind {
    /// Catalog entry for this kind
    pub fn descriptor(&self) -> &'static ComponentDescriptor {
        match self {
            ComponentKind::UserModel => &USER_MODEL,
            ComponentKind::Edges => &EDGES,
            ComponentKind::Outlines => &OUTLINES,
            ComponentKind::Material => &MATERIAL,
        }
    }
}

/// Serializable view of the whole catalog, keyed by type tag
pub fn catalog() -> Vec<(ComponentKind, &'static ComponentDescriptor)> {
    ComponentKind::ALL
        .into_iter()
        .map(|kind| (kind, kind.descriptor()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_kind() {
        for kind in ComponentKind::ALL {
            assert_eq!(kind.descriptor().default_settings().kind(), kind);
        }
    }

    #[test]
    fn test_placement_rules() {
        let root = ComponentKind::UserModel.descriptor();
        assert!(root.is_core);
        assert!(!root.needs_parent());
        assert!(root.allows_child(ComponentKind::Edges));
        assert!(root.allows_child(ComponentKind::Outlines));
        assert!(root.allows_child(ComponentKind::Material));
        assert!(!root.allows_child(ComponentKind::UserModel));

        for kind in [ComponentKind::Edges, ComponentKind::Outlines, ComponentKind::Material] {
            let descriptor = kind.descriptor();
            assert!(!descriptor.is_core);
            assert_eq!(descriptor.requires_parent, &[ComponentKind::UserModel]);
            assert!(descriptor.allowed_children.is_empty());
        }
    }

    #[test]
    fn test_explicit_and_inferred_controls() {
        let root = ComponentKind::UserModel.descriptor();
        match root.control_for("scale", &SettingValue::Number(0.5)) {
            ControlDescriptor::Slider { min, max, label, .. } => {
                assert_eq!(label, Some("Scale"));
                assert_eq!(min, 0.1);
                assert_eq!(max, 10.0);
            }
            other => panic!("unexpected control {:?}", other),
        }

        let outlines = ComponentKind::Outlines.descriptor();
        assert!(matches!(
            outlines.control_for("opacity", &SettingValue::Number(1.0)),
            ControlDescriptor::Slider { max, .. } if max == 1.0
        ));
        assert!(matches!(
            outlines.control_for("color", &SettingValue::Text("#000000".into())),
            ControlDescriptor::Color { .. }
        ));
        assert!(matches!(
            outlines.control_for("screenspace", &SettingValue::Bool(false)),
            ControlDescriptor::Checkbox { .. }
        ));
        assert!(matches!(
            outlines.control_for("angle", &SettingValue::Number(30.0)),
            ControlDescriptor::Slider { max, .. } if max == 100.0
        ));
    }

    #[test]
    fn test_degrees_display() {
        assert_eq!(DisplayFormat::Degrees.display(-FRAC_PI_2), "-90°");
        assert!((DisplayFormat::Degrees.transform(PI) - 180.0).abs() < 1e-9);
        assert_eq!(DisplayFormat::Plain.display(0.5), "0.5");
    }
}
