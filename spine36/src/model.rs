use crate::animation::Animation;
use crate::attachment::Attachment;
use std::collections::HashMap;

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct BoneData {
    pub index: usize,
    pub name: String,
    pub parent: Option<usize>,
    pub length: f32,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub shear_x: f32,
    pub shear_y: f32,
    pub transform_mode: TransformMode,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum TransformMode {
    #[default]
    Normal,
    OnlyTranslation,
    NoRotationOrReflection,
    NoScale,
    NoScaleOrReflection,
}

impl TransformMode {
    pub(crate) fn from_binary(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Normal),
            1 => Some(Self::OnlyTranslation),
            2 => Some(Self::NoRotationOrReflection),
            3 => Some(Self::NoScale),
            4 => Some(Self::NoScaleOrReflection),
            _ => None,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct SlotData {
    pub index: usize,
    pub name: String,
    pub bone: usize,
    pub color: [f32; 4],
    /// Secondary tint; `None` when the stream carries the all-ones sentinel.
    pub dark_color: Option<[f32; 3]>,
    pub attachment_name: Option<String>,
    pub blend_mode: BlendMode,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
    Multiply,
    Screen,
}

impl BlendMode {
    pub(crate) fn from_binary(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Normal),
            1 => Some(Self::Additive),
            2 => Some(Self::Multiply),
            3 => Some(Self::Screen),
            _ => None,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct IkConstraintData {
    pub name: String,
    pub order: i32,
    pub bones: Vec<usize>,
    pub target: usize,
    pub mix: f32,
    pub bend_direction: i32,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct TransformConstraintData {
    pub name: String,
    pub order: i32,
    pub bones: Vec<usize>,
    pub target: usize,
    pub local: bool,
    pub relative: bool,
    pub offset_rotation: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub offset_scale_x: f32,
    pub offset_scale_y: f32,
    pub offset_shear_y: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
    pub scale_mix: f32,
    pub shear_mix: f32,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PositionMode {
    Fixed,
    Percent,
}

impl PositionMode {
    pub(crate) fn from_binary(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Fixed),
            1 => Some(Self::Percent),
            _ => None,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SpacingMode {
    Length,
    Fixed,
    Percent,
}

impl SpacingMode {
    pub(crate) fn from_binary(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Length),
            1 => Some(Self::Fixed),
            2 => Some(Self::Percent),
            _ => None,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RotateMode {
    Tangent,
    Chain,
    ChainScale,
}

impl RotateMode {
    pub(crate) fn from_binary(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Tangent),
            1 => Some(Self::Chain),
            2 => Some(Self::ChainScale),
            _ => None,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct PathConstraintData {
    pub name: String,
    pub order: i32,
    pub bones: Vec<usize>,
    /// Slot whose path attachment drives the constraint.
    pub target: usize,
    pub position_mode: PositionMode,
    pub spacing_mode: SpacingMode,
    pub rotate_mode: RotateMode,
    pub offset_rotation: f32,
    pub position: f32,
    pub spacing: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
}

impl PathConstraintData {
    /// Whether `position` values (setup and timeline) are in skeleton units.
    pub fn position_is_spatial(&self) -> bool {
        self.position_mode == PositionMode::Fixed
    }

    /// Whether `spacing` values (setup and timeline) are in skeleton units.
    pub fn spacing_is_spatial(&self) -> bool {
        matches!(self.spacing_mode, SpacingMode::Length | SpacingMode::Fixed)
    }
}

/// Named attachment set, addressed by `(slot index, attachment key)`.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug, Default)]
pub struct Skin {
    pub name: String,
    attachments: Vec<HashMap<String, Attachment>>,
}

impl Skin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attachments: Vec::new(),
        }
    }

    pub fn attachment(&self, slot_index: usize, name: &str) -> Option<&Attachment> {
        self.attachments
            .get(slot_index)
            .and_then(|slot_map| slot_map.get(name))
    }

    pub(crate) fn attachment_mut(&mut self, slot_index: usize, name: &str) -> Option<&mut Attachment> {
        self.attachments
            .get_mut(slot_index)
            .and_then(|slot_map| slot_map.get_mut(name))
    }

    /// Inserts or replaces the attachment stored under `(slot_index, name)`.
    pub fn add_attachment(&mut self, slot_index: usize, name: impl Into<String>, attachment: Attachment) {
        if self.attachments.len() <= slot_index {
            self.attachments.resize_with(slot_index + 1, HashMap::new);
        }
        self.attachments[slot_index].insert(name.into(), attachment);
    }

    /// All entries as `(slot index, key, attachment)`, grouped by slot.
    pub fn attachments(&self) -> impl Iterator<Item = (usize, &str, &Attachment)> {
        self.attachments
            .iter()
            .enumerate()
            .flat_map(|(slot_index, slot_map)| {
                slot_map
                    .iter()
                    .map(move |(key, attachment)| (slot_index, key.as_str(), attachment))
            })
    }

    pub fn attachment_count(&self) -> usize {
        self.attachments.iter().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.attachment_count() == 0
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct EventData {
    pub name: String,
    pub int_value: i32,
    pub float_value: f32,
    pub string: Option<String>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug, Default)]
pub struct SkeletonData {
    pub name: Option<String>,
    pub hash: Option<String>,
    pub version: Option<String>,
    pub width: f32,
    pub height: f32,
    pub fps: f32,
    pub images_path: Option<String>,
    pub bones: Vec<BoneData>,
    pub slots: Vec<SlotData>,
    pub skins: Vec<Skin>,
    /// Index into `skins`; the default skin is listed first when present.
    pub default_skin_index: Option<usize>,
    pub events: Vec<EventData>,
    pub animations: Vec<Animation>,
    pub ik_constraints: Vec<IkConstraintData>,
    pub transform_constraints: Vec<TransformConstraintData>,
    pub path_constraints: Vec<PathConstraintData>,
}

impl SkeletonData {
    pub fn find_bone(&self, name: &str) -> Option<&BoneData> {
        self.bones.iter().find(|b| b.name == name)
    }

    pub fn find_bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    pub fn find_slot(&self, name: &str) -> Option<&SlotData> {
        self.slots.iter().find(|s| s.name == name)
    }

    pub fn find_slot_index(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    pub fn find_skin(&self, name: &str) -> Option<&Skin> {
        self.skins.iter().find(|s| s.name == name)
    }

    pub fn default_skin(&self) -> Option<&Skin> {
        self.default_skin_index.and_then(|i| self.skins.get(i))
    }

    pub fn find_event(&self, name: &str) -> Option<&EventData> {
        self.events.iter().find(|e| e.name == name)
    }

    pub fn find_animation(&self, name: &str) -> Option<&Animation> {
        self.animations.iter().find(|a| a.name == name)
    }

    pub fn find_ik_constraint(&self, name: &str) -> Option<&IkConstraintData> {
        self.ik_constraints.iter().find(|c| c.name == name)
    }

    pub fn find_transform_constraint(&self, name: &str) -> Option<&TransformConstraintData> {
        self.transform_constraints.iter().find(|c| c.name == name)
    }

    pub fn find_path_constraint(&self, name: &str) -> Option<&PathConstraintData> {
        self.path_constraints.iter().find(|c| c.name == name)
    }
}
