//! Spine 3.6 `.skel` (binary) loader.
//!
//! The loader is IO-free: it operates on an in-memory byte slice. The stream is read once, front
//! to back; linked meshes are queued while skins are read and resolved once every skin exists.

mod animation;
mod input;
mod linked_mesh;
mod skin;

pub use input::BinaryInput;

use crate::atlas::Atlas;
use crate::color::rgb888_to_color;
use crate::loader::{AtlasAttachmentLoader, AttachmentLoader, DefaultAttachmentLoader};
use crate::model::{
    BlendMode, BoneData, EventData, IkConstraintData, PathConstraintData, PositionMode, RotateMode,
    SkeletonData, Skin, SlotData, SpacingMode, TransformConstraintData, TransformMode,
};
use crate::Error;
use skin::SkinReader;
use std::sync::Arc;

/// Decoder configuration: the attachment factory and the unit scale.
///
/// Decoding takes `&self`; the cursor and linked-mesh queue live in the call, so one decoder can
/// be shared by several threads.
#[derive(Clone, Debug)]
pub struct SkeletonBinary<L> {
    loader: L,
    scale: f32,
}

impl<L: AttachmentLoader> SkeletonBinary<L> {
    pub fn new(loader: L) -> Self {
        Self { loader, scale: 1.0 }
    }

    /// Scale applied to positions, lengths, attachment geometry, translate keys, fixed path
    /// positions/spacings and deform offsets. Non-finite values fall back to `1.0`.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = if scale.is_finite() { scale } else { 1.0 };
        self
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn read_skeleton_data(&self, bytes: &[u8]) -> Result<SkeletonData, Error> {
        let scale = self.scale;
        let mut input = BinaryInput::new(bytes);
        let mut data = SkeletonData {
            hash: non_empty(input.read_string()?),
            version: non_empty(input.read_string()?),
            width: input.read_f32()?,
            height: input.read_f32()?,
            ..SkeletonData::default()
        };
        if let Some(version) = data.version.as_deref() {
            if !version.starts_with("3.") {
                tracing::warn!(version, "skeleton was not exported by a 3.x editor, decoding anyway");
            }
        }

        let nonessential = input.read_bool()?;
        if nonessential {
            data.fps = input.read_f32()?;
            data.images_path = non_empty(input.read_string()?);
        }
        tracing::debug!(
            hash = ?data.hash,
            version = ?data.version,
            nonessential,
            "read skeleton header"
        );

        data.bones = read_bones(&mut input, scale, nonessential)?;
        data.slots = read_slots(&mut input, data.bones.len())?;
        data.ik_constraints = read_ik_constraints(&mut input, data.bones.len())?;
        data.transform_constraints =
            read_transform_constraints(&mut input, data.bones.len(), scale)?;
        data.path_constraints =
            read_path_constraints(&mut input, data.bones.len(), data.slots.len(), scale)?;
        tracing::debug!(
            bones = data.bones.len(),
            slots = data.slots.len(),
            ik_constraints = data.ik_constraints.len(),
            transform_constraints = data.transform_constraints.len(),
            path_constraints = data.path_constraints.len(),
            "read setup pose"
        );

        let mut skins = SkinReader::new(
            &self.loader,
            scale,
            nonessential,
            data.bones.len(),
            data.slots.len(),
        );
        if let Some(default_skin) = skins.read_skin(&mut input, 0, "default")? {
            data.default_skin_index = Some(0);
            data.skins.push(default_skin);
        }
        let skin_count = input.read_count()?;
        for _ in 0..skin_count {
            let name = read_name(&mut input, "skin")?;
            let index = data.skins.len();
            // Empty named skins are kept so deform timelines can still address later skins.
            let skin = match skins.read_skin(&mut input, index, &name)? {
                Some(skin) => skin,
                None => Skin::new(name),
            };
            data.skins.push(skin);
        }
        tracing::debug!(skins = data.skins.len(), "read skins");

        linked_mesh::resolve_linked_meshes(
            skins.into_linked_meshes(),
            &mut data.skins,
            data.default_skin_index,
        )?;

        data.events = read_events(&mut input)?;

        let animation_count = input.read_count()?;
        data.animations = Vec::with_capacity(animation_count.min(input.remaining()));
        for _ in 0..animation_count {
            let name = read_name(&mut input, "animation")?;
            let animation = animation::read_animation(&mut input, name, &data, scale)?;
            data.animations.push(animation);
        }
        tracing::debug!(
            events = data.events.len(),
            animations = data.animations.len(),
            trailing_bytes = input.remaining(),
            "read animations"
        );

        Ok(data)
    }
}

impl SkeletonData {
    pub fn from_skel_bytes(bytes: &[u8]) -> Result<Arc<Self>, Error> {
        Self::from_skel_bytes_with_scale(bytes, 1.0)
    }

    pub fn from_skel_bytes_with_scale(bytes: &[u8], scale: f32) -> Result<Arc<Self>, Error> {
        SkeletonBinary::new(DefaultAttachmentLoader)
            .with_scale(scale)
            .read_skeleton_data(bytes)
            .map(Arc::new)
    }

    /// Decodes with regions and meshes bound to `atlas`; attachments missing from the atlas are
    /// skipped.
    pub fn from_skel_bytes_with_atlas(
        bytes: &[u8],
        atlas: &Atlas,
        scale: f32,
    ) -> Result<Arc<Self>, Error> {
        SkeletonBinary::new(AtlasAttachmentLoader::new(atlas))
            .with_scale(scale)
            .read_skeleton_data(bytes)
            .map(Arc::new)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Reads a string that may not be null.
fn read_name(input: &mut BinaryInput<'_>, what: &str) -> Result<String, Error> {
    input
        .read_string()?
        .ok_or_else(|| Error::parse(format!("{what} name is null at offset {}", input.position())))
}

fn check_index(kind: &'static str, index: usize, len: usize) -> Result<usize, Error> {
    if index < len {
        Ok(index)
    } else {
        Err(Error::IndexOutOfRange { kind, index, len })
    }
}

fn read_index(input: &mut BinaryInput<'_>, kind: &'static str, len: usize) -> Result<usize, Error> {
    check_index(kind, input.read_count()?, len)
}

fn read_index_list(
    input: &mut BinaryInput<'_>,
    kind: &'static str,
    len: usize,
) -> Result<Vec<usize>, Error> {
    let count = input.read_count()?;
    let mut out = Vec::with_capacity(count.min(input.remaining()));
    for _ in 0..count {
        out.push(read_index(input, kind, len)?);
    }
    Ok(out)
}

fn read_bones(
    input: &mut BinaryInput<'_>,
    scale: f32,
    nonessential: bool,
) -> Result<Vec<BoneData>, Error> {
    let count = input.read_count()?;
    let mut bones = Vec::with_capacity(count.min(input.remaining()));
    for index in 0..count {
        let name = read_name(input, "bone")?;
        let parent = if index == 0 {
            None
        } else {
            let parent = input.read_count()?;
            if parent >= index {
                return Err(Error::InvalidBoneParent {
                    bone: index,
                    parent,
                });
            }
            Some(parent)
        };
        let rotation = input.read_f32()?;
        let x = input.read_f32()? * scale;
        let y = input.read_f32()? * scale;
        let scale_x = input.read_f32()?;
        let scale_y = input.read_f32()?;
        let shear_x = input.read_f32()?;
        let shear_y = input.read_f32()?;
        let length = input.read_f32()? * scale;
        let mode = input.read_varint(true)?;
        let transform_mode = TransformMode::from_binary(mode).ok_or_else(|| {
            Error::parse(format!("invalid transform mode {mode} for bone '{name}'"))
        })?;
        if nonessential {
            let _color = input.read_i32()?;
        }
        bones.push(BoneData {
            index,
            name,
            parent,
            length,
            x,
            y,
            rotation,
            scale_x,
            scale_y,
            shear_x,
            shear_y,
            transform_mode,
        });
    }
    Ok(bones)
}

fn read_slots(input: &mut BinaryInput<'_>, bone_count: usize) -> Result<Vec<SlotData>, Error> {
    let count = input.read_count()?;
    let mut slots = Vec::with_capacity(count.min(input.remaining()));
    for index in 0..count {
        let name = read_name(input, "slot")?;
        let bone = read_index(input, "bone", bone_count)?;
        let color = input.read_color_rgba()?;
        let dark = input.read_i32()?;
        let dark_color = (dark != -1).then(|| rgb888_to_color(dark));
        let attachment_name = input.read_string()?;
        let blend = input.read_varint(true)?;
        let blend_mode = BlendMode::from_binary(blend)
            .ok_or_else(|| Error::parse(format!("invalid blend mode {blend} for slot '{name}'")))?;
        slots.push(SlotData {
            index,
            name,
            bone,
            color,
            dark_color,
            attachment_name,
            blend_mode,
        });
    }
    Ok(slots)
}

fn read_ik_constraints(
    input: &mut BinaryInput<'_>,
    bone_count: usize,
) -> Result<Vec<IkConstraintData>, Error> {
    let count = input.read_count()?;
    let mut out = Vec::with_capacity(count.min(input.remaining()));
    for _ in 0..count {
        let name = read_name(input, "ik constraint")?;
        let order = input.read_varint(true)?;
        let bones = read_index_list(input, "bone", bone_count)?;
        let target = read_index(input, "bone", bone_count)?;
        let mix = input.read_f32()?;
        let bend_direction = input.read_byte()? as i32;
        out.push(IkConstraintData {
            name,
            order,
            bones,
            target,
            mix,
            bend_direction,
        });
    }
    Ok(out)
}

fn read_transform_constraints(
    input: &mut BinaryInput<'_>,
    bone_count: usize,
    scale: f32,
) -> Result<Vec<TransformConstraintData>, Error> {
    let count = input.read_count()?;
    let mut out = Vec::with_capacity(count.min(input.remaining()));
    for _ in 0..count {
        let name = read_name(input, "transform constraint")?;
        let order = input.read_varint(true)?;
        let bones = read_index_list(input, "bone", bone_count)?;
        let target = read_index(input, "bone", bone_count)?;
        out.push(TransformConstraintData {
            name,
            order,
            bones,
            target,
            local: input.read_bool()?,
            relative: input.read_bool()?,
            offset_rotation: input.read_f32()?,
            offset_x: input.read_f32()? * scale,
            offset_y: input.read_f32()? * scale,
            offset_scale_x: input.read_f32()?,
            offset_scale_y: input.read_f32()?,
            offset_shear_y: input.read_f32()?,
            rotate_mix: input.read_f32()?,
            translate_mix: input.read_f32()?,
            scale_mix: input.read_f32()?,
            shear_mix: input.read_f32()?,
        });
    }
    Ok(out)
}

fn read_path_constraints(
    input: &mut BinaryInput<'_>,
    bone_count: usize,
    slot_count: usize,
    scale: f32,
) -> Result<Vec<PathConstraintData>, Error> {
    let count = input.read_count()?;
    let mut out = Vec::with_capacity(count.min(input.remaining()));
    for _ in 0..count {
        let name = read_name(input, "path constraint")?;
        let order = input.read_varint(true)?;
        let bones = read_index_list(input, "bone", bone_count)?;
        let target = read_index(input, "slot", slot_count)?;

        let mode = input.read_varint(true)?;
        let position_mode = PositionMode::from_binary(mode)
            .ok_or_else(|| Error::parse(format!("invalid position mode {mode} for '{name}'")))?;
        let mode = input.read_varint(true)?;
        let spacing_mode = SpacingMode::from_binary(mode)
            .ok_or_else(|| Error::parse(format!("invalid spacing mode {mode} for '{name}'")))?;
        let mode = input.read_varint(true)?;
        let rotate_mode = RotateMode::from_binary(mode)
            .ok_or_else(|| Error::parse(format!("invalid rotate mode {mode} for '{name}'")))?;

        let mut data = PathConstraintData {
            name,
            order,
            bones,
            target,
            position_mode,
            spacing_mode,
            rotate_mode,
            offset_rotation: input.read_f32()?,
            position: input.read_f32()?,
            spacing: input.read_f32()?,
            rotate_mix: input.read_f32()?,
            translate_mix: input.read_f32()?,
        };
        if data.position_is_spatial() {
            data.position *= scale;
        }
        if data.spacing_is_spatial() {
            data.spacing *= scale;
        }
        out.push(data);
    }
    Ok(out)
}

fn read_events(input: &mut BinaryInput<'_>) -> Result<Vec<EventData>, Error> {
    let count = input.read_count()?;
    let mut events = Vec::with_capacity(count.min(input.remaining()));
    for _ in 0..count {
        events.push(EventData {
            name: read_name(input, "event")?,
            int_value: input.read_varint(false)?,
            float_value: input.read_f32()?,
            string: input.read_string()?,
        });
    }
    Ok(events)
}
