use super::linked_mesh::PendingLinkedMesh;
use super::{BinaryInput, read_index, read_name};
use crate::Error;
use crate::attachment::{Attachment, AttachmentType, VertexData};
use crate::loader::AttachmentLoader;
use crate::model::Skin;

/// Reads skins for one decode, collecting linked meshes for later resolution.
pub(super) struct SkinReader<'a, L> {
    loader: &'a L,
    scale: f32,
    nonessential: bool,
    bone_count: usize,
    slot_count: usize,
    linked_meshes: Vec<PendingLinkedMesh>,
}

impl<'a, L: AttachmentLoader> SkinReader<'a, L> {
    pub(super) fn new(
        loader: &'a L,
        scale: f32,
        nonessential: bool,
        bone_count: usize,
        slot_count: usize,
    ) -> Self {
        Self {
            loader,
            scale,
            nonessential,
            bone_count,
            slot_count,
            linked_meshes: Vec::new(),
        }
    }

    pub(super) fn into_linked_meshes(self) -> Vec<PendingLinkedMesh> {
        self.linked_meshes
    }

    /// Reads one skin that will be stored at `skin_index`. Returns `None` when it has no slots.
    pub(super) fn read_skin(
        &mut self,
        input: &mut BinaryInput<'_>,
        skin_index: usize,
        name: &str,
    ) -> Result<Option<Skin>, Error> {
        let slot_groups = input.read_count()?;
        if slot_groups == 0 {
            return Ok(None);
        }

        let mut skin = Skin::new(name);
        for _ in 0..slot_groups {
            let slot_index = read_index(input, "slot", self.slot_count)?;
            let count = input.read_count()?;
            for _ in 0..count {
                let key = read_name(input, "attachment")?;
                match self.read_attachment(input, &skin, skin_index, slot_index, &key)? {
                    Some(attachment) => skin.add_attachment(slot_index, key, attachment),
                    None => tracing::warn!(
                        skin = name,
                        slot = slot_index,
                        attachment = %key,
                        "attachment loader declined attachment, skipping"
                    ),
                }
            }
        }
        tracing::debug!(
            skin = name,
            attachments = skin.attachment_count(),
            "read skin"
        );
        Ok(Some(skin))
    }

    fn read_attachment(
        &mut self,
        input: &mut BinaryInput<'_>,
        skin: &Skin,
        skin_index: usize,
        slot_index: usize,
        key: &str,
    ) -> Result<Option<Attachment>, Error> {
        let scale = self.scale;
        let offset = input.position();
        let name = input.read_string()?.unwrap_or_else(|| key.to_string());
        let tag = input.read_byte()?;
        let kind = AttachmentType::from_binary(tag)
            .ok_or_else(|| Error::parse(format!("unknown attachment type {tag} for '{name}'")))?;
        tracing::trace!(
            skin = %skin.name,
            slot = slot_index,
            attachment = %name,
            ?kind,
            offset,
            "read attachment"
        );

        let attachment = match kind {
            AttachmentType::Region => {
                let path = input.read_string()?;
                let rotation = input.read_f32()?;
                let x = input.read_f32()?;
                let y = input.read_f32()?;
                let scale_x = input.read_f32()?;
                let scale_y = input.read_f32()?;
                let width = input.read_f32()?;
                let height = input.read_f32()?;
                let color = input.read_color_rgba()?;

                let path = path.unwrap_or_else(|| name.clone());
                let Some(mut region) = self.loader.new_region_attachment(skin, &name, &path) else {
                    return Ok(None);
                };
                region.path = path;
                region.x = x * scale;
                region.y = y * scale;
                region.scale_x = scale_x;
                region.scale_y = scale_y;
                region.rotation = rotation;
                region.width = width * scale;
                region.height = height * scale;
                region.color = color;
                region.update_offset();
                Attachment::Region(region)
            }
            AttachmentType::BoundingBox => {
                let vertex_count = input.read_count()?;
                let vertex_data = self.read_vertices(input, vertex_count)?;
                if self.nonessential {
                    let _color = input.read_i32()?;
                }

                let Some(mut bbox) = self.loader.new_bounding_box_attachment(skin, &name) else {
                    return Ok(None);
                };
                bbox.vertex_data = vertex_data;
                Attachment::BoundingBox(bbox)
            }
            AttachmentType::Mesh => {
                let path = input.read_string()?;
                let color = input.read_color_rgba()?;
                let vertex_count = input.read_count()?;
                let region_uvs = read_float_array(input, vertex_count.saturating_mul(2), 1.0)?;
                let triangles = read_short_array(input)?;
                let vertex_data = self.read_vertices(input, vertex_count)?;
                let hull_length = input.read_count()?;
                let (edges, width, height) = if self.nonessential {
                    (
                        read_short_array(input)?,
                        input.read_f32()? * scale,
                        input.read_f32()? * scale,
                    )
                } else {
                    (Vec::new(), 0.0, 0.0)
                };

                let path = path.unwrap_or_else(|| name.clone());
                let Some(mut mesh) = self.loader.new_mesh_attachment(skin, &name, &path) else {
                    return Ok(None);
                };
                mesh.path = path;
                mesh.color = color;
                mesh.vertex_data = vertex_data;
                mesh.triangles = triangles;
                mesh.region_uvs = region_uvs;
                mesh.update_uvs();
                mesh.hull_length = hull_length.saturating_mul(2);
                mesh.edges = edges;
                mesh.width = width;
                mesh.height = height;
                Attachment::Mesh(mesh)
            }
            AttachmentType::LinkedMesh => {
                let path = input.read_string()?;
                let color = input.read_color_rgba()?;
                let parent_skin = input.read_string()?;
                let parent = read_name(input, "parent mesh")?;
                let inherit_deform = input.read_bool()?;
                let (width, height) = if self.nonessential {
                    (input.read_f32()? * scale, input.read_f32()? * scale)
                } else {
                    (0.0, 0.0)
                };

                let path = path.unwrap_or_else(|| name.clone());
                let Some(mut mesh) = self.loader.new_mesh_attachment(skin, &name, &path) else {
                    return Ok(None);
                };
                mesh.path = path;
                mesh.color = color;
                mesh.inherit_deform = inherit_deform;
                mesh.width = width;
                mesh.height = height;
                self.linked_meshes.push(PendingLinkedMesh {
                    skin_index,
                    slot_index,
                    key: key.to_string(),
                    parent_skin,
                    parent,
                });
                Attachment::Mesh(mesh)
            }
            AttachmentType::Path => {
                let closed = input.read_bool()?;
                let constant_speed = input.read_bool()?;
                let vertex_count = input.read_count()?;
                let vertex_data = self.read_vertices(input, vertex_count)?;
                let lengths = read_float_array(input, vertex_count / 3, scale)?;
                let color = self.read_nonessential_color(input)?;

                let Some(mut path) = self.loader.new_path_attachment(skin, &name) else {
                    return Ok(None);
                };
                path.closed = closed;
                path.constant_speed = constant_speed;
                path.vertex_data = vertex_data;
                path.lengths = lengths;
                if let Some(color) = color {
                    path.color = color;
                }
                Attachment::Path(path)
            }
            AttachmentType::Point => {
                let rotation = input.read_f32()?;
                let x = input.read_f32()?;
                let y = input.read_f32()?;
                let color = self.read_nonessential_color(input)?;

                let Some(mut point) = self.loader.new_point_attachment(skin, &name) else {
                    return Ok(None);
                };
                point.x = x * scale;
                point.y = y * scale;
                point.rotation = rotation;
                if let Some(color) = color {
                    point.color = color;
                }
                Attachment::Point(point)
            }
            AttachmentType::Clipping => {
                let end_slot = read_index(input, "slot", self.slot_count)?;
                let vertex_count = input.read_count()?;
                let vertex_data = self.read_vertices(input, vertex_count)?;
                let color = self.read_nonessential_color(input)?;

                let Some(mut clip) = self.loader.new_clipping_attachment(skin, &name) else {
                    return Ok(None);
                };
                clip.end_slot = Some(end_slot);
                clip.vertex_data = vertex_data;
                if let Some(color) = color {
                    clip.color = color;
                }
                Attachment::Clipping(clip)
            }
        };
        Ok(Some(attachment))
    }

    fn read_nonessential_color(
        &self,
        input: &mut BinaryInput<'_>,
    ) -> Result<Option<[f32; 4]>, Error> {
        if self.nonessential {
            input.read_color_rgba().map(Some)
        } else {
            Ok(None)
        }
    }

    fn read_vertices(
        &self,
        input: &mut BinaryInput<'_>,
        vertex_count: usize,
    ) -> Result<VertexData, Error> {
        let world_vertices_length = vertex_count.saturating_mul(2);
        if !input.read_bool()? {
            return Ok(VertexData {
                bones: None,
                vertices: read_float_array(input, world_vertices_length, self.scale)?,
                world_vertices_length,
            });
        }

        let mut bones = Vec::with_capacity(world_vertices_length.min(input.remaining()));
        let mut vertices = Vec::with_capacity(world_vertices_length.min(input.remaining() / 4));
        for _ in 0..vertex_count {
            let bone_count = input.read_count()?;
            bones.push(bone_count);
            for _ in 0..bone_count {
                bones.push(read_index(input, "bone", self.bone_count)?);
                vertices.push(input.read_f32()? * self.scale);
                vertices.push(input.read_f32()? * self.scale);
                vertices.push(input.read_f32()?);
            }
        }
        Ok(VertexData {
            bones: Some(bones),
            vertices,
            world_vertices_length,
        })
    }
}

fn read_float_array(input: &mut BinaryInput<'_>, n: usize, scale: f32) -> Result<Vec<f32>, Error> {
    let mut out = Vec::with_capacity(n.min(input.remaining() / 4));
    for _ in 0..n {
        out.push(input.read_f32()? * scale);
    }
    Ok(out)
}

fn read_short_array(input: &mut BinaryInput<'_>) -> Result<Vec<u16>, Error> {
    let n = input.read_count()?;
    let mut out = Vec::with_capacity(n.min(input.remaining() / 2));
    for _ in 0..n {
        out.push(input.read_short()? as u16);
    }
    Ok(out)
}
