//! Attachment variants stored in skins.
//!
//! Vertex-bearing attachments share [`VertexData`]: a flat `vertices` buffer and, for weighted
//! geometry, an interleaved `bones` array of `[count, bone, bone, ..., count, bone, ...]` with one
//! `(x, y, weight)` triple in `vertices` per listed bone.

/// Wire tag of an attachment entry.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AttachmentType {
    Region,
    BoundingBox,
    Mesh,
    LinkedMesh,
    Path,
    Point,
    Clipping,
}

impl AttachmentType {
    pub(crate) fn from_binary(tag: i8) -> Option<Self> {
        match tag {
            0 => Some(Self::Region),
            1 => Some(Self::BoundingBox),
            2 => Some(Self::Mesh),
            3 => Some(Self::LinkedMesh),
            4 => Some(Self::Path),
            5 => Some(Self::Point),
            6 => Some(Self::Clipping),
            _ => None,
        }
    }
}

/// Texture placement bound to a region or mesh by an [`AttachmentLoader`](crate::AttachmentLoader).
///
/// Sizes are in pixels. `width`/`height` are the unrotated size after whitespace stripping,
/// `original_*` the size before stripping, `u..v2` the normalized page rectangle.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct TextureRegion {
    pub name: String,
    pub page: String,
    pub page_width: f32,
    pub page_height: f32,
    pub u: f32,
    pub v: f32,
    pub u2: f32,
    pub v2: f32,
    /// Packing rotation, `0` or `90` for 3.x atlases.
    pub degrees: i32,
    pub width: f32,
    pub height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub original_width: f32,
    pub original_height: f32,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexData {
    pub bones: Option<Vec<usize>>,
    pub vertices: Vec<f32>,
    /// Length of the world-space output: `2 * vertex_count`.
    pub world_vertices_length: usize,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct VertexWeight {
    pub bone: usize,
    pub x: f32,
    pub y: f32,
    pub weight: f32,
}

impl VertexData {
    pub fn is_weighted(&self) -> bool {
        self.bones.is_some()
    }

    /// Number of floats a deform frame for this geometry holds.
    pub fn deform_length(&self) -> usize {
        if self.is_weighted() {
            self.vertices.len() / 3 * 2
        } else {
            self.vertices.len()
        }
    }

    /// Regroups weighted geometry per vertex. Returns an empty list for unweighted geometry.
    pub fn weights(&self) -> Vec<Vec<VertexWeight>> {
        let Some(bones) = &self.bones else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(self.world_vertices_length / 2);
        let mut b = 0usize;
        let mut v = 0usize;
        while b < bones.len() {
            let count = bones[b];
            b += 1;
            let mut influences = Vec::with_capacity(count);
            for _ in 0..count {
                let (Some(&bone), Some(xyw)) = (bones.get(b), self.vertices.get(v..v + 3)) else {
                    break;
                };
                influences.push(VertexWeight {
                    bone,
                    x: xyw[0],
                    y: xyw[1],
                    weight: xyw[2],
                });
                b += 1;
                v += 3;
            }
            out.push(influences);
        }
        out
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct RegionAttachment {
    pub name: String,
    pub path: String,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub width: f32,
    pub height: f32,
    pub color: [f32; 4],
    pub region: Option<TextureRegion>,
    /// Local corner positions `[BL, UL, UR, BR]` as `x, y` pairs; see [`Self::update_offset`].
    pub offset: [f32; 8],
    /// Texture coordinates in the same corner order as `offset`.
    pub uvs: [f32; 8],
}

impl RegionAttachment {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            width: 0.0,
            height: 0.0,
            color: [1.0; 4],
            region: None,
            offset: [0.0; 8],
            uvs: [0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0],
        }
    }

    /// Binds a texture region and takes its corner UVs.
    pub fn set_region(&mut self, region: TextureRegion) {
        let (u, v, u2, v2) = (region.u, region.v, region.u2, region.v2);
        self.uvs = if region.degrees == 90 {
            [u2, v2, u, v2, u, v, u2, v]
        } else {
            [u, v2, u, v, u2, v, u2, v2]
        };
        self.region = Some(region);
    }

    /// Recomputes `offset` from size, scale, rotation and the bound region's stripped whitespace.
    pub fn update_offset(&mut self) {
        let (local_x, local_y, local_x2, local_y2) = match &self.region {
            Some(r) => {
                let region_scale_x = self.width / r.original_width.max(1.0) * self.scale_x;
                let region_scale_y = self.height / r.original_height.max(1.0) * self.scale_y;
                let local_x = -self.width * 0.5 * self.scale_x + r.offset_x * region_scale_x;
                let local_y = -self.height * 0.5 * self.scale_y + r.offset_y * region_scale_y;
                (
                    local_x,
                    local_y,
                    local_x + r.width * region_scale_x,
                    local_y + r.height * region_scale_y,
                )
            }
            None => (
                -self.width * 0.5 * self.scale_x,
                -self.height * 0.5 * self.scale_y,
                self.width * 0.5 * self.scale_x,
                self.height * 0.5 * self.scale_y,
            ),
        };

        let (sin, cos) = self.rotation.to_radians().sin_cos();
        let local_x_cos = local_x * cos + self.x;
        let local_x_sin = local_x * sin;
        let local_y_cos = local_y * cos + self.y;
        let local_y_sin = local_y * sin;
        let local_x2_cos = local_x2 * cos + self.x;
        let local_x2_sin = local_x2 * sin;
        let local_y2_cos = local_y2 * cos + self.y;
        let local_y2_sin = local_y2 * sin;

        self.offset = [
            local_x_cos - local_y_sin,
            local_y_cos + local_x_sin,
            local_x_cos - local_y2_sin,
            local_y2_cos + local_x_sin,
            local_x2_cos - local_y2_sin,
            local_y2_cos + local_x2_sin,
            local_x2_cos - local_y_sin,
            local_y_cos + local_x2_sin,
        ];
    }
}

/// Where a linked mesh's geometry came from.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParentMesh {
    pub skin_index: usize,
    pub slot_index: usize,
    pub name: String,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct MeshAttachment {
    pub name: String,
    pub path: String,
    pub color: [f32; 4],
    pub vertex_data: VertexData,
    /// UVs as stored, normalized to the mesh's own image.
    pub region_uvs: Vec<f32>,
    /// UVs mapped onto the bound texture page; see [`Self::update_uvs`].
    pub uvs: Vec<f32>,
    pub triangles: Vec<u16>,
    /// Number of floats (not vertices) on the hull.
    pub hull_length: usize,
    pub edges: Vec<u16>,
    pub width: f32,
    pub height: f32,
    pub region: Option<TextureRegion>,
    pub parent_mesh: Option<ParentMesh>,
    pub inherit_deform: bool,
}

impl MeshAttachment {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            color: [1.0; 4],
            vertex_data: VertexData::default(),
            region_uvs: Vec::new(),
            uvs: Vec::new(),
            triangles: Vec::new(),
            hull_length: 0,
            edges: Vec::new(),
            width: 0.0,
            height: 0.0,
            region: None,
            parent_mesh: None,
            inherit_deform: false,
        }
    }

    pub fn set_region(&mut self, region: TextureRegion) {
        self.region = Some(region);
    }

    /// Maps `region_uvs` into page space using the bound region, or copies them when unbound.
    pub fn update_uvs(&mut self) {
        let Some(region) = &self.region else {
            self.uvs.clone_from(&self.region_uvs);
            return;
        };
        let tex_w = region.page_width.max(1.0);
        let tex_h = region.page_height.max(1.0);
        let (ow, oh) = (region.original_width, region.original_height);
        let (ox, oy) = (region.offset_x, region.offset_y);
        let (rw, rh) = (region.width, region.height);

        let mut u = region.u;
        let mut v = region.v;
        let map: fn(f32, f32, f32, f32, f32, f32) -> (f32, f32);
        let (width, height) = match region.degrees {
            90 => {
                u -= (oh - oy - rh) / tex_w;
                v -= (ow - ox - rw) / tex_h;
                map = |u, v, w, h, ru, rv| (u + rv * w, v + (1.0 - ru) * h);
                (oh / tex_w, ow / tex_h)
            }
            180 => {
                u -= (ow - ox - rw) / tex_w;
                v -= oy / tex_h;
                map = |u, v, w, h, ru, rv| (u + (1.0 - ru) * w, v + (1.0 - rv) * h);
                (ow / tex_w, oh / tex_h)
            }
            270 => {
                u -= oy / tex_w;
                v -= ox / tex_h;
                map = |u, v, w, h, ru, rv| (u + (1.0 - rv) * w, v + ru * h);
                (oh / tex_w, ow / tex_h)
            }
            _ => {
                u -= ox / tex_w;
                v -= (oh - oy - rh) / tex_h;
                map = |u, v, w, h, ru, rv| (u + ru * w, v + rv * h);
                (ow / tex_w, oh / tex_h)
            }
        };

        self.uvs.clear();
        self.uvs.reserve(self.region_uvs.len());
        for pair in self.region_uvs.chunks_exact(2) {
            let (mu, mv) = map(u, v, width, height, pair[0], pair[1]);
            self.uvs.push(mu);
            self.uvs.push(mv);
        }
    }

    /// Copies shared geometry from `parent` and records the link.
    pub(crate) fn set_parent_mesh(&mut self, parent: &MeshAttachment, link: ParentMesh) {
        self.vertex_data = parent.vertex_data.clone();
        self.region_uvs.clone_from(&parent.region_uvs);
        self.triangles.clone_from(&parent.triangles);
        self.hull_length = parent.hull_length;
        self.edges.clone_from(&parent.edges);
        self.width = parent.width;
        self.height = parent.height;
        self.parent_mesh = Some(link);
    }

    /// The mesh whose deform timelines also drive this one, if any.
    pub fn deform_source(&self) -> Option<&ParentMesh> {
        if self.inherit_deform {
            self.parent_mesh.as_ref()
        } else {
            None
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct BoundingBoxAttachment {
    pub name: String,
    pub vertex_data: VertexData,
}

impl BoundingBoxAttachment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertex_data: VertexData::default(),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct PathAttachment {
    pub name: String,
    pub closed: bool,
    pub constant_speed: bool,
    pub vertex_data: VertexData,
    /// Cumulative curve lengths, one per bezier segment.
    pub lengths: Vec<f32>,
    pub color: [f32; 4],
}

impl PathAttachment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            closed: false,
            constant_speed: false,
            vertex_data: VertexData::default(),
            lengths: Vec::new(),
            color: [1.0; 4],
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct PointAttachment {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub color: [f32; 4],
}

impl PointAttachment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            color: [1.0; 4],
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct ClippingAttachment {
    pub name: String,
    pub end_slot: Option<usize>,
    pub vertex_data: VertexData,
    pub color: [f32; 4],
}

impl ClippingAttachment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            end_slot: None,
            vertex_data: VertexData::default(),
            color: [1.0; 4],
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub enum Attachment {
    Region(RegionAttachment),
    BoundingBox(BoundingBoxAttachment),
    Mesh(MeshAttachment),
    Path(PathAttachment),
    Point(PointAttachment),
    Clipping(ClippingAttachment),
}

impl Attachment {
    pub fn name(&self) -> &str {
        match self {
            Attachment::Region(a) => a.name.as_str(),
            Attachment::BoundingBox(a) => a.name.as_str(),
            Attachment::Mesh(a) => a.name.as_str(),
            Attachment::Path(a) => a.name.as_str(),
            Attachment::Point(a) => a.name.as_str(),
            Attachment::Clipping(a) => a.name.as_str(),
        }
    }

    /// A resolved linked mesh reports [`AttachmentType::LinkedMesh`].
    pub fn attachment_type(&self) -> AttachmentType {
        match self {
            Attachment::Region(_) => AttachmentType::Region,
            Attachment::BoundingBox(_) => AttachmentType::BoundingBox,
            Attachment::Mesh(m) if m.parent_mesh.is_some() => AttachmentType::LinkedMesh,
            Attachment::Mesh(_) => AttachmentType::Mesh,
            Attachment::Path(_) => AttachmentType::Path,
            Attachment::Point(_) => AttachmentType::Point,
            Attachment::Clipping(_) => AttachmentType::Clipping,
        }
    }

    pub fn vertex_data(&self) -> Option<&VertexData> {
        match self {
            Attachment::BoundingBox(a) => Some(&a.vertex_data),
            Attachment::Mesh(a) => Some(&a.vertex_data),
            Attachment::Path(a) => Some(&a.vertex_data),
            Attachment::Clipping(a) => Some(&a.vertex_data),
            Attachment::Region(_) | Attachment::Point(_) => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&MeshAttachment> {
        match self {
            Attachment::Mesh(m) => Some(m),
            _ => None,
        }
    }

    pub(crate) fn as_mesh_mut(&mut self) -> Option<&mut MeshAttachment> {
        match self {
            Attachment::Mesh(m) => Some(m),
            _ => None,
        }
    }
}
