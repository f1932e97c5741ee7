//! Byte-exact `.skel` encoder used to build decode fixtures in tests.

use crate::animation::Curve;

pub(crate) fn zigzag_encode(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

pub(crate) fn encode_varint(out: &mut Vec<u8>, mut v: u32) {
    loop {
        let b = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            out.push(b);
            return;
        }
        out.push(b | 0x80);
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct SkelWriter {
    bytes: Vec<u8>,
}

impl SkelWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub(crate) fn byte(&mut self, v: i8) -> &mut Self {
        self.bytes.push(v as u8);
        self
    }

    pub(crate) fn bool(&mut self, v: bool) -> &mut Self {
        self.bytes.push(v as u8);
        self
    }

    pub(crate) fn short(&mut self, v: i16) -> &mut Self {
        self.raw(&v.to_be_bytes())
    }

    pub(crate) fn int(&mut self, v: i32) -> &mut Self {
        self.raw(&v.to_be_bytes())
    }

    pub(crate) fn float(&mut self, v: f32) -> &mut Self {
        self.raw(&v.to_be_bytes())
    }

    pub(crate) fn floats(&mut self, values: &[f32]) -> &mut Self {
        for &v in values {
            self.float(v);
        }
        self
    }

    /// Raw varint, as read with `optimize_positive`.
    pub(crate) fn varint(&mut self, v: u32) -> &mut Self {
        encode_varint(&mut self.bytes, v);
        self
    }

    /// Zig-zag varint, as read without `optimize_positive`.
    pub(crate) fn signed(&mut self, v: i32) -> &mut Self {
        self.varint(zigzag_encode(v))
    }

    /// Non-negative varint written on the positive path (counts, indices, modes, offsets).
    pub(crate) fn count(&mut self, v: usize) -> &mut Self {
        self.varint(v as u32)
    }

    /// Negative values on the positive path take five bytes.
    pub(crate) fn positive_path(&mut self, v: i32) -> &mut Self {
        self.varint(v as u32)
    }

    /// Length-prefixed string; characters outside the BMP are not representable.
    pub(crate) fn string(&mut self, v: Option<&str>) -> &mut Self {
        match v {
            None => self.count(0),
            Some(s) => {
                debug_assert!(s.chars().all(|c| (c as u32) < 0x10000 && c != '\0'));
                self.count(s.len() + 1).raw(s.as_bytes())
            }
        }
    }

    pub(crate) fn str(&mut self, v: &str) -> &mut Self {
        self.string(Some(v))
    }

    pub(crate) fn curve(&mut self, curve: Curve) -> &mut Self {
        match curve {
            Curve::Linear => self.byte(0),
            Curve::Stepped => self.byte(1),
            Curve::Bezier { cx1, cy1, cx2, cy2 } => self.byte(2).floats(&[cx1, cy1, cx2, cy2]),
        }
    }
}

/// A counted run of entries.
#[derive(Clone, Debug, Default)]
pub(crate) struct Section {
    count: usize,
    body: SkelWriter,
}

impl Section {
    pub(crate) fn push(&mut self, entry: impl FnOnce(&mut SkelWriter)) -> &mut Self {
        self.count += 1;
        entry(&mut self.body);
        self
    }

    fn write(&self, out: &mut SkelWriter) {
        out.count(self.count).raw(&self.body.bytes);
    }
}

/// Whole-file fixture. Sections are written in stream order by [`SkelFixture::build`].
#[derive(Clone, Debug)]
pub(crate) struct SkelFixture {
    pub(crate) hash: Option<String>,
    pub(crate) version: Option<String>,
    pub(crate) width: f32,
    pub(crate) height: f32,
    /// `(fps, images path)`; `Some` sets the nonessential flag.
    pub(crate) nonessential: Option<(f32, Option<String>)>,
    pub(crate) bones: Section,
    pub(crate) slots: Section,
    pub(crate) ik_constraints: Section,
    pub(crate) transform_constraints: Section,
    pub(crate) path_constraints: Section,
    /// Slot groups of the default skin.
    pub(crate) default_skin: Section,
    pub(crate) skins: Section,
    pub(crate) events: Section,
    pub(crate) animations: Section,
}

impl SkelFixture {
    /// Header only: no bones, slots, skins, events or animations.
    pub(crate) fn empty() -> Self {
        Self {
            hash: Some("k9Ee8kx5b2E".to_string()),
            version: Some("3.6.53".to_string()),
            width: 0.0,
            height: 0.0,
            nonessential: None,
            bones: Section::default(),
            slots: Section::default(),
            ik_constraints: Section::default(),
            transform_constraints: Section::default(),
            path_constraints: Section::default(),
            default_skin: Section::default(),
            skins: Section::default(),
            events: Section::default(),
            animations: Section::default(),
        }
    }

    /// Root bone plus `slot_count` slots on it, named `slot0`, `slot1`, ...
    pub(crate) fn with_slots(slot_count: usize) -> Self {
        let mut fixture = Self::empty();
        fixture.bones.push(|w| bone(w, "root", None, [0.0, 0.0], 0.0));
        for i in 0..slot_count {
            fixture.slots.push(|w| slot(w, &format!("slot{i}"), 0));
        }
        fixture
    }

    pub(crate) fn nonessential(&self) -> bool {
        self.nonessential.is_some()
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut w = SkelWriter::new();
        w.string(self.hash.as_deref())
            .string(self.version.as_deref())
            .float(self.width)
            .float(self.height)
            .bool(self.nonessential());
        if let Some((fps, images)) = &self.nonessential {
            w.float(*fps).string(images.as_deref());
        }
        self.bones.write(&mut w);
        self.slots.write(&mut w);
        self.ik_constraints.write(&mut w);
        self.transform_constraints.write(&mut w);
        self.path_constraints.write(&mut w);
        self.default_skin.write(&mut w);
        self.skins.write(&mut w);
        self.events.write(&mut w);
        self.animations.write(&mut w);
        w.into_bytes()
    }
}

/// Bone entry with unit scale, no shear and `Normal` transform mode. The parent is omitted for
/// the first bone; pass `None` only there.
pub(crate) fn bone(w: &mut SkelWriter, name: &str, parent: Option<usize>, xy: [f32; 2], length: f32) {
    w.str(name);
    if let Some(parent) = parent {
        w.count(parent);
    }
    w.float(0.0)
        .floats(&xy)
        .floats(&[1.0, 1.0, 0.0, 0.0])
        .float(length)
        .count(0);
}

/// White slot with no dark color, no setup attachment and `Normal` blending.
pub(crate) fn slot(w: &mut SkelWriter, name: &str, bone: usize) {
    w.str(name)
        .count(bone)
        .int(-1)
        .int(-1)
        .string(None)
        .count(0);
}

/// One slot group of a skin: the slot index followed by its attachments.
pub(crate) fn slot_group(
    w: &mut SkelWriter,
    slot_index: usize,
    attachments: &[&dyn Fn(&mut SkelWriter)],
) {
    w.count(slot_index).count(attachments.len());
    for attachment in attachments {
        attachment(w);
    }
}

/// Unweighted mesh with the given local vertices (pairs) and a single triangle.
pub(crate) fn mesh(w: &mut SkelWriter, key: &str, vertices: &[f32], nonessential: bool) {
    let vertex_count = vertices.len() / 2;
    w.str(key).string(None).byte(2).string(None).int(-1);
    w.count(vertex_count);
    for i in 0..vertex_count {
        w.float(i as f32 / vertex_count as f32).float(1.0);
    }
    w.count(3).short(0).short(1).short(2);
    w.bool(false).floats(vertices);
    w.count(vertex_count);
    if nonessential {
        w.count(0).float(10.0).float(10.0);
    }
}

/// Linked mesh pointing at `parent` in `parent_skin` (`None` = default skin).
pub(crate) fn linked_mesh(
    w: &mut SkelWriter,
    key: &str,
    parent_skin: Option<&str>,
    parent: &str,
    inherit_deform: bool,
    nonessential: bool,
) {
    w.str(key)
        .string(None)
        .byte(3)
        .string(None)
        .int(-1)
        .string(parent_skin)
        .str(parent)
        .bool(inherit_deform);
    if nonessential {
        w.float(10.0).float(10.0);
    }
}

/// Point attachment at `(x, y)`.
pub(crate) fn point(w: &mut SkelWriter, key: &str, xy: [f32; 2], nonessential: bool) {
    w.str(key).string(None).byte(5).float(0.0).floats(&xy);
    if nonessential {
        w.int(-1);
    }
}

/// Region attachment with unit scale and no rotation.
pub(crate) fn region(w: &mut SkelWriter, key: &str, path: Option<&str>, size: [f32; 2]) {
    w.str(key)
        .string(None)
        .byte(0)
        .string(path)
        .float(0.0)
        .floats(&[0.0, 0.0])
        .floats(&[1.0, 1.0])
        .floats(&size)
        .int(-1);
}

/// Timeline sections of one animation, written in stream order.
#[derive(Clone, Debug, Default)]
pub(crate) struct AnimationFixture {
    pub(crate) slots: Section,
    pub(crate) bones: Section,
    pub(crate) ik: Section,
    pub(crate) transform: Section,
    pub(crate) paths: Section,
    pub(crate) deform: Section,
    pub(crate) draw_order: Section,
    pub(crate) events: Section,
}

impl AnimationFixture {
    pub(crate) fn write(&self, name: &str, w: &mut SkelWriter) {
        w.str(name);
        self.slots.write(w);
        self.bones.write(w);
        self.ik.write(w);
        self.transform.write(w);
        self.paths.write(w);
        self.deform.write(w);
        self.draw_order.write(w);
        self.events.write(w);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_encoding_matches_known_bytes() {
        let mut out = Vec::new();
        encode_varint(&mut out, 300);
        assert_eq!(out, [0xAC, 0x02]);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(i32::MIN), u32::MAX);
    }

    #[test]
    fn negative_positive_path_values_take_five_bytes() {
        let mut w = SkelWriter::new();
        w.positive_path(-3);
        assert_eq!(w.len(), 5);
    }

    #[test]
    fn empty_fixture_layout() {
        let bytes = SkelFixture::empty().build();
        // hash(12) + version(7) + width/height(8) + nonessential(1) + nine empty counts.
        assert_eq!(bytes.len(), 12 + 7 + 8 + 1 + 9);
    }
}
