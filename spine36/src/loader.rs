//! Attachment construction during decode.
//!
//! The decoder asks an [`AttachmentLoader`] for each attachment before filling in the decoded
//! fields. Returning `None` skips the attachment; the rest of the skeleton still loads.

use crate::atlas::Atlas;
use crate::attachment::{
    BoundingBoxAttachment, ClippingAttachment, MeshAttachment, PathAttachment, PointAttachment,
    RegionAttachment,
};
use crate::model::Skin;

pub trait AttachmentLoader {
    fn new_region_attachment(&self, skin: &Skin, name: &str, path: &str) -> Option<RegionAttachment>;

    fn new_mesh_attachment(&self, skin: &Skin, name: &str, path: &str) -> Option<MeshAttachment>;

    fn new_bounding_box_attachment(&self, _skin: &Skin, name: &str) -> Option<BoundingBoxAttachment> {
        Some(BoundingBoxAttachment::new(name))
    }

    fn new_path_attachment(&self, _skin: &Skin, name: &str) -> Option<PathAttachment> {
        Some(PathAttachment::new(name))
    }

    fn new_point_attachment(&self, _skin: &Skin, name: &str) -> Option<PointAttachment> {
        Some(PointAttachment::new(name))
    }

    fn new_clipping_attachment(&self, _skin: &Skin, name: &str) -> Option<ClippingAttachment> {
        Some(ClippingAttachment::new(name))
    }
}

impl<L: AttachmentLoader + ?Sized> AttachmentLoader for &L {
    fn new_region_attachment(&self, skin: &Skin, name: &str, path: &str) -> Option<RegionAttachment> {
        (**self).new_region_attachment(skin, name, path)
    }

    fn new_mesh_attachment(&self, skin: &Skin, name: &str, path: &str) -> Option<MeshAttachment> {
        (**self).new_mesh_attachment(skin, name, path)
    }

    fn new_bounding_box_attachment(&self, skin: &Skin, name: &str) -> Option<BoundingBoxAttachment> {
        (**self).new_bounding_box_attachment(skin, name)
    }

    fn new_path_attachment(&self, skin: &Skin, name: &str) -> Option<PathAttachment> {
        (**self).new_path_attachment(skin, name)
    }

    fn new_point_attachment(&self, skin: &Skin, name: &str) -> Option<PointAttachment> {
        (**self).new_point_attachment(skin, name)
    }

    fn new_clipping_attachment(&self, skin: &Skin, name: &str) -> Option<ClippingAttachment> {
        (**self).new_clipping_attachment(skin, name)
    }
}

/// Builds every attachment without binding a texture.
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultAttachmentLoader;

impl AttachmentLoader for DefaultAttachmentLoader {
    fn new_region_attachment(&self, _skin: &Skin, name: &str, path: &str) -> Option<RegionAttachment> {
        Some(RegionAttachment::new(name, path))
    }

    fn new_mesh_attachment(&self, _skin: &Skin, name: &str, path: &str) -> Option<MeshAttachment> {
        Some(MeshAttachment::new(name, path))
    }
}

/// Binds regions and meshes to atlas regions looked up by attachment path.
///
/// Attachments whose path is not in the atlas are skipped with a warning.
#[derive(Copy, Clone, Debug)]
pub struct AtlasAttachmentLoader<'a> {
    atlas: &'a Atlas,
}

impl<'a> AtlasAttachmentLoader<'a> {
    pub fn new(atlas: &'a Atlas) -> Self {
        Self { atlas }
    }
}

impl AttachmentLoader for AtlasAttachmentLoader<'_> {
    fn new_region_attachment(&self, skin: &Skin, name: &str, path: &str) -> Option<RegionAttachment> {
        let Some(region) = self.atlas.texture_region(path) else {
            tracing::warn!(
                skin = %skin.name,
                attachment = name,
                path,
                "region not found in atlas, skipping region attachment"
            );
            return None;
        };
        let mut attachment = RegionAttachment::new(name, path);
        attachment.set_region(region);
        Some(attachment)
    }

    fn new_mesh_attachment(&self, skin: &Skin, name: &str, path: &str) -> Option<MeshAttachment> {
        let Some(region) = self.atlas.texture_region(path) else {
            tracing::warn!(
                skin = %skin.name,
                attachment = name,
                path,
                "region not found in atlas, skipping mesh attachment"
            );
            return None;
        };
        let mut attachment = MeshAttachment::new(name, path);
        attachment.set_region(region);
        Some(attachment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATLAS: &str = "
hero.png
size: 64,32
format: RGBA8888
filter: Linear,Linear
repeat: none
head
  rotate: false
  xy: 0, 0
  size: 32, 32
  orig: 32, 32
  offset: 0, 0
  index: -1
";

    #[test]
    fn default_loader_builds_everything() {
        let skin = Skin::new("default");
        let loader = DefaultAttachmentLoader;
        let region = loader.new_region_attachment(&skin, "a", "images/a").unwrap();
        assert_eq!(region.path, "images/a");
        assert!(region.region.is_none());
        assert!(loader.new_mesh_attachment(&skin, "m", "m").is_some());
        assert!(loader.new_bounding_box_attachment(&skin, "bb").is_some());
        assert!(loader.new_path_attachment(&skin, "p").is_some());
        assert!(loader.new_point_attachment(&skin, "pt").is_some());
        assert!(loader.new_clipping_attachment(&skin, "c").is_some());
    }

    #[test]
    fn atlas_loader_binds_or_declines() {
        let atlas = Atlas::parse(ATLAS).unwrap();
        let skin = Skin::new("default");
        let loader = AtlasAttachmentLoader::new(&atlas);

        let region = loader.new_region_attachment(&skin, "head", "head").unwrap();
        let bound = region.region.as_ref().unwrap();
        assert_eq!(bound.page, "hero.png");
        assert_eq!(bound.u2, 0.5);
        assert_eq!(region.uvs, [0.0, 1.0, 0.0, 0.0, 0.5, 0.0, 0.5, 1.0]);

        let mesh = loader.new_mesh_attachment(&skin, "head-mesh", "head").unwrap();
        assert!(mesh.region.is_some());

        assert!(loader.new_region_attachment(&skin, "x", "missing").is_none());
        assert!(loader.new_mesh_attachment(&skin, "x", "missing").is_none());
        // Non-textured kinds never need the atlas.
        assert!(loader.new_clipping_attachment(&skin, "clip").is_some());
    }

    #[test]
    fn loaders_work_through_references() {
        fn build<L: AttachmentLoader>(loader: L) -> Option<PointAttachment> {
            loader.new_point_attachment(&Skin::new("s"), "p")
        }
        let loader = DefaultAttachmentLoader;
        assert_eq!(build(&loader).map(|p| p.name), Some("p".to_string()));
    }
}
