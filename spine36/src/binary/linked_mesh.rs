use crate::Error;
use crate::attachment::{Attachment, ParentMesh};
use crate::model::Skin;

/// A linked mesh read before its parent is known to exist.
#[derive(Clone, Debug)]
pub(super) struct PendingLinkedMesh {
    /// Where the linked mesh itself is stored.
    pub(super) skin_index: usize,
    pub(super) slot_index: usize,
    pub(super) key: String,
    /// Skin holding the parent; `None` means the default skin.
    pub(super) parent_skin: Option<String>,
    pub(super) parent: String,
}

/// Copies parent geometry into every queued linked mesh, in queue order.
pub(super) fn resolve_linked_meshes(
    pending: Vec<PendingLinkedMesh>,
    skins: &mut [Skin],
    default_skin: Option<usize>,
) -> Result<(), Error> {
    for link in &pending {
        let parent_skin_index = match &link.parent_skin {
            None => default_skin.ok_or_else(|| Error::MissingSkin {
                name: "default".to_string(),
            })?,
            Some(name) => skins
                .iter()
                .position(|s| &s.name == name)
                .ok_or_else(|| Error::MissingSkin { name: name.clone() })?,
        };
        let parent_skin = skins.get(parent_skin_index).ok_or_else(|| Error::MissingSkin {
            name: link.parent_skin.clone().unwrap_or_else(|| "default".to_string()),
        })?;
        let parent = parent_skin
            .attachment(link.slot_index, &link.parent)
            .and_then(Attachment::as_mesh)
            .ok_or_else(|| Error::MissingParentAttachment {
                skin: parent_skin.name.clone(),
                slot_index: link.slot_index,
                name: link.parent.clone(),
            })?
            .clone();

        let mesh = skins
            .get_mut(link.skin_index)
            .and_then(|skin| skin.attachment_mut(link.slot_index, &link.key))
            .and_then(Attachment::as_mesh_mut)
            .ok_or_else(|| {
                Error::parse(format!(
                    "linked mesh '{}' (slot {}) was replaced before it could be resolved",
                    link.key, link.slot_index
                ))
            })?;
        mesh.set_parent_mesh(
            &parent,
            ParentMesh {
                skin_index: parent_skin_index,
                slot_index: link.slot_index,
                name: link.parent.clone(),
            },
        );
        mesh.update_uvs();
        tracing::trace!(
            mesh = %link.key,
            parent = %link.parent,
            parent_skin = parent_skin_index,
            "resolved linked mesh"
        );
    }
    if !pending.is_empty() {
        tracing::debug!(count = pending.len(), "resolved linked meshes");
    }
    Ok(())
}
