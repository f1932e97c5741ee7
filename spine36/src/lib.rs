//! Pure Rust loader for Spine 3.6 binary skeleton data (unofficial).
//!
//! The crate decodes `.skel` files into an immutable [`SkeletonData`] model: bones, slots,
//! constraints, skins with their attachments, events and animations. It does not pose or render
//! skeletons.
//!
//! ```no_run
//! let bytes = std::fs::read("spineboy.skel").unwrap();
//! let atlas: spine36::Atlas = std::fs::read_to_string("spineboy.atlas").unwrap().parse().unwrap();
//! let data = spine36::SkeletonData::from_skel_bytes_with_atlas(&bytes, &atlas, 1.0).unwrap();
//! println!("{} animations", data.animations.len());
//! ```

#![forbid(unsafe_code)]

mod animation;
mod atlas;
mod attachment;
mod color;
mod error;
mod loader;
mod model;

pub mod binary;

pub use animation::*;
pub use atlas::*;
pub use attachment::*;
pub use binary::SkeletonBinary;
pub use color::*;
pub use error::*;
pub use loader::*;
pub use model::*;

#[cfg(test)]
mod test_writer;
