//! In-memory engine resources
//!
//! The exporter builds these through the `create_*` / `add_*` calls and hands
//! them to the serializers in `lexi-export`.

pub mod mesh;
pub mod skeleton;
