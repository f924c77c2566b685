//! Flutter-facing bindings for the TangSong poetry core.

pub mod api;
