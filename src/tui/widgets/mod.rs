pub mod notice;
pub mod popup;
pub mod world_map;
