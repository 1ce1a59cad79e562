pub mod sequence;
pub mod lineage;
pub mod line_items;
pub mod follow_up;
