pub mod icons;
pub mod stage_view;
