pub mod dubbing;
pub mod project;
