pub mod builder;
pub mod lua;
pub mod model;
pub mod presets;
pub mod validate;
