pub mod array;
pub mod bounding_box;
pub mod image_stack;
pub mod mask;
pub mod store;
pub mod volume;
