pub mod buffer_view;
pub mod image_view;
