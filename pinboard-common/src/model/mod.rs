pub mod image;
pub mod post;
