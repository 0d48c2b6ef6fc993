pub mod posts;
pub mod upload;
