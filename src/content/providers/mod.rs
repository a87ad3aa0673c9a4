pub mod contentful;
pub mod markdown;
pub mod microcms;
