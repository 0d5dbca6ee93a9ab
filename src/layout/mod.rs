pub mod sectioned;

pub use sectioned::*;
