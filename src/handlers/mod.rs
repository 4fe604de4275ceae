pub mod resource;
pub mod root;

pub use root::{health, root};
