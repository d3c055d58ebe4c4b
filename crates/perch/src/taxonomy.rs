mod cache;
pub mod edit;
mod node;
mod path;
mod sorting;
mod store;
mod subtree;
mod tree;

pub use cache::*;
pub use node::*;
pub use path::*;
pub use sorting::*;
pub use store::*;
pub use subtree::*;
pub use tree::*;
