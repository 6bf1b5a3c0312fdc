pub mod mru;
pub mod tree;
