/// Indented dumps of the syntax tree.
pub mod tree;
