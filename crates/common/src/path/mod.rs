// Path helpers for deciding which watched paths belong to the working tree.

pub mod scope;

pub use scope::{is_git_internal, is_inside_root};
