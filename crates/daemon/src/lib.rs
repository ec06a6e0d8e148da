// autopush library: watch a working tree and push every change to its remote.

pub mod config;
pub mod git;
pub mod handler;
pub mod output;
pub mod runtime;
pub mod watcher;
