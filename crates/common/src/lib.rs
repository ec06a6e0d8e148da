// autopush-common: event model and path helpers shared by the autopush crates

pub mod event;
pub mod path;
