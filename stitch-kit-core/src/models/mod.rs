mod fabric;
mod pattern;
mod project;

pub use fabric::Fabric;
pub use pattern::Pattern;
pub use project::{Project, ProjectStatus};
