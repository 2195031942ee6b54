pub mod deploy;
pub mod project;
pub mod render;
pub mod rollout;
