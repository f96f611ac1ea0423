pub mod dockerfile;
pub mod github;

pub use dockerfile::{DockerInstruction, Dockerfile};
pub use github::{GitHubActionsParser, Permissions, WorkflowDocument};
