//! # Version Command
//!
//! Prints the build information also served at `GET /version`.

use crate::server::VersionInfo;

/// The `keyserver version` command handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionCommand;

impl VersionCommand {
    /// The text printed by [`VersionCommand::run`].
    #[must_use]
    pub fn render(&self) -> String {
        let info = VersionInfo::current();
        format!(
            "keyserver {}\ncommit: {}\nbranch: {}",
            info.version, info.commit, info.branch
        )
    }

    /// Run the version command.
    pub fn run(&self) {
        println!("{}", self.render());
    }
}
