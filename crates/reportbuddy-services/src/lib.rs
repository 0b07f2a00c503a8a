pub mod email;
pub mod update;

pub use email::{
    compose_report, ComposedEmail, EmailError, EmailTemplate, MailLauncher, SystemMailLauncher,
};
pub use update::{
    compare_versions, GitHubRelease, ReleaseAsset, UpdateChecker, UpdateError, UpdateInfo,
    GITHUB_API_URL,
};
