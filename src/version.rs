//! Build metadata for `vexillum version`.

pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const GIT_BRANCH: &str = match option_env!("VERGEN_GIT_BRANCH") {
    Some(branch) => branch,
    None => "unknown",
};

pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

fn git_dirty() -> bool {
    option_env!("VERGEN_GIT_DIRTY") == Some("true")
}

/// `{version}+{branch}.{sha}`, with a `.dirty` suffix for modified trees.
pub fn version_string() -> String {
    let sha = &GIT_SHA[..7.min(GIT_SHA.len())];
    if git_dirty() {
        format!("{PKG_VERSION}+{GIT_BRANCH}.{sha}.dirty")
    } else {
        format!("{PKG_VERSION}+{GIT_BRANCH}.{sha}")
    }
}
