/// First line of the block appended to shell rc files; used as the probe.
pub const PROFILE_MARKER: &str = "# >>> wslup >>>";

/// Exports for pyenv and `~/.local/bin`.
pub const PROFILE_FRAGMENT: &str = include_str!("../templates/profile.sh");
