pub mod detector;
mod tokenize;

pub use detector::ShellDownloadDetector;

use crate::error::Result;
use crate::logger::DetailLogger;

/// Interpreters whose scripts the download detector understands.
const SHELL_INTERPRETERS: &[&str] = &["sh", "bash", "dash", "ksh", "mksh", "zsh"];

/// Shells accepted for workflow `run` steps. Anything else (pwsh, cmd,
/// python, ...) is skipped when building inline scripts.
const SUPPORTED_WORKFLOW_SHELLS: &[&str] = &["sh", "bash", "dash", "ksh", "mksh"];

/// Decides whether a shell script only fetches pinned content.
pub trait DownloadDetector {
    /// Returns `true` when every network fetch of executable or installable
    /// content in `script` is pinned. Offending commands are logged as
    /// warnings naming `path`.
    fn validate(&self, path: &str, script: &[u8], dl: &mut DetailLogger) -> Result<bool>;
}

/// Whether a file is a shell script, by extension or by shebang.
pub fn is_shell_script_file(path: &str, content: &[u8]) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path).to_lowercase();
    if let Some((_, ext)) = file_name.rsplit_once('.') {
        if SHELL_INTERPRETERS.contains(&ext) {
            return true;
        }
    }

    let text = String::from_utf8_lossy(content);
    let first_line = match text.lines().next() {
        Some(line) => line.trim(),
        None => return false,
    };
    let Some(shebang) = first_line.strip_prefix("#!") else {
        return false;
    };

    let mut words = shebang.split_whitespace();
    let Some(program) = words.next() else {
        return false;
    };
    let mut interpreter = base_name(program);
    if interpreter == "env" {
        // `#!/usr/bin/env -S bash -e` and friends
        match words.find(|w| !w.starts_with('-')) {
            Some(w) => interpreter = base_name(w),
            None => return false,
        }
    }
    SHELL_INTERPRETERS.contains(&interpreter)
}

/// Whether a workflow `shell:` value names a POSIX shell we can analyze.
/// Custom templates such as `bash -e {0}` are judged by their first word.
pub fn is_supported_shell(shell: &str) -> bool {
    match shell.split_whitespace().next() {
        Some(program) => SUPPORTED_WORKFLOW_SHELLS.contains(&base_name(program)),
        None => false,
    }
}

fn base_name(program: &str) -> &str {
    program.rsplit('/').next().unwrap_or(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_script_by_extension() {
        assert!(is_shell_script_file("scripts/install.sh", b""));
        assert!(is_shell_script_file("tools/BUILD.BASH", b""));
        assert!(!is_shell_script_file("Dockerfile", b"FROM scratch"));
        assert!(!is_shell_script_file("main.rs", b"fn main() {}"));
    }

    #[test]
    fn test_shell_script_by_shebang() {
        assert!(is_shell_script_file("bootstrap", b"#!/bin/bash\necho hi\n"));
        assert!(is_shell_script_file("bootstrap", b"#!/usr/bin/env sh\necho hi\n"));
        assert!(is_shell_script_file("bootstrap", b"#!/usr/bin/env -S zsh -e\n"));
        assert!(!is_shell_script_file("tool", b"#!/usr/bin/env python3\nprint(1)\n"));
        assert!(!is_shell_script_file("empty", b""));
    }

    #[test]
    fn test_supported_shells() {
        assert!(is_supported_shell("bash"));
        assert!(is_supported_shell("/bin/sh"));
        assert!(is_supported_shell("bash --noprofile --norc -eo pipefail {0}"));
        assert!(!is_supported_shell("pwsh"));
        assert!(!is_supported_shell("cmd"));
        assert!(!is_supported_shell("python"));
        assert!(!is_supported_shell(""));
    }
}
