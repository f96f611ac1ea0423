use super::tokenize::{logical_lines, pipelines, tokenize, Pipeline};
use super::DownloadDetector;
use crate::error::Result;
use crate::logger::DetailLogger;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static GO_PINNED_PACKAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[a-f0-9]{40}$").unwrap());

static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?i)(https?|ftp)://").unwrap());

const FETCHERS: &[&str] = &["curl", "wget"];

const INTERPRETERS: &[&str] = &[
    "sh", "bash", "dash", "ksh", "mksh", "zsh", "python", "python2", "python3", "perl", "ruby",
    "node",
];

const CHECKSUM_TOOLS: &[&str] = &["sha256sum", "sha512sum", "sha1sum", "shasum", "gpg"];

/// Words stripped from the front of a command before classifying it.
const WRAPPERS: &[&str] = &["sudo", "env", "exec", "time", "nohup", "command"];

/// Built-in detector for unpinned downloads in shell text.
///
/// Flags piping a fetch into an interpreter, running a fetched file that
/// was never checksummed, `pip install` without `--require-hashes`, and
/// `go get`/`go install` without a commit hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellDownloadDetector;

impl DownloadDetector for ShellDownloadDetector {
    fn validate(&self, path: &str, script: &[u8], dl: &mut DetailLogger) -> Result<bool> {
        let text = String::from_utf8_lossy(script);
        let mut state = ScriptState::default();
        let mut pinned = true;

        for line in logical_lines(&text) {
            for pipeline in pipelines(tokenize(&line)) {
                if let Some(reason) = state.classify(&pipeline) {
                    pinned = false;
                    dl.warn(format!(
                        "insecure (unpinned) dependency downloaded in {}: '{}' ({})",
                        path,
                        render(&pipeline),
                        reason
                    ));
                }
            }
        }

        Ok(pinned)
    }
}

/// Files fetched earlier in the script, and which of them were verified.
#[derive(Debug, Default)]
struct ScriptState {
    downloaded: HashSet<String>,
    verified: HashSet<String>,
}

impl ScriptState {
    fn classify(&mut self, pipeline: &Pipeline) -> Option<&'static str> {
        let commands: Vec<&[String]> = pipeline
            .commands
            .iter()
            .map(|c| strip_wrappers(c))
            .collect();

        if is_fetch_piped_to_interpreter(&commands) {
            return Some("remote content piped into an interpreter");
        }

        for command in &commands {
            let Some(program) = command.first().map(|p| base_name(p)) else {
                continue;
            };

            if FETCHERS.contains(&program) {
                self.record_download(command);
                continue;
            }

            if CHECKSUM_TOOLS.contains(&program) {
                for arg in &command[1..] {
                    self.verified.insert(base_name(arg).to_string());
                }
                continue;
            }

            if INTERPRETERS.contains(&program) && runs_fetched_substitution(command) {
                return Some("remote content executed through a command substitution");
            }

            if self.executes_unverified_download(command) {
                return Some("downloaded file executed without verification");
            }

            if is_unpinned_pip_install(command) {
                return Some("pip install without --require-hashes");
            }

            if is_unpinned_go_download(command) {
                return Some("go package not pinned to a commit hash");
            }
        }

        None
    }

    fn record_download(&mut self, command: &[String]) {
        let is_wget = base_name(&command[0]) == "wget";
        let mut output: Option<String> = None;
        let mut url_name: Option<String> = None;
        let mut remote_name = false;

        let mut args = command[1..].iter();
        while let Some(arg) = args.next() {
            if URL.is_match(arg) {
                let trimmed = arg.split(['?', '#']).next().unwrap_or(arg.as_str());
                url_name = trimmed
                    .rsplit('/')
                    .next()
                    .filter(|n| !n.is_empty())
                    .map(String::from);
                continue;
            }
            if let Some(value) = arg
                .strip_prefix("--output-document=")
                .or_else(|| arg.strip_prefix("--output="))
            {
                output = Some(value.to_string());
                continue;
            }
            match arg.as_str() {
                "--output" | "--output-document" => output = args.next().cloned(),
                "--remote-name" => remote_name = true,
                a if a.starts_with('-') && !a.starts_with("--") => {
                    // Short option clusters such as `-sSLo FILE`, `-qO-` or `-sSLO`
                    let flags = &a[1..];
                    let output_flag = if is_wget { 'O' } else { 'o' };
                    if let Some(at) = flags.find(output_flag) {
                        let rest = &flags[at + 1..];
                        output = if rest.is_empty() {
                            args.next().cloned()
                        } else {
                            Some(rest.to_string())
                        };
                    } else if !is_wget && flags.contains('O') {
                        remote_name = true;
                    } else if is_wget && flags.ends_with('o') {
                        // wget's `-o` names a log file
                        args.next();
                    }
                }
                _ => {}
            }
        }

        let target = match output {
            Some(o) if o != "-" => Some(o),
            Some(_) => None,
            None if remote_name || is_wget => url_name,
            None => None,
        };
        if let Some(target) = target {
            self.downloaded.insert(base_name(&target).to_string());
        }
    }

    fn executes_unverified_download(&self, command: &[String]) -> bool {
        let program = &command[0];
        let executed = if INTERPRETERS.contains(&base_name(program)) {
            command[1..].iter().find(|a| !a.starts_with('-'))
        } else if program.contains('/') {
            Some(program)
        } else {
            None
        };

        match executed {
            Some(file) => {
                let name = base_name(file);
                self.downloaded.contains(name) && !self.verified.contains(name)
            }
            None => false,
        }
    }
}

fn is_fetch_piped_to_interpreter(commands: &[&[String]]) -> bool {
    let Some(fetch_at) = commands.iter().position(|c| {
        c.first()
            .map(|p| FETCHERS.contains(&base_name(p)))
            .unwrap_or(false)
    }) else {
        return false;
    };

    commands[fetch_at + 1..].iter().any(|c| {
        c.first()
            .map(|p| INTERPRETERS.contains(&base_name(p)))
            .unwrap_or(false)
    })
}

fn runs_fetched_substitution(command: &[String]) -> bool {
    let Some(flag) = command.iter().position(|a| a == "-c") else {
        return false;
    };
    command[flag + 1..].iter().any(|arg| {
        FETCHERS
            .iter()
            .any(|f| arg.contains(&format!("$({f} ")) || arg.contains(&format!("`{f} ")))
    })
}

fn is_unpinned_pip_install(command: &[String]) -> bool {
    let program = base_name(&command[0]);
    let args: &[String] = if program == "pip" || program == "pip3" {
        &command[1..]
    } else if program.starts_with("python") && command.len() > 2 && command[1] == "-m" {
        if command[2] != "pip" {
            return false;
        }
        &command[3..]
    } else {
        return false;
    };

    if args.first().map(String::as_str) != Some("install") {
        return false;
    }
    if args.iter().any(|a| a == "--require-hashes") {
        return false;
    }

    // Local sources (`pip install .`, `pip install ./dist/pkg.whl`) are pinned
    // by the checkout itself.
    let mut installs_remote = false;
    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-r" | "--requirement" | "-c" | "--constraint" => {
                iter.next();
                installs_remote = true;
            }
            "-e" | "--editable" => {
                if let Some(target) = iter.next() {
                    installs_remote |= !is_local_path(target);
                }
            }
            a if a.starts_with('-') => {}
            a => installs_remote |= !is_local_path(a),
        }
    }
    installs_remote
}

fn is_unpinned_go_download(command: &[String]) -> bool {
    if base_name(&command[0]) != "go" || command.len() < 2 {
        return false;
    }
    if command[1] != "get" && command[1] != "install" {
        return false;
    }

    command[2..]
        .iter()
        .filter(|a| !a.starts_with('-'))
        .filter(|a| !is_local_path(a))
        .any(|pkg| !GO_PINNED_PACKAGE.is_match(pkg))
}

fn is_local_path(arg: &str) -> bool {
    arg == "." || arg.starts_with("./") || arg.starts_with("../") || arg.starts_with('/')
}

fn strip_wrappers(command: &[String]) -> &[String] {
    let mut start = 0;
    while start < command.len() {
        let word = &command[start];
        let is_assignment = word
            .split_once('=')
            .map(|(name, _)| !name.is_empty() && !name.starts_with('-'))
            .unwrap_or(false);
        let is_wrapper_flag = start > 0
            && word.starts_with('-')
            && WRAPPERS.contains(&command[start - 1].as_str());
        if WRAPPERS.contains(&word.as_str()) || is_assignment || is_wrapper_flag {
            start += 1;
        } else {
            break;
        }
    }
    &command[start..]
}

fn base_name(word: &str) -> &str {
    word.rsplit('/').next().unwrap_or(word)
}

fn render(pipeline: &Pipeline) -> String {
    pipeline
        .commands
        .iter()
        .map(|c| c.join(" "))
        .collect::<Vec<_>>()
        .join(" | ")
}
