use crate::error::{CheckError, Result};
use regex::Regex;
use std::sync::LazyLock;

static HEREDOC_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^<<(-?)\s*["']?([A-Za-z_][A-Za-z0-9_]*)["']?"#).unwrap());

static ESCAPE_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#\s*(?i:escape)\s*=\s*(\S)\s*$").unwrap());

/// Instructions whose body is a command line: JSON exec form or shell form.
const COMMAND_INSTRUCTIONS: &[&str] = &["run", "cmd", "entrypoint", "shell"];

/// Instructions that may carry heredoc bodies.
const HEREDOC_INSTRUCTIONS: &[&str] = &["run", "copy", "add"];

/// A parsed Dockerfile instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerInstruction {
    /// Lower-cased keyword (`from`, `run`, ...).
    pub command: String,
    /// Leading `--flag[=value]` words such as `--platform=linux/amd64`.
    pub flags: Vec<String>,
    /// Argument tokens. Shell-form commands are one token; exec-form
    /// commands are one token per JSON array element.
    pub args: Vec<String>,
    pub line_number: usize,
}

/// An ordered list of Dockerfile instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dockerfile {
    pub instructions: Vec<DockerInstruction>,
}

impl Dockerfile {
    /// Parse Dockerfile content. Comments, blank lines and line
    /// continuations are handled the way BuildKit handles them, including
    /// the `# escape=` parser directive and heredoc bodies.
    pub fn parse(content: &str, path: &str) -> Result<Self> {
        let mut instructions = Vec::new();
        let mut escape = '\\';
        let mut directives_allowed = true;
        let mut continuation = String::new();
        let mut line_start = 0;
        let mut lines = content.lines().enumerate();

        while let Some((i, line)) = lines.next() {
            let trimmed = line.trim();

            if directives_allowed {
                if let Some(caps) = ESCAPE_DIRECTIVE.captures(trimmed) {
                    if let Some(c) = caps[1].chars().next() {
                        if c == '`' || c == '\\' {
                            escape = c;
                        }
                    }
                    continue;
                }
            }

            // Skip comments and empty lines, also inside continuations
            if trimmed.starts_with('#') || trimmed.is_empty() {
                continue;
            }
            directives_allowed = false;

            if continuation.is_empty() {
                line_start = i + 1;
            }

            if let Some(stripped) = trimmed.strip_suffix(escape) {
                continuation.push_str(stripped);
                continuation.push(' ');
                continue;
            }

            let full_line = if continuation.is_empty() {
                trimmed.to_string()
            } else {
                continuation.push_str(trimmed);
                std::mem::take(&mut continuation)
            };

            let (keyword, flags, mut rest) = split_instruction(&full_line);

            if HEREDOC_INSTRUCTIONS.contains(&keyword.as_str()) {
                for (strip_tabs, delimiter) in heredoc_markers(&rest) {
                    let mut body = Vec::new();
                    let mut terminated = false;
                    for (_, body_line) in lines.by_ref() {
                        let candidate = if strip_tabs {
                            body_line.trim_start_matches('\t')
                        } else {
                            body_line
                        };
                        if candidate.trim_end() == delimiter {
                            terminated = true;
                            break;
                        }
                        body.push(candidate.to_string());
                    }
                    if !terminated {
                        return Err(CheckError::invalid_dockerfile(
                            path,
                            format!(
                                "unterminated heredoc '{}' starting at line {}",
                                delimiter, line_start
                            ),
                        ));
                    }
                    rest.push('\n');
                    rest.push_str(&body.join("\n"));
                }
            }

            instructions.push(build_instruction(keyword, flags, &rest, line_start));
        }

        // A trailing continuation at end of file still forms an instruction
        if !continuation.trim().is_empty() {
            let (keyword, flags, rest) = split_instruction(continuation.trim());
            instructions.push(build_instruction(keyword, flags, &rest, line_start));
        }

        Ok(Self { instructions })
    }

    /// Instructions with the given lower-case keyword, in file order.
    pub fn instructions_of<'a>(
        &'a self,
        command: &'a str,
    ) -> impl Iterator<Item = &'a DockerInstruction> + 'a {
        self.instructions.iter().filter(move |i| i.command == command)
    }
}

/// Split a logical line into its lower-cased keyword, leading flags and body.
fn split_instruction(line: &str) -> (String, Vec<String>, String) {
    let (keyword, rest) = match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword.to_lowercase(), rest.trim()),
        None => (line.to_lowercase(), ""),
    };
    let (flags, rest) = split_flags(rest);
    (keyword, flags, rest)
}

fn build_instruction(
    command: String,
    flags: Vec<String>,
    rest: &str,
    line_number: usize,
) -> DockerInstruction {
    let args = if COMMAND_INSTRUCTIONS.contains(&command.as_str()) {
        command_args(rest)
    } else {
        rest.split_whitespace().map(String::from).collect()
    };
    DockerInstruction {
        command,
        flags,
        args,
        line_number,
    }
}

/// Heredoc delimiters opened on an instruction line, with whether `<<-`
/// tab stripping applies.
///
/// Only unquoted `<<` outside `$(...)` and `((...))` opens a heredoc, so
/// quoted text and shell arithmetic shifts are left alone. Here-strings
/// (`<<<`) are not heredocs.
fn heredoc_markers(rest: &str) -> Vec<(bool, String)> {
    let bytes = rest.as_bytes();
    let mut markers = Vec::new();
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            } else if q == b'"' && b == b'\\' {
                i += 1;
            }
            i += 1;
            continue;
        }
        match b {
            b'\\' => i += 1,
            b'\'' | b'"' => quote = Some(b),
            b'$' if bytes.get(i + 1) == Some(&b'(') => {
                depth += 1;
                i += 1;
            }
            b'(' if depth > 0 || bytes.get(i + 1) == Some(&b'(') => depth += 1,
            b')' if depth > 0 => depth -= 1,
            b'<' if depth == 0 && bytes.get(i + 1) == Some(&b'<') => {
                if bytes.get(i + 2) == Some(&b'<') {
                    i += 3;
                    continue;
                }
                if let Some(caps) = HEREDOC_MARKER.captures(&rest[i..]) {
                    markers.push((!caps[1].is_empty(), caps[2].to_string()));
                    i += caps[0].len();
                    continue;
                }
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    markers
}

/// Split leading `--flag` words off an instruction body.
fn split_flags(rest: &str) -> (Vec<String>, String) {
    let mut flags = Vec::new();
    let mut remaining = rest.trim_start();
    while remaining.starts_with("--") {
        let end = remaining.find(char::is_whitespace).unwrap_or(remaining.len());
        flags.push(remaining[..end].to_string());
        remaining = remaining[end..].trim_start();
    }
    (flags, remaining.to_string())
}

/// Exec form (`["a", "b"]`) yields one token per element; anything else is
/// shell form and yields the whole body as a single token.
fn command_args(rest: &str) -> Vec<String> {
    if rest.is_empty() {
        return Vec::new();
    }
    if rest.starts_with('[') {
        if let Ok(parts) = serde_json::from_str::<Vec<String>>(rest) {
            return parts;
        }
    }
    vec![rest.to_string()]
}
