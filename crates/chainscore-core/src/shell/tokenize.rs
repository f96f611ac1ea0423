/// Control operators that separate commands on a shell line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operator {
    Pipe,
    And,
    Or,
    Sequence,
    Background,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Word(String),
    Op(Operator),
}

/// Commands connected by `|`, in order. Each command is its list of words
/// with quotes removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Pipeline {
    pub commands: Vec<Vec<String>>,
}

/// Join `\`-newline continuations so each logical command sits on one line.
pub(crate) fn logical_lines(script: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for line in script.lines() {
        if let Some(stripped) = line.strip_suffix('\\') {
            current.push_str(stripped);
            current.push(' ');
            continue;
        }
        current.push_str(line);
        lines.push(std::mem::take(&mut current));
    }
    if !current.trim().is_empty() {
        lines.push(current);
    }
    lines
}

/// Split one logical line into words and operators.
///
/// Quotes are removed from words. `$(...)` and backtick substitutions stay
/// inside the word they appear in. Unterminated quotes end at the end of
/// the line. A `#` at the start of a word starts a comment.
pub(crate) fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = line.chars().peekable();

    let flush = |word: &mut String, in_word: &mut bool, tokens: &mut Vec<Token>| {
        if *in_word {
            tokens.push(Token::Word(std::mem::take(word)));
            *in_word = false;
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                for q in chars.by_ref() {
                    if q == '\'' {
                        break;
                    }
                    word.push(q);
                }
            }
            '"' => {
                in_word = true;
                while let Some(q) = chars.next() {
                    match q {
                        '"' => break,
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                word.push(escaped);
                            }
                        }
                        _ => word.push(q),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(escaped) = chars.next() {
                    word.push(escaped);
                }
            }
            '$' if chars.peek() == Some(&'(') => {
                in_word = true;
                word.push(c);
                let mut depth = 0usize;
                for inner in chars.by_ref() {
                    word.push(inner);
                    match inner {
                        '(' => depth += 1,
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            }
            '`' => {
                in_word = true;
                word.push(c);
                for inner in chars.by_ref() {
                    word.push(inner);
                    if inner == '`' {
                        break;
                    }
                }
            }
            '#' if !in_word => break,
            '|' => {
                flush(&mut word, &mut in_word, &mut tokens);
                if chars.peek() == Some(&'|') {
                    chars.next();
                    tokens.push(Token::Op(Operator::Or));
                } else {
                    tokens.push(Token::Op(Operator::Pipe));
                }
            }
            '&' => {
                flush(&mut word, &mut in_word, &mut tokens);
                if chars.peek() == Some(&'&') {
                    chars.next();
                    tokens.push(Token::Op(Operator::And));
                } else if chars.peek() == Some(&'>') {
                    // `&>` redirection; keep it out of the command words
                    chars.next();
                } else {
                    tokens.push(Token::Op(Operator::Background));
                }
            }
            ';' | '(' | ')' => {
                flush(&mut word, &mut in_word, &mut tokens);
                tokens.push(Token::Op(Operator::Sequence));
            }
            c if c.is_whitespace() => flush(&mut word, &mut in_word, &mut tokens),
            _ => {
                in_word = true;
                word.push(c);
            }
        }
    }
    flush(&mut word, &mut in_word, &mut tokens);
    tokens
}

/// Group tokens into pipelines. Empty commands are dropped.
pub(crate) fn pipelines(tokens: Vec<Token>) -> Vec<Pipeline> {
    let mut result = Vec::new();
    let mut pipeline = Pipeline::default();
    let mut command: Vec<String> = Vec::new();

    for token in tokens {
        match token {
            Token::Word(w) => command.push(w),
            Token::Op(Operator::Pipe) => {
                if !command.is_empty() {
                    pipeline.commands.push(std::mem::take(&mut command));
                }
            }
            Token::Op(_) => {
                if !command.is_empty() {
                    pipeline.commands.push(std::mem::take(&mut command));
                }
                if !pipeline.commands.is_empty() {
                    result.push(std::mem::take(&mut pipeline));
                }
            }
        }
    }
    if !command.is_empty() {
        pipeline.commands.push(command);
    }
    if !pipeline.commands.is_empty() {
        result.push(pipeline);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(line: &str) -> Vec<Vec<Vec<String>>> {
        pipelines(tokenize(line))
            .into_iter()
            .map(|p| p.commands)
            .collect()
    }

    #[test]
    fn test_quotes_and_operators() {
        let parsed = words(r#"curl -sSL "https://x.io/a b" | bash && echo 'done; ok'"#);
        assert_eq!(parsed.len(), 2);
        assert_eq!(
            parsed[0],
            vec![
                vec!["curl".to_string(), "-sSL".into(), "https://x.io/a b".into()],
                vec!["bash".to_string()],
            ]
        );
        assert_eq!(parsed[1], vec![vec!["echo".to_string(), "done; ok".into()]]);
    }

    #[test]
    fn test_substitution_stays_in_word() {
        let parsed = words(r#"bash -c "$(curl -fsSL https://x.io/install.sh)""#);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0][0][2], "$(curl -fsSL https://x.io/install.sh)");
    }

    #[test]
    fn test_comment_and_or() {
        let parsed = words("make || true # fallback");
        assert_eq!(parsed, vec![vec![vec!["make".to_string()]], vec![vec!["true".to_string()]]]);
    }

    #[test]
    fn test_logical_lines_join_continuations() {
        let lines = logical_lines("apt-get update && \\\n  apt-get install -y curl\necho hi\n");
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("apt-get install"));
    }

    #[test]
    fn test_unterminated_quote_is_tolerated() {
        let parsed = words("echo 'don");
        assert_eq!(parsed, vec![vec![vec!["echo".to_string(), "don".into()]]]);
    }
}
