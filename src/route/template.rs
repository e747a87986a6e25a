use crate::fault::ConfigurationError;

/// One lexical element of a URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Placeholder { name: String, greedy: bool },
    Wildcard,
}

/// Split a URL template into literals, placeholders and wildcards.
pub fn tokenize(template: &str) -> Result<Vec<Token>, ConfigurationError> {
    let malformed = |reason: String| ConfigurationError::MalformedTemplate {
        template: template.to_string(),
        reason,
    };

    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices();

    while let Some((at, c)) = chars.next() {
        match c {
            '{' => {
                flush(&mut literal, &mut tokens);
                let mut inner = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    match c {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => return Err(malformed(format!("nested '{{' at offset {at}"))),
                        c => inner.push(c),
                    }
                }
                if !closed {
                    return Err(malformed(format!("unterminated placeholder at offset {at}")));
                }
                let (greedy, name) = match inner.strip_prefix('*') {
                    Some(rest) => (true, rest.trim()),
                    None => (false, inner.trim()),
                };
                if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                    return Err(malformed(format!("invalid placeholder name '{inner}'")));
                }
                tokens.push(Token::Placeholder {
                    name: name.to_string(),
                    greedy,
                });
            }
            '}' => return Err(malformed(format!("unbalanced '}}' at offset {at}"))),
            '*' => {
                flush(&mut literal, &mut tokens);
                tokens.push(Token::Wildcard);
            }
            c => literal.push(c),
        }
    }
    flush(&mut literal, &mut tokens);
    Ok(tokens)
}

fn flush(literal: &mut String, tokens: &mut Vec<Token>) {
    if !literal.is_empty() {
        tokens.push(Token::Literal(std::mem::take(literal)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholder(name: &str, greedy: bool) -> Token {
        Token::Placeholder {
            name: name.to_string(),
            greedy,
        }
    }

    #[test]
    fn splits_literals_and_placeholders() {
        assert_eq!(
            tokenize("/add/{a}/{b}").unwrap(),
            vec![
                Token::Literal("/add/".into()),
                placeholder("a", false),
                Token::Literal("/".into()),
                placeholder("b", false),
            ]
        );
    }

    #[test]
    fn greedy_and_wildcard() {
        assert_eq!(
            tokenize("/files/{*path}").unwrap(),
            vec![Token::Literal("/files/".into()), placeholder("path", true)]
        );
        assert_eq!(
            tokenize("/somewhere/*").unwrap(),
            vec![Token::Literal("/somewhere/".into()), Token::Wildcard]
        );
    }

    #[test]
    fn rejects_malformed() {
        for template in ["/a/{b", "/a/b}", "/a/{}", "/a/{{b}}", "/a/{b c}", "/a/{*}"] {
            assert!(
                matches!(tokenize(template), Err(ConfigurationError::MalformedTemplate { .. })),
                "{template}"
            );
        }
    }
}
