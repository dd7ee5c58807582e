//! Lexer: splits template text into literal text and action tokens
//!
//! Text outside `{{ }}` is kept verbatim. `{{- ` and ` -}}` trim the
//! whitespace of the neighbouring text, and `{{/* */}}` comments are dropped.

use crate::error::{Result, TemplateError};

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";

/// A token inside an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// `.name`
    Field(String),
    /// `$name`
    Variable(String),
    /// Function name or keyword
    Ident(String),
    Str(String),
    Number(String),
    Bool(bool),
    /// `:=`
    Declare,
    /// `=`
    Assign,
    Pipe,
    Comma,
    LParen,
    RParen,
}

/// Literal text or a tokenized action
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Item {
    Text(String),
    Action { tokens: Vec<Token>, line: usize },
}

/// Split template text into items
pub(crate) fn lex(template: &str, input: &str) -> Result<Vec<Item>> {
    let mut items = Vec::new();
    let mut pos = 0;
    let mut line = 1;
    let mut trim_next = false;

    while pos < input.len() {
        let rest = &input[pos..];
        let Some(open) = rest.find(LEFT_DELIM) else {
            push_text(&mut items, rest, trim_next, false);
            break;
        };

        let start = pos + open;
        let mut inner_start = start + LEFT_DELIM.len();
        let trim_prev = has_trim_marker(&input[inner_start..]);
        if trim_prev {
            inner_start += 1;
        }

        push_text(&mut items, &input[pos..start], trim_next, trim_prev);
        line += input[pos..start].matches('\n').count();
        let action_line = line;

        let close = find_close(&input[inner_start..])
            .map(|offset| inner_start + offset)
            .ok_or_else(|| TemplateError::parse(template, action_line, "unclosed action"))?;

        let mut inner = &input[inner_start..close];
        trim_next = false;
        if let Some(stripped) = inner.strip_suffix('-') {
            if stripped.ends_with(char::is_whitespace) {
                inner = stripped;
                trim_next = true;
            }
        }

        line += inner.matches('\n').count();
        pos = close + RIGHT_DELIM.len();

        let trimmed = inner.trim();
        if trimmed.starts_with("/*") {
            if !trimmed.ends_with("*/") {
                return Err(TemplateError::parse(template, action_line, "unclosed comment"));
            }
            continue;
        }

        let tokens = tokenize(template, action_line, inner)?;
        if tokens.is_empty() {
            return Err(TemplateError::parse(template, action_line, "missing value for command"));
        }
        items.push(Item::Action {
            tokens,
            line: action_line,
        });
    }

    Ok(items)
}

fn push_text(items: &mut Vec<Item>, text: &str, trim_start: bool, trim_end: bool) {
    let mut text = text;
    if trim_start {
        text = text.trim_start();
    }
    if trim_end {
        text = text.trim_end();
    }
    if !text.is_empty() {
        items.push(Item::Text(text.to_string()));
    }
}

/// `{{- ` trims only when the dash is followed by whitespace
fn has_trim_marker(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('-') && chars.next().is_some_and(char::is_whitespace)
}

/// Offset of the closing delimiter, skipping quoted strings
fn find_close(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' && q == '"' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => {
                if c == '"' || c == '`' {
                    quote = Some(c);
                } else if s[i..].starts_with(RIGHT_DELIM) {
                    return Some(i);
                }
            }
        }
    }

    None
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn tokenize(template: &str, line: usize, inner: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = inner.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let read_ident = |start: usize| -> (String, usize) {
        let mut end = start;
        while end < chars.len() && is_ident_char(chars[end]) {
            end += 1;
        }
        (chars[start..end].iter().collect(), end)
    };

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '|' => {
                tokens.push(Token::Pipe);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ':' => {
                if chars.get(i + 1) != Some(&'=') {
                    return Err(TemplateError::parse(template, line, "expected := after ':'"));
                }
                tokens.push(Token::Declare);
                i += 2;
            }
            '=' => {
                tokens.push(Token::Assign);
                i += 1;
            }
            '"' => {
                let mut value = String::new();
                i += 1;
                loop {
                    let Some(&ch) = chars.get(i) else {
                        return Err(TemplateError::parse(template, line, "unterminated quoted string"));
                    };
                    i += 1;
                    match ch {
                        '"' => break,
                        '\\' => {
                            let Some(&esc) = chars.get(i) else {
                                return Err(TemplateError::parse(template, line, "unterminated quoted string"));
                            };
                            i += 1;
                            value.push(match esc {
                                'n' => '\n',
                                't' => '\t',
                                'r' => '\r',
                                '\\' => '\\',
                                '"' => '"',
                                other => {
                                    return Err(TemplateError::parse(
                                        template,
                                        line,
                                        format!("unknown escape sequence \\{}", other),
                                    ))
                                }
                            });
                        }
                        other => value.push(other),
                    }
                }
                tokens.push(Token::Str(value));
            }
            '`' => {
                let start = i + 1;
                let Some(len) = chars[start..].iter().position(|&ch| ch == '`') else {
                    return Err(TemplateError::parse(template, line, "unterminated raw string"));
                };
                tokens.push(Token::Str(chars[start..start + len].iter().collect()));
                i = start + len + 1;
            }
            '.' => {
                let (name, end) = read_ident(i + 1);
                if name.is_empty() {
                    return Err(TemplateError::parse(
                        template,
                        line,
                        "bare '.' is not supported; reference a variable as .name",
                    ));
                }
                if chars.get(end) == Some(&'.') {
                    return Err(TemplateError::parse(
                        template,
                        line,
                        format!("nested field .{}.… is not supported; variables are flat", name),
                    ));
                }
                tokens.push(Token::Field(name));
                i = end;
            }
            '$' => {
                let (name, end) = read_ident(i + 1);
                if name.is_empty() {
                    return Err(TemplateError::parse(template, line, "bare '$' is not supported"));
                }
                tokens.push(Token::Variable(name));
                i = end;
            }
            c if c.is_ascii_digit()
                || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                tokens.push(Token::Number(chars[start..i].iter().collect()));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let (word, end) = read_ident(i);
                tokens.push(match word.as_str() {
                    "true" => Token::Bool(true),
                    "false" => Token::Bool(false),
                    _ => Token::Ident(word),
                });
                i = end;
            }
            other => {
                return Err(TemplateError::parse(
                    template,
                    line,
                    format!("unexpected character {:?} in action", other),
                ));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(tokens: Vec<Token>, line: usize) -> Item {
        Item::Action { tokens, line }
    }

    #[test]
    fn test_lex_plain_text() {
        let items = lex("t", "hello: world\n").unwrap();
        assert_eq!(items, vec![Item::Text("hello: world\n".into())]);
    }

    #[test]
    fn test_lex_field_action() {
        let items = lex("t", "name: {{ .id }}").unwrap();
        assert_eq!(
            items,
            vec![
                Item::Text("name: ".into()),
                action(vec![Token::Field("id".into())], 1),
            ]
        );
    }

    #[test]
    fn test_lex_declare_and_call() {
        let items = lex("t", r#"{{ $c := split .test "," }}"#).unwrap();
        assert_eq!(
            items,
            vec![action(
                vec![
                    Token::Variable("c".into()),
                    Token::Declare,
                    Token::Ident("split".into()),
                    Token::Field("test".into()),
                    Token::Str(",".into()),
                ],
                1
            )]
        );
    }

    #[test]
    fn test_lex_trim_markers() {
        let items = lex("t", "a  \n{{- .x -}}\n  b").unwrap();
        assert_eq!(
            items,
            vec![
                Item::Text("a".into()),
                action(vec![Token::Field("x".into())], 2),
                Item::Text("b".into()),
            ]
        );
    }

    #[test]
    fn test_lex_negative_number_is_not_trim() {
        let items = lex("t", "{{-1}}").unwrap();
        assert_eq!(items, vec![action(vec![Token::Number("-1".into())], 1)]);
    }

    #[test]
    fn test_lex_comment_dropped() {
        let items = lex("t", "a{{/* note */}}b").unwrap();
        assert_eq!(items, vec![Item::Text("a".into()), Item::Text("b".into())]);
    }

    #[test]
    fn test_lex_delimiter_inside_string() {
        let items = lex("t", r#"{{ quote "}}" }}"#).unwrap();
        assert_eq!(
            items,
            vec![action(
                vec![Token::Ident("quote".into()), Token::Str("}}".into())],
                1
            )]
        );
    }

    #[test]
    fn test_lex_tracks_lines() {
        let items = lex("t", "a\nb\n{{ .x }}").unwrap();
        assert!(matches!(items[1], Item::Action { line: 3, .. }));
    }

    #[test]
    fn test_lex_errors() {
        assert!(lex("t", "{{ .x ").is_err());
        assert!(lex("t", "{{ \"open }}").is_err());
        assert!(lex("t", "{{ . }}").is_err());
        assert!(lex("t", "{{ .a.b }}").is_err());
        assert!(lex("t", "{{ }}").is_err());
        assert!(lex("t", "{{ # }}").is_err());
    }
}
