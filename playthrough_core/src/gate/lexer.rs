//! Tokenizer for gate expressions.

use super::GateError;

/// A lexical token with the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Number(f64),
    Str(String),
    True,
    False,
    And,
    Or,
    Not,
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
    Minus,
    LParen,
    RParen,
}

impl TokenKind {
    /// How the token is shown in error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Number(n) => n.to_string(),
            TokenKind::Str(s) => format!("{:?}", s),
            TokenKind::True => "true".to_string(),
            TokenKind::False => "false".to_string(),
            TokenKind::And => "and".to_string(),
            TokenKind::Or => "or".to_string(),
            TokenKind::Not => "not".to_string(),
            TokenKind::Eq => "==".to_string(),
            TokenKind::Ne => "!=".to_string(),
            TokenKind::Ge => ">=".to_string(),
            TokenKind::Le => "<=".to_string(),
            TokenKind::Gt => ">".to_string(),
            TokenKind::Lt => "<".to_string(),
            TokenKind::Minus => "-".to_string(),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
        }
    }
}

/// Split a gate source into tokens.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, GateError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(position, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = match ch {
            '(' => {
                chars.next();
                TokenKind::LParen
            }
            ')' => {
                chars.next();
                TokenKind::RParen
            }
            '-' => {
                chars.next();
                TokenKind::Minus
            }
            '=' | '!' | '>' | '<' => {
                chars.next();
                let followed_by_eq = matches!(chars.peek(), Some(&(_, '=')));
                if followed_by_eq {
                    chars.next();
                }
                match (ch, followed_by_eq) {
                    ('=', true) => TokenKind::Eq,
                    ('!', true) => TokenKind::Ne,
                    ('>', true) => TokenKind::Ge,
                    ('<', true) => TokenKind::Le,
                    ('>', false) => TokenKind::Gt,
                    ('<', false) => TokenKind::Lt,
                    _ => return Err(GateError::UnexpectedChar { ch, position }),
                }
            }
            '"' | '\'' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some((_, escaped)) => value.push(escaped),
                            None => break,
                        },
                        c if c == ch => {
                            closed = true;
                            break;
                        }
                        c => value.push(c),
                    }
                }
                if !closed {
                    return Err(GateError::UnterminatedString { position });
                }
                TokenKind::Str(value)
            }
            c if c.is_ascii_digit() => {
                let mut end = position;
                let mut seen_dot = false;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_digit() || (c == '.' && !seen_dot) {
                        seen_dot |= c == '.';
                        end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &source[position..end];
                if text.ends_with('.') {
                    return Err(GateError::InvalidNumber {
                        text: text.to_string(),
                        position,
                    });
                }
                let value = text.parse::<f64>().map_err(|_| GateError::InvalidNumber {
                    text: text.to_string(),
                    position,
                })?;
                TokenKind::Number(value)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = position;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                keyword_or_ident(&source[position..end])
            }
            ch => return Err(GateError::UnexpectedChar { ch, position }),
        };

        tokens.push(Token { kind, position });
    }

    Ok(tokens)
}

fn keyword_or_ident(word: &str) -> TokenKind {
    match word.to_ascii_lowercase().as_str() {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => TokenKind::Ident(word.to_string()),
    }
}
