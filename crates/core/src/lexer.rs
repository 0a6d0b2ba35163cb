use crate::error::CompileError;

/// Reserved words. None of them can name an attribute.
pub const KEYWORDS: &[&str] = &[
    "always",
    "never",
    "permit",
    "deny",
    "when",
    "if",
    "else",
    "majority",
    "any",
    "all",
    "exclusive",
    "not",
    "and",
    "or",
    "string",
    "number",
    "request",
    "matches",
    "GET",
    "POST",
    "PUT",
    "DELETE",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifiers and keywords, told apart by the parser
    Word(String),
    /// Quoted string literal (content without quotes, escapes resolved)
    Str(String),
    /// Integer literal
    Int(i64),
    // Punctuation
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    // Comparison operators
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    // Arithmetic operators
    Plus,
    Minus,
    Star,
    Slash,
    // End of input
    Eof,
}

impl Token {
    /// Whether a term can end with this token. A `-` after such a token is
    /// subtraction rather than the sign of a literal.
    fn ends_term(&self) -> bool {
        match self {
            Token::Int(_) | Token::Str(_) | Token::RParen => true,
            Token::Word(w) => !is_keyword(w),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
    pub column: u32,
}

pub fn lex(src: &str, filename: &str) -> Result<Vec<Spanned>, CompileError> {
    let mut tokens: Vec<Spanned> = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut pos = 0usize;
    let mut line: u32 = 1;
    let mut column: u32 = 1;

    // Advance `n` characters on the current line.
    macro_rules! bump {
        ($n:expr) => {{
            pos += $n;
            column += $n as u32;
        }};
    }

    while pos < chars.len() {
        let c = chars[pos];

        // Line comment
        if c == '/' && pos + 1 < chars.len() && chars[pos + 1] == '/' {
            while pos < chars.len() && chars[pos] != '\n' {
                bump!(1);
            }
            continue;
        }

        // Block comment
        if c == '/' && pos + 1 < chars.len() && chars[pos + 1] == '*' {
            let (start_line, start_column) = (line, column);
            bump!(2);
            loop {
                if pos >= chars.len() {
                    return Err(CompileError::syntax(
                        filename,
                        start_line,
                        start_column,
                        "unterminated block comment",
                    ));
                }
                if chars[pos] == '\n' {
                    line += 1;
                    column = 1;
                    pos += 1;
                    continue;
                }
                if chars[pos] == '*' && pos + 1 < chars.len() && chars[pos + 1] == '/' {
                    bump!(2);
                    break;
                }
                bump!(1);
            }
            continue;
        }

        // Whitespace
        if c.is_whitespace() {
            if c == '\n' {
                line += 1;
                column = 1;
                pos += 1;
            } else {
                bump!(1);
            }
            continue;
        }

        let (tok_line, tok_column) = (line, column);
        let at = |token: Token| Spanned {
            token,
            line: tok_line,
            column: tok_column,
        };

        // String literal
        if c == '"' {
            bump!(1);
            let mut s = String::new();
            loop {
                if pos >= chars.len() || chars[pos] == '\n' {
                    return Err(CompileError::syntax(
                        filename,
                        tok_line,
                        tok_column,
                        "unterminated string literal",
                    ));
                }
                let sc = chars[pos];
                if sc == '"' {
                    bump!(1);
                    break;
                }
                if sc == '\\' {
                    bump!(1);
                    if pos >= chars.len() {
                        return Err(CompileError::syntax(
                            filename,
                            tok_line,
                            tok_column,
                            "unterminated escape in string",
                        ));
                    }
                    match chars[pos] {
                        '"' => s.push('"'),
                        '\\' => s.push('\\'),
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        other => {
                            s.push('\\');
                            s.push(other);
                        }
                    }
                    bump!(1);
                    continue;
                }
                s.push(sc);
                bump!(1);
            }
            tokens.push(at(Token::Str(s)));
            continue;
        }

        // Number
        let after_term = tokens.last().is_some_and(|t| t.token.ends_term());
        let signed = c == '-'
            && !after_term
            && pos + 1 < chars.len()
            && chars[pos + 1].is_ascii_digit();
        if c.is_ascii_digit() || signed {
            let start = pos;
            if signed {
                bump!(1);
            }
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                bump!(1);
            }
            let s: String = chars[start..pos].iter().collect();
            let n: i64 = s.parse().map_err(|_| {
                CompileError::syntax(
                    filename,
                    tok_line,
                    tok_column,
                    format!("integer literal '{}' out of range", s),
                )
            })?;
            tokens.push(at(Token::Int(n)));
            continue;
        }

        // Operators and punctuation
        let next = chars.get(pos + 1).copied();
        let (token, width) = match (c, next) {
            ('!', Some('=')) => (Token::Neq, 2),
            ('<', Some('=')) => (Token::Lte, 2),
            ('>', Some('=')) => (Token::Gte, 2),
            ('=', _) => (Token::Eq, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('{', _) => (Token::LBrace, 1),
            ('}', _) => (Token::RBrace, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            (',', _) => (Token::Comma, 1),
            _ => (Token::Eof, 0),
        };
        if width > 0 {
            tokens.push(at(token));
            bump!(width);
            continue;
        }

        // Identifier / keyword
        if c.is_ascii_alphabetic() {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                bump!(1);
            }
            let word: String = chars[start..pos].iter().collect();
            tokens.push(at(Token::Word(word)));
            continue;
        }

        return Err(CompileError::syntax(
            filename,
            tok_line,
            tok_column,
            format!("unexpected character '{}'", c),
        ));
    }

    tokens.push(Spanned {
        token: Token::Eof,
        line,
        column,
    });
    Ok(tokens)
}
