use std::fmt;

/// Tokens produced by the indentation-sensitive lexer.
///
/// Two tokens are equal when they are the same case and, for value-bearing
/// cases, carry the same payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Number(i32),
    Id(String),
    String(String),
    Char(u8),

    // Reserved words
    Class,
    Return,
    If,
    Else,
    Def,
    Print,
    And,
    Or,
    Not,
    None,
    True,
    False,

    // Compound operators
    Eq,          // ==
    NotEq,       // !=
    LessOrEq,    // <=
    GreaterOrEq, // >=

    // Structural
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(value) => write!(f, "Number{{{value}}}"),
            Token::Id(name) => write!(f, "Id{{{name}}}"),
            Token::String(value) => write!(f, "String{{{value}}}"),
            Token::Char(ch) => write!(f, "Char{{{}}}", char::from(*ch)),
            marker => {
                let name = match marker {
                    Token::Class => "Class",
                    Token::Return => "Return",
                    Token::If => "If",
                    Token::Else => "Else",
                    Token::Def => "Def",
                    Token::Print => "Print",
                    Token::And => "And",
                    Token::Or => "Or",
                    Token::Not => "Not",
                    Token::None => "None",
                    Token::True => "True",
                    Token::False => "False",
                    Token::Eq => "Eq",
                    Token::NotEq => "NotEq",
                    Token::LessOrEq => "LessOrEq",
                    Token::GreaterOrEq => "GreaterOrEq",
                    Token::Newline => "Newline",
                    Token::Indent => "Indent",
                    Token::Dedent => "Dedent",
                    _ => "Eof",
                };
                f.write_str(name)
            }
        }
    }
}
