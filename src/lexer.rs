//! Indentation-sensitive lexer.
//!
//! Source text is consumed line by line. A physical line is extended across a
//! newline while a string literal is open, blank and comment-only lines are
//! skipped outright, and the 2-space indentation prefix of every remaining
//! line is translated into `Indent`/`Dedent` markers ahead of its content
//! tokens. Each lexed line ends with a single `Newline`; reaching the end of
//! the stream unwinds the indentation with `Dedent`s and then yields `Eof`
//! forever.

use std::collections::VecDeque;
use std::io::Read;

pub mod error;
pub mod token;

pub use error::{LexError, LexResult};
pub use token::Token;

const INDENT_WIDTH: usize = 2;

fn is_operator_char(byte: u8) -> bool {
    matches!(
        byte,
        b',' | b'.'
            | b'\''
            | b'"'
            | b'+'
            | b'-'
            | b'*'
            | b'/'
            | b'('
            | b')'
            | b':'
            | b'<'
            | b'>'
            | b'!'
            | b'='
    )
}

fn is_printable(byte: u8) -> bool {
    (0x20..=0x7e).contains(&byte)
}

fn keyword(word: &str) -> Option<Token> {
    let token = match word {
        "class" => Token::Class,
        "return" => Token::Return,
        "if" => Token::If,
        "else" => Token::Else,
        "def" => Token::Def,
        "print" => Token::Print,
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "None" => Token::None,
        "True" => Token::True,
        "False" => Token::False,
        _ => return None,
    };
    Some(token)
}

/// Cursor over the token stream of a Mython source.
///
/// `current` peeks at the token under the cursor; `advance` consumes it and
/// returns the next one. Both are idempotent once `Eof` is reached.
pub struct Lexer<R> {
    source: std::io::Bytes<R>,
    pending: VecDeque<Token>,
    current: Token,
    indent: usize,
    line: usize,
    exhausted: bool,
}

impl<R: Read> Lexer<R> {
    pub fn new(source: R) -> LexResult<Self> {
        let mut lexer = Self {
            source: source.bytes(),
            pending: VecDeque::new(),
            current: Token::Eof,
            indent: 0,
            line: 0,
            exhausted: false,
        };
        lexer.refill()?;
        lexer.current = lexer.pending.pop_front().unwrap_or(Token::Eof);
        Ok(lexer)
    }

    pub fn current(&self) -> &Token {
        &self.current
    }

    pub fn advance(&mut self) -> LexResult<Token> {
        if self.current == Token::Eof {
            return Ok(Token::Eof);
        }
        if self.pending.is_empty() {
            self.refill()?;
        }
        self.current = self.pending.pop_front().unwrap_or(Token::Eof);
        Ok(self.current.clone())
    }

    /// Lexes logical lines until at least one token is buffered.
    fn refill(&mut self) -> LexResult<()> {
        loop {
            if self.exhausted {
                while self.indent > 0 {
                    self.indent -= 1;
                    self.pending.push_back(Token::Dedent);
                }
                self.pending.push_back(Token::Eof);
                return Ok(());
            }

            let Some(line) = self.assemble_line()? else {
                self.exhausted = true;
                continue;
            };
            self.line += 1;

            let width = line.len() - line.trim_start_matches(' ').len();
            if width == line.len() {
                // Blank lines neither emit tokens nor touch indentation.
                continue;
            }
            if line.as_bytes()[width] == b'#' {
                continue;
            }

            if width % INDENT_WIDTH != 0 {
                return Err(LexError::UnevenIndent {
                    width,
                    line: self.line,
                });
            }
            let level = width / INDENT_WIDTH;
            while self.indent < level {
                self.indent += 1;
                self.pending.push_back(Token::Indent);
            }
            while self.indent > level {
                self.indent -= 1;
                self.pending.push_back(Token::Dedent);
            }

            self.tokenize_content(&line[width..])?;
            self.pending.push_back(Token::Newline);
            return Ok(());
        }
    }

    /// Reads one logical line from the stream.
    ///
    /// A newline inside an open string literal is part of the line rather
    /// than its end, and a string still open at stream end is force-closed by
    /// synthesizing the matching quote. Non-printable bytes outside
    /// `\n`/`\r`/`\t` are dropped. Returns `None` once the stream is
    /// exhausted.
    fn assemble_line(&mut self) -> LexResult<Option<String>> {
        let mut line = String::new();
        let mut quote: Option<u8> = None;
        let mut escaped = false;
        let mut read_any = false;
        loop {
            let Some(byte) = self.next_byte()? else {
                if let Some(open) = quote {
                    line.push(char::from(open));
                }
                return Ok(if read_any { Some(line) } else { None });
            };
            read_any = true;

            if byte == b'\n' {
                if quote.is_none() {
                    return Ok(Some(line));
                }
                line.push('\n');
                continue;
            }
            if !is_printable(byte) && byte != b'\r' && byte != b'\t' {
                continue;
            }

            line.push(char::from(byte));
            match quote {
                Some(open) => {
                    if escaped {
                        escaped = false;
                    } else if byte == b'\\' {
                        escaped = true;
                    } else if byte == open {
                        quote = None;
                    }
                }
                None => {
                    if byte == b'\'' || byte == b'"' {
                        quote = Some(byte);
                    }
                }
            }
        }
    }

    fn next_byte(&mut self) -> LexResult<Option<u8>> {
        match self.source.next() {
            Some(Ok(byte)) => Ok(Some(byte)),
            Some(Err(error)) => Err(LexError::Input {
                message: error.to_string(),
            }),
            None => Ok(None),
        }
    }

    fn tokenize_content(&mut self, content: &str) -> LexResult<()> {
        let bytes = content.as_bytes();
        let mut pos = 0;
        while pos < bytes.len() {
            let byte = bytes[pos];
            if byte == b' ' {
                pos += 1;
            } else if byte == b'#' {
                break;
            } else if byte == b'\'' || byte == b'"' {
                pos = self.read_string(content, pos);
            } else if matches!(byte, b'<' | b'>' | b'=' | b'!') && bytes.get(pos + 1) == Some(&b'=')
            {
                self.pending.push_back(match byte {
                    b'<' => Token::LessOrEq,
                    b'>' => Token::GreaterOrEq,
                    b'!' => Token::NotEq,
                    _ => Token::Eq,
                });
                pos += 2;
            } else if is_operator_char(byte) {
                self.pending.push_back(Token::Char(byte));
                pos += 1;
            } else if byte.is_ascii_digit() {
                pos = self.read_number(content, pos)?;
            } else {
                pos = self.read_word(content, pos);
            }
        }
        Ok(())
    }

    /// Lexes a string literal starting at its opening quote and pushes the
    /// unescaped payload: `\n` and `\t` are translated, a backslash before
    /// any other character is removed and the character kept verbatim.
    fn read_string(&mut self, content: &str, start: usize) -> usize {
        let bytes = content.as_bytes();
        let open = bytes[start];
        let mut payload = String::new();
        let mut pos = start + 1;
        while pos < bytes.len() {
            let byte = bytes[pos];
            if byte == b'\\' {
                match bytes.get(pos + 1) {
                    Some(b'n') => payload.push('\n'),
                    Some(b't') => payload.push('\t'),
                    Some(&other) => payload.push(char::from(other)),
                    None => {
                        payload.push('\\');
                        pos += 1;
                        continue;
                    }
                }
                pos += 2;
                continue;
            }
            pos += 1;
            if byte == open {
                break;
            }
            payload.push(char::from(byte));
        }
        self.pending.push_back(Token::String(payload));
        pos
    }

    fn read_number(&mut self, content: &str, start: usize) -> LexResult<usize> {
        let bytes = content.as_bytes();
        let mut pos = start;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        let literal = &content[start..pos];
        let value = literal
            .parse::<i32>()
            .map_err(|_| LexError::InvalidNumberLiteral {
                literal: literal.to_string(),
                line: self.line,
            })?;
        self.pending.push_back(Token::Number(value));
        Ok(pos)
    }

    fn read_word(&mut self, content: &str, start: usize) -> usize {
        let bytes = content.as_bytes();
        let mut pos = start + 1;
        while pos < bytes.len() {
            let byte = bytes[pos];
            if byte == b' ' || byte == b'#' || is_operator_char(byte) {
                break;
            }
            pos += 1;
        }
        let word = &content[start..pos];
        let token = keyword(word).unwrap_or_else(|| Token::Id(word.to_string()));
        self.pending.push_back(token);
        pos
    }
}

pub fn tokenize<R: Read>(source: R) -> LexResult<Vec<Token>> {
    let mut lexer = Lexer::new(source)?;
    let mut tokens = vec![lexer.current().clone()];
    while *lexer.current() != Token::Eof {
        tokens.push(lexer.advance()?);
    }
    Ok(tokens)
}
