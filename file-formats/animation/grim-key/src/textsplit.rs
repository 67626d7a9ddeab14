use memchr::memchr_iter;

use crate::error::{KeyframeError, Result};

/// Line-oriented tokenizer for the textual KEY representation.
///
/// Splits the input into significant lines up front (blank lines and `#`
/// comments are dropped), then hands them out one at a time. Typed scanning
/// happens through [`LineTokens`], which consumes one line as a cursor of
/// whitespace-separated tokens. Every error carries the 1-based line number
/// of the offending input line.
pub struct TextSplitter<'a> {
    lines: Vec<(usize, &'a str)>,
    cursor: usize,
}

impl<'a> TextSplitter<'a> {
    pub fn new(text: &'a str) -> Self {
        let bytes = text.as_bytes();
        let mut lines = Vec::new();
        let mut start = 0;
        let mut number = 1;
        for end in memchr_iter(b'\n', bytes).chain(std::iter::once(bytes.len())) {
            let line = text[start..end].trim();
            if !line.is_empty() && !line.starts_with('#') {
                lines.push((number, line));
            }
            start = end + 1;
            number += 1;
        }
        Self { lines, cursor: 0 }
    }

    /// The current significant line, without consuming it
    pub fn current_line(&self) -> Option<&'a str> {
        self.lines.get(self.cursor).map(|&(_, line)| line)
    }

    /// True once every significant line has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.lines.len()
    }

    /// Consume and return the current line
    pub fn next_line(&mut self) -> Option<&'a str> {
        let line = self.current_line();
        if line.is_some() {
            self.cursor += 1;
        }
        line
    }

    /// Consume the current line, which must match `literal` exactly
    pub fn expect(&mut self, literal: &str) -> Result<()> {
        let line_no = self.line_number();
        match self.next_line() {
            Some(line) if line == literal => Ok(()),
            Some(line) => Err(KeyframeError::ParseAt {
                line: line_no,
                message: format!("expected `{literal}`, found `{line}`"),
            }),
            None => Err(KeyframeError::ParseAt {
                line: line_no,
                message: format!("expected `{literal}`, found end of input"),
            }),
        }
    }

    /// Peek whether the current line matches `literal`, ignoring ASCII case
    pub fn peek_is_ignore_case(&self, literal: &str) -> bool {
        self.current_line()
            .is_some_and(|line| line.eq_ignore_ascii_case(literal))
    }

    /// Consume the current line as a typed token cursor
    pub fn tokens(&mut self) -> Result<LineTokens<'a>> {
        let line_no = self.line_number();
        match self.next_line() {
            Some(line) => Ok(LineTokens {
                line: line_no,
                tokens: line.split_ascii_whitespace(),
            }),
            None => Err(KeyframeError::ParseAt {
                line: line_no,
                message: "unexpected end of input".to_string(),
            }),
        }
    }

    fn line_number(&self) -> usize {
        self.lines
            .get(self.cursor)
            .or_else(|| self.lines.last())
            .map_or(0, |&(number, _)| number)
    }
}

/// Cursor over the whitespace-separated tokens of one line
pub struct LineTokens<'a> {
    line: usize,
    tokens: std::str::SplitAsciiWhitespace<'a>,
}

impl<'a> LineTokens<'a> {
    /// 1-based number of the line this cursor is scanning
    pub fn line_number(&self) -> usize {
        self.line
    }

    fn next_token(&mut self, expected: &str) -> Result<&'a str> {
        self.tokens.next().ok_or_else(|| KeyframeError::ParseAt {
            line: self.line,
            message: format!("expected {expected}, found end of line"),
        })
    }

    fn malformed(&self, expected: &str, token: &str) -> KeyframeError {
        KeyframeError::ParseAt {
            line: self.line,
            message: format!("expected {expected}, found `{token}`"),
        }
    }

    /// The next token must equal `word` exactly
    pub fn literal(&mut self, word: &str) -> Result<&mut Self> {
        let token = self.next_token(&format!("`{word}`"))?;
        if token == word {
            Ok(self)
        } else {
            Err(self.malformed(&format!("`{word}`"), token))
        }
    }

    /// Scan a decimal unsigned integer
    pub fn u32(&mut self) -> Result<u32> {
        let token = self.next_token("an unsigned integer")?;
        token
            .parse()
            .map_err(|_| self.malformed("an unsigned integer", token))
    }

    /// Scan a decimal signed integer
    pub fn i32(&mut self) -> Result<i32> {
        let token = self.next_token("an integer")?;
        token.parse().map_err(|_| self.malformed("an integer", token))
    }

    /// Scan a hexadecimal integer; an optional `0x` prefix is accepted
    pub fn hex(&mut self) -> Result<u32> {
        let token = self.next_token("a hex integer")?;
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        u32::from_str_radix(digits, 16).map_err(|_| self.malformed("a hex integer", token))
    }

    /// Scan a floating-point number
    pub fn f32(&mut self) -> Result<f32> {
        let token = self.next_token("a number")?;
        token.parse().map_err(|_| self.malformed("a number", token))
    }

    /// Scan a bare word
    pub fn word(&mut self) -> Result<&'a str> {
        self.next_token("a word")
    }

    /// Scan a list position written as `N:`
    pub fn index(&mut self) -> Result<usize> {
        let token = self.next_token("an index like `0:`")?;
        token
            .strip_suffix(':')
            .and_then(|digits| digits.parse().ok())
            .ok_or_else(|| self.malformed("an index like `0:`", token))
    }
}
