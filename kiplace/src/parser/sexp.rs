use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Unterminated string starting at position {0}")]
    UnterminatedString(usize),
    #[error("Unexpected content after the closing parenthesis at position {0}")]
    TrailingInput(usize),
    #[error("Parse error at position {0}: {1}")]
    ParseError(usize, String),
}

/// A node of a KiCad S-expression file.
///
/// Bare symbols (`fp_text`, `F.Cu`, `1.6`) and quoted strings (`"R1"`) are
/// kept apart so a node written back out keeps its original quoting.
#[derive(Debug, Clone, PartialEq)]
pub enum SExp {
    Atom(String),
    Str(String),
    List(Vec<SExp>),
}

impl SExp {
    pub fn atom(value: impl Into<String>) -> Self {
        SExp::Atom(value.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        SExp::Str(value.into())
    }

    pub fn list(items: Vec<SExp>) -> Self {
        SExp::List(items)
    }

    /// Number atom in the shortest form that reads back to the same value.
    pub fn number(value: f64) -> Self {
        SExp::Atom(format_number(value))
    }

    /// Text of a symbol or a quoted string.
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExp::Atom(s) | SExp::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<SExp>> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, SExp::List(_))
    }

    pub fn as_f64(&self) -> Result<f64, ParseError> {
        let text = self
            .as_atom()
            .ok_or_else(|| ParseError::InvalidNumber(self.to_string()))?;
        text.parse()
            .map_err(|_| ParseError::InvalidNumber(text.to_string()))
    }

    /// Keyword of a list node: `(layer "F.Cu")` has head `layer`.
    pub fn head(&self) -> Option<&str> {
        match self {
            SExp::List(items) => match items.first() {
                Some(SExp::Atom(s)) => Some(s),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&SExp> {
        if let SExp::List(items) = self {
            for item in items {
                if let SExp::List(sublist) = item {
                    if item.head() == Some(key) {
                        // (key value) yields the value; longer lists yield the whole sublist
                        if sublist.len() == 2 {
                            return Some(&sublist[1]);
                        } else if sublist.len() > 2 {
                            return Some(item);
                        }
                    }
                }
            }
        }
        None
    }

    pub fn get_all(&self, key: &str) -> Vec<&SExp> {
        let mut results = Vec::new();
        if let SExp::List(items) = self {
            for item in items {
                if item.head() == Some(key) {
                    results.push(item);
                }
            }
        }
        results
    }

    /// Nesting depth: atoms are 0, `(a b)` is 1, `(a (b c))` is 2.
    pub fn depth(&self) -> usize {
        match self {
            SExp::List(items) => 1 + items.iter().map(SExp::depth).max().unwrap_or(0),
            _ => 0,
        }
    }
}

/// Formats a coordinate the way KiCad writes them: no trailing zeros, no `-0`.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{}", value)
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

impl fmt::Display for SExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExp::Atom(s) => {
                // A symbol that would not read back as one symbol gets quoted
                if s.is_empty()
                    || s.chars()
                        .any(|c| c.is_whitespace() || c == '(' || c == ')' || c == '"')
                {
                    write!(f, "\"{}\"", escape(s))
                } else {
                    write!(f, "{}", s)
                }
            }
            SExp::Str(s) => write!(f, "\"{}\"", escape(s)),
            SExp::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

const INLINE_DEPTH: usize = 3;
const INLINE_WIDTH: usize = 88;

/// Multi-line rendering in the layout pcbnew uses: a list stays on one line
/// while it is shallow and short, otherwise each nested list goes on its own
/// line, two spaces deeper than its parent.
pub fn format_sexp(sexp: &SExp, indent: usize) -> String {
    let mut out = String::new();
    write_pretty(sexp, indent, &mut out);
    out
}

fn write_pretty(sexp: &SExp, indent: usize, out: &mut String) {
    let items = match sexp {
        SExp::List(items) => items,
        _ => {
            out.push_str(&sexp.to_string());
            return;
        }
    };

    let flat = sexp.to_string();
    if sexp.depth() <= INLINE_DEPTH && flat.len() <= INLINE_WIDTH {
        out.push_str(&flat);
        return;
    }

    out.push('(');
    let split = items.iter().position(SExp::is_list).unwrap_or(items.len());
    for (i, item) in items[..split].iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&item.to_string());
    }
    for item in &items[split..] {
        out.push('\n');
        out.push_str(&"  ".repeat(indent + 1));
        write_pretty(item, indent + 1, out);
    }
    out.push('\n');
    out.push_str(&"  ".repeat(indent));
    out.push(')');
}

/// A top-level child of a document together with its exact source text and
/// the whitespace that preceded it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawNode {
    pub node: SExp,
    pub text: String,
    pub leading: String,
}

/// A document root `(keyword child child ...)` with its children kept as
/// [`RawNode`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct SExpDocument {
    pub keyword: String,
    pub children: Vec<RawNode>,
    /// Whitespace between the last child and the closing parenthesis.
    pub tail: String,
    /// Whitespace after the closing parenthesis.
    pub trailer: String,
}

/// Deepest list nesting accepted; KiCad files stay far below this.
pub const MAX_DEPTH: usize = 512;

pub struct SExpParser {
    input: Vec<char>,
    pos: usize,
    depth: usize,
}

impl SExpParser {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    pub fn parse(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();
        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }
        self.parse_sexp()
    }

    /// Parses a whole file: exactly one root list whose first element is a
    /// keyword, nothing but whitespace after it.
    pub fn parse_document(&mut self) -> Result<SExpDocument, ParseError> {
        self.skip_whitespace();
        self.expect_char('(')?;
        self.skip_whitespace();

        let keyword = match self.parse_sexp()? {
            SExp::Atom(keyword) => keyword,
            other => {
                return Err(ParseError::UnexpectedToken(format!(
                    "Expected a document keyword, found {}",
                    other
                )))
            }
        };

        let mut children = Vec::new();
        let tail = loop {
            let gap_start = self.pos;
            self.skip_whitespace();
            let leading = self.slice(gap_start, self.pos);

            if self.is_eof() {
                return Err(ParseError::UnexpectedEof);
            }
            if self.peek() == ')' {
                self.advance();
                break leading;
            }

            let start = self.pos;
            let node = self.parse_sexp()?;
            children.push(RawNode {
                node,
                text: self.slice(start, self.pos),
                leading,
            });
        };

        let trailer_start = self.pos;
        self.skip_whitespace();
        if !self.is_eof() {
            return Err(ParseError::TrailingInput(self.pos));
        }

        Ok(SExpDocument {
            keyword,
            children,
            tail,
            trailer: self.slice(trailer_start, self.pos),
        })
    }

    fn parse_sexp(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();

        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }

        match self.peek() {
            '(' => self.parse_list(),
            ')' => Err(ParseError::ParseError(
                self.pos,
                "unbalanced closing parenthesis".to_string(),
            )),
            _ => self.parse_atom(),
        }
    }

    fn parse_list(&mut self) -> Result<SExp, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::ParseError(self.pos, "nesting too deep".to_string()));
        }
        self.expect_char('(')?;
        self.depth += 1;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_eof() {
                return Err(ParseError::UnexpectedEof);
            }

            if self.peek() == ')' {
                self.advance();
                break;
            }

            items.push(self.parse_sexp()?);
        }

        self.depth -= 1;
        Ok(SExp::List(items))
    }

    fn parse_atom(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();

        if self.peek() == '"' {
            self.parse_string()
        } else {
            self.parse_symbol()
        }
    }

    fn parse_string(&mut self) -> Result<SExp, ParseError> {
        let start = self.pos;
        self.expect_char('"')?;
        let mut s = String::new();
        let mut escaped = false;

        while !self.is_eof() {
            let ch = self.peek();
            self.advance();

            if escaped {
                match ch {
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    'r' => s.push('\r'),
                    '\\' => s.push('\\'),
                    '"' => s.push('"'),
                    _ => s.push(ch),
                }
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                return Ok(SExp::Str(s));
            } else {
                s.push(ch);
            }
        }

        Err(ParseError::UnterminatedString(start))
    }

    fn parse_symbol(&mut self) -> Result<SExp, ParseError> {
        let mut s = String::new();

        while !self.is_eof() {
            let ch = self.peek();
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            s.push(ch);
            self.advance();
        }

        if s.is_empty() {
            Err(ParseError::UnexpectedToken("empty symbol".to_string()))
        } else {
            Ok(SExp::Atom(s))
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && self.peek().is_whitespace() {
            self.advance();
        }
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.input[start..end].iter().collect()
    }

    fn peek(&self) -> char {
        if self.pos < self.input.len() {
            self.input[self.pos]
        } else {
            '\0'
        }
    }

    fn advance(&mut self) {
        if self.pos < self.input.len() {
            self.pos += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }

        let ch = self.peek();
        if ch == expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken(format!(
                "Expected '{}', found '{}'",
                expected, ch
            )))
        }
    }
}
