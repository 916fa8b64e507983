use std::fmt;

use super::{FitsError, BLOCK_SIZE, CARD_SIZE};

// ---------------------------------------------------------------------------
// Card values
// ---------------------------------------------------------------------------

/// The value field of a header card.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Logical(bool),
    Integer(i64),
    Float(f64),
    Str(String),
    /// Something sits after `= ` but it is none of the above.
    Unparsed(String),
}

impl Value {
    fn parse(field: &str) -> Value {
        let trimmed = field.trim_start();
        if let Some(rest) = trimmed.strip_prefix('\'') {
            return Value::Str(parse_quoted(rest));
        }

        let token = trimmed.split('/').next().unwrap_or("").trim();
        match token {
            "T" => return Value::Logical(true),
            "F" => return Value::Logical(false),
            _ => {}
        }
        if let Ok(i) = token.parse::<i64>() {
            return Value::Integer(i);
        }
        // Fortran-style double exponents: 1.0D+00
        if let Ok(f) = token.replace(['D', 'd'], "E").parse::<f64>() {
            return Value::Float(f);
        }
        Value::Unparsed(token.to_string())
    }

    /// Render the value field (columns 11..30 for fixed-format values).
    fn format(&self) -> String {
        match self {
            Value::Logical(b) => format!("{:>20}", if *b { "T" } else { "F" }),
            Value::Integer(i) => format!("{i:>20}"),
            Value::Float(f) => format!("{:>20}", format!("{f:?}").to_uppercase()),
            Value::Str(s) => {
                let escaped = s.replace('\'', "''");
                format!("{:<20}", format!("'{escaped:<8}'"))
            }
            Value::Unparsed(s) => format!("{s:>20}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Logical(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) | Value::Unparsed(s) => write!(f, "{s}"),
        }
    }
}

/// Parse the body of a quoted string; `rest` starts just after the opening quote.
fn parse_quoted(rest: &str) -> String {
    let mut out = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                out.push('\'');
                chars.next();
            } else {
                break;
            }
        } else {
            out.push(c);
        }
    }
    // Trailing blanks inside the quotes are not significant.
    out.truncate(out.trim_end().len());
    out
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// One 80-byte header record.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub keyword: String,
    pub value: Option<Value>,
}

impl Card {
    pub fn new(keyword: &str, value: Value) -> Self {
        Card {
            keyword: keyword.to_string(),
            value: Some(value),
        }
    }

    fn parse(raw: &[u8]) -> Result<Card, FitsError> {
        if !raw.is_ascii() {
            return Err(FitsError::Malformed(
                "header card contains non-ASCII bytes".into(),
            ));
        }
        // ASCII was checked above, so this cannot fail.
        let text = std::str::from_utf8(raw).unwrap_or_default();
        let keyword = text[..8].trim_end().to_string();
        let value = if &text[8..10] == "= " {
            Some(Value::parse(&text[10..]))
        } else {
            None
        };
        Ok(Card { keyword, value })
    }

    /// Render as exactly 80 ASCII bytes.
    fn to_record(&self) -> String {
        let mut line = match &self.value {
            Some(v) => format!("{:<8}= {}", self.keyword, v.format()),
            None => format!("{:<8}", self.keyword),
        };
        line.truncate(CARD_SIZE);
        format!("{line:<80}")
    }
}

// ---------------------------------------------------------------------------
// Header – an ordered list of cards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, keyword: &str, value: Value) {
        self.cards.push(Card::new(keyword, value));
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Parse a header starting at `offset`.  Returns the header and the offset
    /// of the first byte after its last block.
    pub fn parse(bytes: &[u8], offset: usize) -> Result<(Header, usize), FitsError> {
        let mut cards = Vec::new();
        let mut pos = offset;
        loop {
            let raw = bytes
                .get(pos..pos + CARD_SIZE)
                .ok_or_else(|| FitsError::Malformed("header has no END card".into()))?;
            pos += CARD_SIZE;
            let card = Card::parse(raw)?;
            if card.keyword == "END" && card.value.is_none() {
                break;
            }
            cards.push(card);
        }
        let end = offset + padded_len(pos - offset);
        Ok((Header { cards }, end))
    }

    /// Serialise with END and blank padding to a whole number of blocks.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::with_capacity(BLOCK_SIZE);
        for card in &self.cards {
            out.push_str(&card.to_record());
        }
        out.push_str(&format!("{:<80}", "END"));
        let len = padded_len(out.len());
        let mut bytes = out.into_bytes();
        bytes.resize(len, b' ');
        bytes
    }

    pub fn get(&self, keyword: &str) -> Option<&Value> {
        self.cards
            .iter()
            .find(|c| c.keyword == keyword)
            .and_then(|c| c.value.as_ref())
    }

    pub fn integer(&self, keyword: &str) -> Result<i64, FitsError> {
        match self.get(keyword) {
            Some(Value::Integer(i)) => Ok(*i),
            Some(other) => Err(FitsError::BadKeyword {
                keyword: keyword.to_string(),
                found: other.to_string(),
            }),
            None => Err(FitsError::MissingKeyword(keyword.to_string())),
        }
    }

    pub fn integer_or(&self, keyword: &str, default: i64) -> Result<i64, FitsError> {
        match self.get(keyword) {
            None => Ok(default),
            Some(_) => self.integer(keyword),
        }
    }

    /// Non-negative integer keyword, as a size.
    pub fn size(&self, keyword: &str) -> Result<usize, FitsError> {
        let v = self.integer(keyword)?;
        usize::try_from(v).map_err(|_| FitsError::BadKeyword {
            keyword: keyword.to_string(),
            found: v.to_string(),
        })
    }

    /// Real-valued keyword; integers are accepted.
    pub fn float_or(&self, keyword: &str, default: f64) -> Result<f64, FitsError> {
        match self.get(keyword) {
            None => Ok(default),
            Some(Value::Float(f)) => Ok(*f),
            Some(Value::Integer(i)) => Ok(*i as f64),
            Some(other) => Err(FitsError::BadKeyword {
                keyword: keyword.to_string(),
                found: other.to_string(),
            }),
        }
    }

    pub fn string(&self, keyword: &str) -> Option<&str> {
        match self.get(keyword) {
            Some(Value::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Round `len` up to the next block boundary.
pub fn padded_len(len: usize) -> usize {
    len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

/// [`padded_len`] for sizes taken from a file; `None` if rounding up overflows.
pub fn checked_padded_len(len: usize) -> Option<usize> {
    len.div_ceil(BLOCK_SIZE).checked_mul(BLOCK_SIZE)
}
