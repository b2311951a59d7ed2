use std::char::REPLACEMENT_CHARACTER;
use std::fmt::{self, Debug, Formatter};

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

pub const CHAR_LF: char = '\u{000A}';
pub const CHAR_CR: char = '\u{000D}';
pub const CHAR_FF: char = '\u{000C}';

/// Defines a single element in the stream: either a decoded code point, or
/// the end of the stream. Note that after preprocessing the buffer can never
/// contain NUL or raw surrogates, so no separate variants are needed for
/// those.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Character {
    /// Standard unicode code point
    Ch(char),
    /// Stream buffer exhausted
    StreamEnd,
}

use Character::*;

/// Converts the given character to a char. The end of the stream is
/// converted to 0x0000.
impl From<Character> for char {
    fn from(c: Character) -> Self {
        match c {
            Ch(c) => c,
            StreamEnd => 0x0000 as char,
        }
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Ch(ch) => write!(f, "{ch}"),
            StreamEnd => write!(f, "StreamEnd"),
        }
    }
}

impl Character {
    /// Returns true when the character is CSS whitespace (space, tab or a
    /// preprocessed newline)
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Ch(c) if matches!(c, ' ' | '\t' | '\n'))
    }

    /// Returns true when the character is an ASCII digit
    pub fn is_numeric(&self) -> bool {
        matches!(self, Ch(c) if c.is_ascii_digit())
    }

    /// Returns true when the character is an ASCII hex digit
    pub fn is_hex_digit(&self) -> bool {
        matches!(self, Ch(c) if c.is_ascii_hexdigit())
    }
}

/// Location holds the position of an element in the data source
#[derive(Clone, PartialEq, Eq)]
pub struct Location {
    /// Line number, starting with 1
    pub line: usize,
    /// Column number, starting with 1
    pub column: usize,
    /// Code-point offset, starting with 0
    pub offset: usize,
}

impl Default for Location {
    /// Default to line 1, column 1
    fn default() -> Self {
        Self::new(1, 1, 0)
    }
}

impl Location {
    /// Create a new Location
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

impl Debug for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{})", self.line, self.column)
    }
}

/// LocationHandler is a wrapper that deals with line/column positions in the
/// stream. A surrogate-free, preprocessed stream advances one column per code
/// point and resets the column after every newline.
pub struct LocationHandler {
    /// The current location of the stream
    cur_location: Location,
}

impl LocationHandler {
    /// Create a new LocationHandler. start_location can be set in case the
    /// stream does not start at 1:1
    pub fn new(start_location: Location) -> Self {
        Self {
            cur_location: start_location,
        }
    }

    /// Returns the current location in the stream
    pub fn current(&self) -> Location {
        self.cur_location.clone()
    }

    /// Will increase the current location based on the given character
    pub fn inc(&mut self, ch: Character) {
        match ch {
            Ch(CHAR_LF) => {
                self.cur_location.line += 1;
                self.cur_location.column = 1;
                self.cur_location.offset += 1;
            }
            Ch(_) => {
                self.cur_location.column += 1;
                self.cur_location.offset += 1;
            }
            StreamEnd => {}
        }
    }
}

/// A stream of code points decoded from a CSS source, after the CSS
/// preprocessing step: CRLF, CR and FF are normalized to LF, and NUL is
/// replaced with U+FFFD. The buffer is fully decoded up front; the tokenizer
/// only ever needs a small forward lookahead window.
pub struct ByteStream {
    /// Preprocessed code points
    buffer: Vec<char>,
    /// Current position in the buffer
    position: usize,
}

impl Default for ByteStream {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteStream {
    /// Create a new empty stream
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            position: 0,
        }
    }

    /// Populates the stream with the given (already decoded) string, applying
    /// the CSS preprocessing rules.
    pub fn read_from_str(&mut self, s: &str) {
        self.buffer = preprocess(s);
        self.position = 0;
    }

    /// Populates the stream from raw bytes. The character encoding is
    /// selected with [`determine_encoding`] and the decoded text goes through
    /// the same preprocessing as [`ByteStream::read_from_str`]. Returns the
    /// encoding that was selected.
    pub fn read_from_bytes(
        &mut self,
        bytes: &[u8],
        protocol_encoding: Option<&str>,
        environment_encoding: Option<&str>,
    ) -> &'static Encoding {
        let encoding = determine_encoding(bytes, protocol_encoding, environment_encoding);
        let (text, _) = encoding.decode_with_bom_removal(bytes);
        self.read_from_str(&text);
        encoding
    }

    /// Looks ahead in the stream. look_ahead(0) is the character that the
    /// next read will return.
    pub fn look_ahead(&self, offset: usize) -> Character {
        match self.buffer.get(self.position + offset) {
            Some(c) => Ch(*c),
            None => StreamEnd,
        }
    }

    /// Reads the current character and advances to the next
    pub fn read_and_next(&mut self) -> Character {
        let c = self.look_ahead(0);
        if c != StreamEnd {
            self.position += 1;
        }
        c
    }

    /// Advances one character
    pub fn next(&mut self) {
        if self.position < self.buffer.len() {
            self.position += 1;
        }
    }

    /// Returns true when all characters have been read
    pub fn eof(&self) -> bool {
        self.position >= self.buffer.len()
    }

    /// Current position in the buffer, in code points
    pub fn tell(&self) -> usize {
        self.position
    }

    /// Retrieves a slice of the buffer as a string
    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.buffer.len());
        if start >= end {
            return String::new();
        }
        self.buffer[start..end].iter().collect()
    }
}

/// Applies the CSS preprocessing rules to a decoded string
fn preprocess(input: &str) -> Vec<char> {
    let mut buffer = Vec::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            CHAR_CR => {
                // CRLF collapses into a single LF
                if chars.peek() == Some(&CHAR_LF) {
                    chars.next();
                }
                buffer.push(CHAR_LF);
            }
            CHAR_FF => buffer.push(CHAR_LF),
            '\0' => buffer.push(REPLACEMENT_CHARACTER),
            _ => buffer.push(c),
        }
    }

    buffer
}

/// Determines the character encoding of a CSS byte stream, given the
/// encoding hints that accompany it:
///
/// 1. a protocol encoding label (e.g. from an HTTP `charset` parameter);
/// 2. a BOM at the start of the byte stream;
/// 3. a leading `@charset "<label>";` rule, matched byte-for-byte against
///    the first 1024 bytes — with the exception that a label naming a UTF-16
///    encoding selects UTF-8, since the rule itself was readable as ASCII;
/// 4. an environment encoding label (e.g. from the referencing document);
/// 5. UTF-8.
///
/// Labels are resolved against the WHATWG encoding registry. Unknown labels
/// fall through to the next step.
pub fn determine_encoding(
    bytes: &[u8],
    protocol_encoding: Option<&str>,
    environment_encoding: Option<&str>,
) -> &'static Encoding {
    if let Some(label) = protocol_encoding {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            return encoding;
        }
        log::warn!("unknown protocol encoding label: {label}");
    }

    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return UTF_8;
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return UTF_16BE;
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return UTF_16LE;
    }

    if let Some(label) = charset_rule_label(bytes) {
        match Encoding::for_label(label) {
            Some(encoding) if encoding == UTF_16BE || encoding == UTF_16LE => return UTF_8,
            Some(encoding) => return encoding,
            None => {
                log::warn!("unknown @charset label: {}", String::from_utf8_lossy(label));
            }
        }
    }

    if let Some(label) = environment_encoding {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            return encoding;
        }
        log::warn!("unknown environment encoding label: {label}");
    }

    UTF_8
}

/// Extracts the label of a leading `@charset "…";` rule, if the byte stream
/// starts with one. The recognition is byte-exact: the rule must start at
/// offset 0, the closing quote must appear within the first 1024 bytes, and
/// the quote must be followed by a semicolon.
fn charset_rule_label(bytes: &[u8]) -> Option<&[u8]> {
    const PREFIX: &[u8] = b"@charset \"";

    if !bytes.starts_with(PREFIX) {
        return None;
    }

    let window = &bytes[..bytes.len().min(1024)];
    let end_quote = window[PREFIX.len()..]
        .iter()
        .position(|&b| b == b'"')?
        + PREFIX.len();

    if bytes.get(end_quote + 1) != Some(&b';') {
        return None;
    }

    Some(&bytes[PREFIX.len()..end_quote])
}
