use cascata_shared::byte_stream::Character::{Ch, StreamEnd};
use cascata_shared::byte_stream::{ByteStream, Character, Location, LocationHandler};

use crate::ast::Number;

const REPLACEMENT_CHARACTER: char = '\u{FFFD}';
const MAX_CODE_POINT: u32 = 0x10FFFF;

#[derive(Debug, PartialEq, Clone)]
pub enum TokenType {
    /// A run of whitespace, verbatim from the source
    Whitespace(String),
    /// The text between `/*` and `*/`
    Comment(String),
    /// Fixed punctuation: `:` `;` `,` `<!--` `-->` `~=` `|=` `^=` `$=` `*=`
    /// `||`, or a single delim code point
    Literal(String),
    Ident(String),
    /// The value does not include the `@` marker
    AtKeyword(String),
    /// The value does not include the `#` marker
    Hash { value: String, is_identifier: bool },
    /// A [`<string-token>`](https://www.w3.org/TR/css-syntax-3/#string-token-diagram);
    /// the value is unescaped, the representation includes the quotes
    QuotedString { value: String, representation: String },
    /// A [`<url-token>`](https://www.w3.org/TR/css-syntax-3/#url-token-diagram);
    /// the representation is the full `url(...)` source
    Url { value: String, representation: String },
    UnicodeRange { start: u32, end: u32 },
    Number {
        value: Number,
        int_value: Option<i64>,
        representation: String,
    },
    Percentage {
        value: Number,
        int_value: Option<i64>,
        representation: String,
    },
    Dimension {
        value: Number,
        int_value: Option<i64>,
        representation: String,
        unit: String,
    },
    /// An identifier immediately followed by `(`
    Function(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LCurly,
    RCurly,
    /// A `<bad-string-token>`; always indicates a parse error
    BadString,
    /// A `<bad-url-token>`; always indicates a parse error
    BadUrl,
    /// The input ended inside a string token
    EofInString,
    /// The input ended inside a url token
    EofInUrl,
    Eof,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Token {
    /// Type of the token
    pub token_type: TokenType,
    /// Location of the token's first code point in the stream
    pub location: Location,
}

impl Token {
    /// Returns a new token for the given type on the given location
    fn new(token_type: TokenType, location: Location) -> Token {
        Token { token_type, location }
    }

    fn new_literal(value: &str, location: Location) -> Token {
        Token::new(TokenType::Literal(value.to_string()), location)
    }
}

/// [ident-start code point](https://www.w3.org/TR/css-syntax-3/#ident-start-code-point)
fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

/// [ident code point](https://www.w3.org/TR/css-syntax-3/#ident-code-point)
fn is_ident_char(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit() || c == '-'
}

/// [whitespace](https://www.w3.org/TR/css-syntax-3/#whitespace), after the
/// preprocessing step collapsed every newline into LF
fn is_css_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n')
}

/// [non-printable code point](https://www.w3.org/TR/css-syntax-3/#non-printable-code-point)
fn is_non_printable(c: char) -> bool {
    matches!(c, '\u{0000}'..='\u{0008}' | '\u{000B}' | '\u{000E}'..='\u{001F}' | '\u{007F}')
}

fn hex_value(digits: &str) -> u32 {
    u32::from_str_radix(digits, 16).unwrap_or(0)
}

/// CSS tokenizer according to the [w3 specification](https://www.w3.org/TR/css-syntax-3/#tokenization)
pub struct Tokenizer<'stream> {
    stream: &'stream mut ByteStream,
    /// Tracks the position of the next token in the source
    location: LocationHandler,
    /// When true, `U+` sequences are recognized as unicode-range tokens.
    /// The modern syntax spec only recognizes them in contexts that ask for
    /// them; pass false to get that behavior.
    unicode_ranges: bool,
    /// A second token produced by a consume that had to emit two (the
    /// truncated token and its eof error marker)
    pending: Option<Token>,
}

impl<'stream> Tokenizer<'stream> {
    /// Creates a new tokenizer on the given stream that starts on the given
    /// location. This does not have to be 1/1, but can be any location.
    pub fn new(stream: &'stream mut ByteStream, location: Location) -> Self {
        Self::with_unicode_ranges(stream, location, true)
    }

    /// Creates a new tokenizer with explicit unicode-range recognition
    pub fn with_unicode_ranges(
        stream: &'stream mut ByteStream,
        location: Location,
        unicode_ranges: bool,
    ) -> Self {
        Self {
            stream,
            location: LocationHandler::new(location),
            unicode_ranges,
            pending: None,
        }
    }

    /// Returns the location of the next code point to be consumed
    pub fn current_location(&self) -> Location {
        self.location.current()
    }

    /// Returns true when there is nothing left to tokenize
    pub fn eof(&self) -> bool {
        self.pending.is_none() && self.stream.eof()
    }

    /// Consumes the whole stream and returns the tokens in source order
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while !self.eof() {
            let token = self.consume_token();
            log::trace!("{:?}", token);
            tokens.push(token);
        }

        tokens
    }

    /// 4.3.1. [Consume a token](https://www.w3.org/TR/css-syntax-3/#consume-token)
    pub fn consume_token(&mut self) -> Token {
        if let Some(token) = self.pending.take() {
            return token;
        }

        let loc = self.current_location();

        match self.current_char() {
            StreamEnd => Token::new(TokenType::Eof, loc),
            Ch(c) if is_css_whitespace(c) => self.consume_whitespace_token(),
            Ch('u' | 'U') if self.unicode_ranges && self.starts_unicode_range() => {
                self.consume_unicode_range()
            }
            // CDC must be checked before ident sequences: `--` starts one
            Ch('-') if self.look_ahead_slice(3) == "-->" => {
                self.consume_chars(3);
                Token::new_literal("-->", loc)
            }
            Ch(_) if self.is_ident_start_seq(0) => self.consume_ident_like(),
            Ch('"' | '\'') => self.consume_string_token(),
            Ch('/') if self.stream.look_ahead(1) == Ch('*') => self.consume_comment_token(),
            Ch('<') if self.look_ahead_slice(4) == "<!--" => {
                self.consume_chars(4);
                Token::new_literal("<!--", loc)
            }
            Ch('|') if self.stream.look_ahead(1) == Ch('|') => {
                self.consume_chars(2);
                Token::new_literal("||", loc)
            }
            Ch(_) if self.starts_number(0) => self.consume_numeric_token(),
            Ch('@') => {
                self.next_char();

                if self.is_ident_start_seq(0) {
                    return Token::new(TokenType::AtKeyword(self.consume_ident_sequence()), loc);
                }

                Token::new_literal("@", loc)
            }
            Ch('#') => {
                self.next_char();

                let named = matches!(self.current_char(), Ch(c) if is_ident_char(c));
                if named || self.is_valid_escape(0) {
                    let is_identifier = self.is_ident_start_seq(0);
                    let value = self.consume_ident_sequence();
                    return Token::new(TokenType::Hash { value, is_identifier }, loc);
                }

                Token::new_literal("#", loc)
            }
            Ch('(') => {
                self.next_char();
                Token::new(TokenType::LParen, loc)
            }
            Ch(')') => {
                self.next_char();
                Token::new(TokenType::RParen, loc)
            }
            Ch('[') => {
                self.next_char();
                Token::new(TokenType::LBracket, loc)
            }
            Ch(']') => {
                self.next_char();
                Token::new(TokenType::RBracket, loc)
            }
            Ch('{') => {
                self.next_char();
                Token::new(TokenType::LCurly, loc)
            }
            Ch('}') => {
                self.next_char();
                Token::new(TokenType::RCurly, loc)
            }
            Ch(c @ ('~' | '^' | '$' | '*' | '|')) if self.stream.look_ahead(1) == Ch('=') => {
                self.consume_chars(2);
                let mut value = c.to_string();
                value.push('=');
                Token::new(TokenType::Literal(value), loc)
            }
            Ch(c) => {
                self.next_char();
                Token::new(TokenType::Literal(c.to_string()), loc)
            }
        }
    }

    /// [whitespace](https://www.w3.org/TR/css-syntax-3/#whitespace): the
    /// maximal run, kept verbatim so the serializer can reproduce it
    fn consume_whitespace_token(&mut self) -> Token {
        let loc = self.current_location();
        let start = self.stream.tell();

        while self.current_char().is_whitespace() {
            self.next_char();
        }

        Token::new(
            TokenType::Whitespace(self.stream.slice(start, self.stream.tell())),
            loc,
        )
    }

    /// 4.3.2. [Consume comments](https://www.w3.org/TR/css-syntax-3/#consume-comment)
    ///
    /// An unterminated comment runs to the end of the input; that is not an
    /// error.
    fn consume_comment_token(&mut self) -> Token {
        let loc = self.current_location();

        // consume '/*'
        self.consume_chars(2);
        let start = self.stream.tell();

        while !self.stream.eof() && self.look_ahead_slice(2) != "*/" {
            self.next_char();
        }

        let value = self.stream.slice(start, self.stream.tell());
        if !self.stream.eof() {
            // consume '*/'
            self.consume_chars(2);
        }

        Token::new(TokenType::Comment(value), loc)
    }

    /// 4.3.3. [Consume a numeric token](https://www.w3.org/TR/css-syntax-3/#consume-numeric-token)
    ///
    /// Returns either a `<number-token>`, `<percentage-token>`, or `<dimension-token>`.
    fn consume_numeric_token(&mut self) -> Token {
        let loc = self.current_location();
        let start = self.stream.tell();

        let (value, int_value) = self.consume_number();
        let representation = self.stream.slice(start, self.stream.tell());

        if self.is_ident_start_seq(0) {
            let unit = self.consume_ident_sequence();
            return Token::new(
                TokenType::Dimension {
                    value,
                    int_value,
                    representation,
                    unit,
                },
                loc,
            );
        }

        if self.current_char() == Ch('%') {
            // consume '%'
            self.next_char();
            return Token::new(
                TokenType::Percentage {
                    value,
                    int_value,
                    representation,
                },
                loc,
            );
        }

        Token::new(
            TokenType::Number {
                value,
                int_value,
                representation,
            },
            loc,
        )
    }

    /// 4.3.12. [Consume a number](https://www.w3.org/TR/css-syntax-3/#consume-number)
    ///
    /// The token is an integer when the source had neither a fraction nor an
    /// exponent.
    fn consume_number(&mut self) -> (Number, Option<i64>) {
        let start = self.stream.tell();
        let mut integer = true;

        if matches!(self.current_char(), Ch('+' | '-')) {
            self.next_char();
        }
        self.consume_digits();

        if self.current_char() == Ch('.') && self.stream.look_ahead(1).is_numeric() {
            self.consume_chars(2);
            self.consume_digits();
            integer = false;
        }

        // U+0045 / U+0065, an optional sign, and at least one digit
        let c2 = self.stream.look_ahead(1);
        let c3 = self.stream.look_ahead(2);
        if matches!(self.current_char(), Ch('e' | 'E'))
            && (c2.is_numeric() || (matches!(c2, Ch('+' | '-')) && c3.is_numeric()))
        {
            self.consume_chars(2);
            self.consume_digits();
            integer = false;
        }

        let repr = self.stream.slice(start, self.stream.tell());
        let value: Number = repr.parse().unwrap_or_default();
        let int_value = if integer {
            Some(repr.parse::<i64>().unwrap_or(value as i64))
        } else {
            None
        };

        (value, int_value)
    }

    /// 4.3.4. [Consume an ident-like token](https://www.w3.org/TR/css-syntax-3/#consume-ident-like-token)
    ///
    /// Returns an `<ident-token>`, `<function-token>`, `<url-token>` or
    /// `<bad-url-token>`. `url(` only opens a url token when the first
    /// non-whitespace code point after the paren is not a quote.
    fn consume_ident_like(&mut self) -> Token {
        let loc = self.current_location();
        let start = self.stream.tell();

        let value = self.consume_ident_sequence();

        if self.current_char() != Ch('(') {
            return Token::new(TokenType::Ident(value), loc);
        }

        // consume '('
        self.next_char();

        if value.eq_ignore_ascii_case("url") {
            let mut offset = 0;
            while self.stream.look_ahead(offset).is_whitespace() {
                offset += 1;
            }
            if !matches!(self.stream.look_ahead(offset), Ch('"' | '\'')) {
                return self.consume_url_token(start, loc);
            }
        }

        Token::new(TokenType::Function(value), loc)
    }

    /// 4.3.5. [Consume a string token](https://www.w3.org/TR/css-syntax-3/#consume-string-token)
    ///
    /// A raw newline produces a `<bad-string-token>` and is left in the
    /// stream. EOF produces the truncated string token followed by an
    /// `eof-in-string` marker.
    fn consume_string_token(&mut self) -> Token {
        let loc = self.current_location();
        let start = self.stream.tell();

        let ending: char = self.next_char().into();
        let mut value = String::new();

        loop {
            match self.current_char() {
                StreamEnd => {
                    let representation = self.stream.slice(start, self.stream.tell());
                    self.pending = Some(Token::new(TokenType::EofInString, self.current_location()));
                    return Token::new(TokenType::QuotedString { value, representation }, loc);
                }
                Ch(c) if c == ending => {
                    self.next_char();
                    let representation = self.stream.slice(start, self.stream.tell());
                    return Token::new(TokenType::QuotedString { value, representation }, loc);
                }
                Ch('\n') => {
                    // note: don't consume '\n'
                    return Token::new(TokenType::BadString, loc);
                }
                Ch('\\') => match self.stream.look_ahead(1) {
                    // escaped newlines continue the string
                    Ch('\n') => self.consume_chars(2),
                    // escaped EOF contributes nothing
                    StreamEnd => self.next_char_void(),
                    _ => {
                        self.next_char();
                        value.push(self.consume_escaped_code_point());
                    }
                },
                Ch(c) => {
                    self.next_char();
                    value.push(c);
                }
            }
        }
    }

    /// 4.3.6. [Consume a url token](https://www.w3.org/TR/css-syntax-3/#consume-url-token)
    ///
    /// The stream is positioned right after `url(`; `token_start` points at
    /// the `u` so the representation covers the whole token.
    fn consume_url_token(&mut self, token_start: usize, loc: Location) -> Token {
        let mut value = String::new();

        self.consume_whitespace();

        loop {
            match self.current_char() {
                StreamEnd => {
                    let representation = self.stream.slice(token_start, self.stream.tell());
                    self.pending = Some(Token::new(TokenType::EofInUrl, self.current_location()));
                    return Token::new(TokenType::Url { value, representation }, loc);
                }
                Ch(')') => {
                    self.next_char();
                    let representation = self.stream.slice(token_start, self.stream.tell());
                    return Token::new(TokenType::Url { value, representation }, loc);
                }
                Ch(c) if is_css_whitespace(c) => {
                    self.consume_whitespace();
                    if !matches!(self.current_char(), Ch(')') | StreamEnd) {
                        self.consume_bad_url_remnants();
                        return Token::new(TokenType::BadUrl, loc);
                    }
                }
                Ch('"' | '\'' | '(') => {
                    self.consume_bad_url_remnants();
                    return Token::new(TokenType::BadUrl, loc);
                }
                Ch(c) if is_non_printable(c) => {
                    self.consume_bad_url_remnants();
                    return Token::new(TokenType::BadUrl, loc);
                }
                Ch('\\') => {
                    if self.is_valid_escape(0) {
                        self.next_char();
                        value.push(self.consume_escaped_code_point());
                    } else {
                        self.consume_bad_url_remnants();
                        return Token::new(TokenType::BadUrl, loc);
                    }
                }
                Ch(c) => {
                    self.next_char();
                    value.push(c);
                }
            }
        }
    }

    /// 4.3.14. [Consume the remnants of a bad url](https://www.w3.org/TR/css-syntax-3/#consume-remnants-of-bad-url)
    ///
    /// Consumes enough of the stream to reach a recovery point where normal
    /// tokenizing can resume. Escaped closing parens do not end the token.
    fn consume_bad_url_remnants(&mut self) {
        loop {
            match self.current_char() {
                StreamEnd => break,
                Ch(')') => {
                    self.next_char();
                    break;
                }
                Ch('\\') if self.is_valid_escape(0) => {
                    self.next_char();
                    self.consume_escaped_code_point();
                }
                _ => self.next_char_void(),
            }
        }
    }

    /// 4.3.7. [Consume an escaped code point](https://www.w3.org/TR/css-syntax-3/#consume-escaped-code-point)
    ///
    /// The stream is positioned after the backslash. NUL, surrogates and
    /// values above U+10FFFF decode to the replacement character.
    fn consume_escaped_code_point(&mut self) -> char {
        if self.stream.eof() {
            // parse error
            return REPLACEMENT_CHARACTER;
        }

        if !self.current_char().is_hex_digit() {
            return self.next_char().into();
        }

        let mut digits = String::new();
        while self.current_char().is_hex_digit() && digits.len() < 6 {
            digits.push(self.next_char().into());
        }
        if self.current_char().is_whitespace() {
            self.next_char();
        }

        let code_point = hex_value(&digits);
        if code_point == 0 || code_point > MAX_CODE_POINT {
            return REPLACEMENT_CHARACTER;
        }

        char::from_u32(code_point).unwrap_or(REPLACEMENT_CHARACTER)
    }

    /// 4.3.11. [Consume an ident sequence](https://www.w3.org/TR/css-syntax-3/#consume-name)
    ///
    /// The caller is expected to have verified that the stream starts with
    /// an ident sequence.
    fn consume_ident_sequence(&mut self) -> String {
        let mut value = String::new();

        loop {
            match self.current_char() {
                Ch(c) if is_ident_char(c) => {
                    self.next_char();
                    value.push(c);
                }
                Ch('\\') if self.is_valid_escape(0) => {
                    self.next_char();
                    value.push(self.consume_escaped_code_point());
                }
                _ => break,
            }
        }

        value
    }

    /// [unicode-range token](https://www.w3.org/TR/css-syntax-3/#urange):
    /// 1-6 hex digits, optional `?` wildcards, or two ranges joined by `-`.
    /// Stored clamped into 0..=10FFFF with start <= end.
    fn consume_unicode_range(&mut self) -> Token {
        let loc = self.current_location();

        // consume 'U+'
        self.consume_chars(2);

        let mut start_digits = String::new();
        while self.current_char().is_hex_digit() && start_digits.len() < 6 {
            start_digits.push(self.next_char().into());
        }

        let mut question_marks = 0;
        while self.current_char() == Ch('?') && start_digits.len() + question_marks < 6 {
            self.next_char();
            question_marks += 1;
        }

        let (start, end) = if question_marks > 0 {
            let start = hex_value(&format!("{}{}", start_digits, "0".repeat(question_marks)));
            let end = hex_value(&format!("{}{}", start_digits, "F".repeat(question_marks)));
            (start, end)
        } else if self.current_char() == Ch('-') && self.stream.look_ahead(1).is_hex_digit() {
            self.next_char();
            let mut end_digits = String::new();
            while self.current_char().is_hex_digit() && end_digits.len() < 6 {
                end_digits.push(self.next_char().into());
            }
            (hex_value(&start_digits), hex_value(&end_digits))
        } else {
            let single = hex_value(&start_digits);
            (single, single)
        };

        let start = start.min(MAX_CODE_POINT);
        let end = end.min(MAX_CODE_POINT).max(start);

        Token::new(TokenType::UnicodeRange { start, end }, loc)
    }

    fn starts_unicode_range(&self) -> bool {
        self.stream.look_ahead(1) == Ch('+')
            && matches!(self.stream.look_ahead(2), Ch(c) if c.is_ascii_hexdigit() || c == '?')
    }

    /// 4.3.8. [Check if two code points are a valid escape](https://www.w3.org/TR/css-syntax-3/#starts-with-a-valid-escape)
    fn is_valid_escape(&self, start: usize) -> bool {
        self.stream.look_ahead(start) == Ch('\\') && self.stream.look_ahead(start + 1) != Ch('\n')
    }

    /// 4.3.9. [Check if three code points would start an ident sequence](https://www.w3.org/TR/css-syntax-3/#would-start-an-identifier)
    fn is_ident_start_seq(&self, start: usize) -> bool {
        match self.stream.look_ahead(start) {
            Ch('-') => match self.stream.look_ahead(start + 1) {
                Ch('-') => true,
                Ch(c) if is_ident_start(c) => true,
                _ => self.is_valid_escape(start + 1),
            },
            Ch('\\') => self.is_valid_escape(start),
            Ch(c) => is_ident_start(c),
            StreamEnd => false,
        }
    }

    /// 4.3.10. [Check if three code points would start a number](https://www.w3.org/TR/css-syntax-3/#starts-with-a-number)
    fn starts_number(&self, start: usize) -> bool {
        match self.stream.look_ahead(start) {
            Ch('+' | '-') => match self.stream.look_ahead(start + 1) {
                Ch('.') => self.stream.look_ahead(start + 2).is_numeric(),
                c => c.is_numeric(),
            },
            Ch('.') => self.stream.look_ahead(start + 1).is_numeric(),
            c => c.is_numeric(),
        }
    }

    fn consume_digits(&mut self) {
        while self.current_char().is_numeric() {
            self.next_char();
        }
    }

    fn consume_chars(&mut self, mut len: usize) {
        while len > 0 {
            self.next_char();
            len -= 1;
        }
    }

    fn consume_whitespace(&mut self) {
        while self.current_char().is_whitespace() {
            self.next_char();
        }
    }

    fn current_char(&self) -> Character {
        self.stream.look_ahead(0)
    }

    fn next_char(&mut self) -> Character {
        let c = self.stream.read_and_next();
        self.location.inc(c);
        c
    }

    fn next_char_void(&mut self) {
        self.next_char();
    }

    fn look_ahead_slice(&self, len: usize) -> String {
        let mut s = String::new();

        for i in 0..len {
            match self.stream.look_ahead(i) {
                Ch(c) => s.push(c),
                StreamEnd => break,
            }
        }

        s
    }
}
