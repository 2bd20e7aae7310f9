//! Statement splitter for SQL scripts.
//!
//! Splits script text on `;` while respecting:
//! - Single-quoted strings (`''` escapes, plus backslash escapes in `E'...'`)
//! - Double-quoted and backtick-quoted identifiers
//! - Dollar-quoted bodies (`$$ ... $$`, `$tag$ ... $tag$`)
//! - Line comments (`--`, `//`) and nested block comments (`/* */`), which
//!   are dropped

use std::iter::Peekable;
use std::str::Chars;

/// Lazily splits `script` into statements.
///
/// Each yielded statement is trimmed, keeps its terminating `;` and has its
/// comments removed. Empty statements are skipped. A trailing statement
/// without a terminator is still yielded.
pub fn split_statements(script: &str) -> impl Iterator<Item = String> + '_ {
    Splitter {
        chars: script.chars().peekable(),
    }
}

struct Splitter<'a> {
    chars: Peekable<Chars<'a>>,
}

impl Iterator for Splitter<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let text = self.scan_statement()?;
            let statement = text.trim();
            if statement.trim_end_matches(';').trim().is_empty() {
                continue;
            }
            return Some(statement.to_string());
        }
    }
}

impl Splitter<'_> {
    /// Scans up to the next terminator or end of input.
    ///
    /// Returns `None` only when the input is exhausted and nothing was read.
    fn scan_statement(&mut self) -> Option<String> {
        self.chars.peek()?;
        let mut buf = String::new();

        while let Some(c) = self.chars.next() {
            match c {
                ';' => {
                    buf.push(c);
                    return Some(buf);
                }
                '\'' => {
                    let escapes = has_escape_prefix(&buf);
                    buf.push(c);
                    self.copy_single_quoted(&mut buf, escapes);
                }
                '"' | '`' => {
                    buf.push(c);
                    self.copy_until(&mut buf, c);
                }
                '$' => {
                    buf.push(c);
                    self.copy_dollar_quoted(&mut buf);
                }
                '-' if self.chars.peek() == Some(&'-') => self.skip_line_comment(),
                '/' if self.chars.peek() == Some(&'/') => self.skip_line_comment(),
                '/' if self.chars.peek() == Some(&'*') => {
                    self.chars.next();
                    self.skip_block_comment();
                    if !buf.ends_with(char::is_whitespace) {
                        buf.push(' ');
                    }
                }
                _ => buf.push(c),
            }
        }

        Some(buf)
    }

    /// Copies a single-quoted string body, including the closing quote.
    ///
    /// Backslash is literal unless `escapes` is set, as in PostgreSQL
    /// standard strings and SQLite.
    fn copy_single_quoted(&mut self, buf: &mut String, escapes: bool) {
        while let Some(c) = self.chars.next() {
            buf.push(c);
            match c {
                '\\' if escapes => {
                    if let Some(escaped) = self.chars.next() {
                        buf.push(escaped);
                    }
                }
                '\'' => {
                    // '' is an escaped quote
                    if self.chars.peek() == Some(&'\'') {
                        buf.push('\'');
                        self.chars.next();
                    } else {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    /// Copies a quoted identifier body, including the closing quote.
    ///
    /// A doubled quote character is treated as an escaped quote.
    fn copy_until(&mut self, buf: &mut String, quote: char) {
        while let Some(c) = self.chars.next() {
            buf.push(c);
            if c == quote {
                if self.chars.peek() == Some(&quote) {
                    buf.push(quote);
                    self.chars.next();
                } else {
                    return;
                }
            }
        }
    }

    /// Copies a dollar-quoted body if the `$` just consumed opens one.
    fn copy_dollar_quoted(&mut self, buf: &mut String) {
        // Read a candidate tag: identifier characters up to the next '$'.
        let mut tag = String::new();
        loop {
            match self.chars.peek() {
                Some(&'$') => {
                    self.chars.next();
                    break;
                }
                Some(&c) if c.is_alphanumeric() || c == '_' => {
                    if tag.is_empty() && c.is_ascii_digit() {
                        // $1 positional parameter
                        return;
                    }
                    tag.push(c);
                    buf.push(c);
                    self.chars.next();
                }
                _ => return,
            }
        }
        buf.push('$');

        let delimiter = format!("${tag}$");
        let mut body = String::new();
        for c in self.chars.by_ref() {
            body.push(c);
            if body.ends_with(&delimiter) {
                break;
            }
        }
        buf.push_str(&body);
    }

    /// Skips to the end of the line, leaving the newline in place.
    fn skip_line_comment(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.chars.next();
        }
    }

    /// Skips a block comment whose opening `/*` was consumed. Comments nest.
    fn skip_block_comment(&mut self) {
        let mut depth = 1;
        while let Some(c) = self.chars.next() {
            match (c, self.chars.peek().copied()) {
                ('*', Some('/')) => {
                    self.chars.next();
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                ('/', Some('*')) => {
                    self.chars.next();
                    depth += 1;
                }
                _ => {}
            }
        }
    }
}

/// Returns true if the quote about to be pushed opens an `E'...'` string.
fn has_escape_prefix(buf: &str) -> bool {
    let mut rev = buf.chars().rev();
    matches!(rev.next(), Some('E' | 'e'))
        && !rev.next().is_some_and(|c| c.is_alphanumeric() || c == '_')
}
