// crates/core/src/delimited.rs
//! Comma-delimited text with conventional double-quote quoting.

use std::io::{self, Write};
use std::mem::take;

use crate::error::DelimitedError;

pub const DELIMITER: char = ',';
pub const QUOTE: char = '"';

/// Largest field the tokenizer accepts, in characters.
pub const FIELD_LIMIT: usize = 131_072;

// ============================================================================
// Parsing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StartRecord,
    StartField,
    InField,
    InQuotedField,
    QuoteInQuotedField,
}

struct Tokenizer {
    records: Vec<Vec<String>>,
    record: Vec<String>,
    field: String,
    field_chars: usize,
    state: State,
}

impl Tokenizer {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            record: Vec::new(),
            field: String::new(),
            field_chars: 0,
            state: State::StartRecord,
        }
    }

    fn record_number(&self) -> usize {
        self.records.len() + 1
    }

    fn push_char(&mut self, ch: char) -> Result<(), DelimitedError> {
        self.field_chars += 1;
        if self.field_chars > FIELD_LIMIT {
            return Err(DelimitedError::FieldTooLarge {
                record: self.record_number(),
                limit: FIELD_LIMIT,
            });
        }
        self.field.push(ch);
        Ok(())
    }

    fn end_field(&mut self) {
        self.record.push(take(&mut self.field));
        self.field_chars = 0;
    }

    fn end_record(&mut self) {
        self.end_field();
        self.records.push(take(&mut self.record));
    }
}

/// Parse delimited text into records.
///
/// An empty line yields an empty record. A `"` opens a quoted field only at
/// field start; elsewhere it is literal. Text following a closing quote is
/// appended to the same field. Input ending inside a quoted field, or a
/// carriage return followed by more text outside quotes, is an error.
pub fn parse_records(text: &str) -> Result<Vec<Vec<String>>, DelimitedError> {
    let mut t = Tokenizer::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        // Outside quotes a run of `\r` must end the line.
        let is_break = ch == '\n' || ch == '\r';
        if ch == '\r' && t.state != State::InQuotedField {
            while chars.peek() == Some(&'\r') {
                chars.next();
            }
            match chars.peek() {
                None => {}
                Some('\n') => {
                    chars.next();
                }
                Some(_) => {
                    return Err(DelimitedError::BareCarriageReturn {
                        record: t.record_number(),
                    });
                }
            }
        }

        match t.state {
            State::StartRecord if is_break => {
                t.records.push(Vec::new());
            }
            State::StartRecord | State::StartField => {
                if ch == QUOTE {
                    t.state = State::InQuotedField;
                } else if ch == DELIMITER {
                    t.end_field();
                    t.state = State::StartField;
                } else if is_break {
                    t.end_record();
                    t.state = State::StartRecord;
                } else {
                    t.push_char(ch)?;
                    t.state = State::InField;
                }
            }
            State::InField => {
                if ch == DELIMITER {
                    t.end_field();
                    t.state = State::StartField;
                } else if is_break {
                    t.end_record();
                    t.state = State::StartRecord;
                } else {
                    t.push_char(ch)?;
                }
            }
            State::InQuotedField => {
                if ch == QUOTE {
                    t.state = State::QuoteInQuotedField;
                } else {
                    t.push_char(ch)?;
                }
            }
            State::QuoteInQuotedField => {
                if ch == QUOTE {
                    t.push_char(QUOTE)?;
                    t.state = State::InQuotedField;
                } else if ch == DELIMITER {
                    t.end_field();
                    t.state = State::StartField;
                } else if is_break {
                    t.end_record();
                    t.state = State::StartRecord;
                } else {
                    t.push_char(ch)?;
                    t.state = State::InField;
                }
            }
        }
    }

    match t.state {
        State::StartRecord => {}
        State::InQuotedField => {
            return Err(DelimitedError::UnterminatedQuote {
                record: t.record_number(),
            });
        }
        State::StartField | State::InField | State::QuoteInQuotedField => t.end_record(),
    }

    Ok(t.records)
}

// ============================================================================
// Writing
// ============================================================================

fn needs_quotes(field: &str) -> bool {
    field.contains(DELIMITER) || field.contains(QUOTE) || field.contains('\n') || field.contains('\r')
}

/// Write one record, minimally quoted, terminated by `\r\n`.
pub fn write_record<W: Write, S: AsRef<str>>(mut w: W, record: &[S]) -> io::Result<()> {
    let mut first = true;
    for field in record {
        let field = field.as_ref();
        if !first {
            write!(w, "{DELIMITER}")?;
        } else {
            first = false;
        }
        if needs_quotes(field) {
            write!(w, "\"{}\"", field.replace(QUOTE, "\"\""))?;
        } else {
            write!(w, "{field}")?;
        }
    }
    write!(w, "\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rec(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_simple_records() {
        let records = parse_records("a,b,c\n1,2,3").unwrap();
        assert_eq!(records, vec![rec(&["a", "b", "c"]), rec(&["1", "2", "3"])]);
    }

    #[test]
    fn test_trailing_newline_adds_no_record() {
        assert_eq!(parse_records("a,b\n").unwrap(), vec![rec(&["a", "b"])]);
        assert_eq!(parse_records("").unwrap(), Vec::<Vec<String>>::new());
    }

    #[test]
    fn test_empty_fields_and_blank_lines() {
        let records = parse_records("a,,c,\n\nx").unwrap();
        assert_eq!(
            records,
            vec![rec(&["a", "", "c", ""]), Vec::new(), rec(&["x"])]
        );
    }

    #[test]
    fn test_quoted_field_with_delimiter_and_newline() {
        let records = parse_records("\"Heat Pumps, Hydronics\",\"line1\nline2\",z").unwrap();
        assert_eq!(
            records,
            vec![rec(&["Heat Pumps, Hydronics", "line1\nline2", "z"])]
        );
    }

    #[test]
    fn test_doubled_quote_is_literal() {
        let records = parse_records("\"say \"\"hi\"\"\",b").unwrap();
        assert_eq!(records, vec![rec(&["say \"hi\"", "b"])]);
    }

    #[test]
    fn test_quote_inside_unquoted_field_is_literal() {
        let records = parse_records("5\" duct,b").unwrap();
        assert_eq!(records, vec![rec(&["5\" duct", "b"])]);
    }

    #[test]
    fn test_text_after_closing_quote_is_appended() {
        let records = parse_records("\"abc\"def,g").unwrap();
        assert_eq!(records, vec![rec(&["abcdef", "g"])]);
    }

    #[test]
    fn test_crlf_line_breaks() {
        let records = parse_records("a,b\r\nc,d\r\n").unwrap();
        assert_eq!(records, vec![rec(&["a", "b"]), rec(&["c", "d"])]);
    }

    #[test]
    fn test_crlf_inside_quotes_preserved() {
        let records = parse_records("\"a\r\nb\",c").unwrap();
        assert_eq!(records, vec![rec(&["a\r\nb", "c"])]);
    }

    #[test]
    fn test_bare_carriage_return_in_unquoted_field_is_error() {
        let err = parse_records("a,b\nAcme\rHeating,c").unwrap_err();
        assert_eq!(err, DelimitedError::BareCarriageReturn { record: 2 });
        let err = parse_records("\"a\"\rb").unwrap_err();
        assert_eq!(err, DelimitedError::BareCarriageReturn { record: 1 });
    }

    #[test]
    fn test_carriage_returns_before_line_end_are_one_break() {
        let records = parse_records("a,b\r\r\nc\r").unwrap();
        assert_eq!(records, vec![rec(&["a", "b"]), rec(&["c"])]);
    }

    #[test]
    fn test_unterminated_quote_is_error() {
        let err = parse_records("a,b\n\"open,c").unwrap_err();
        assert_eq!(err, DelimitedError::UnterminatedQuote { record: 2 });
    }

    #[test]
    fn test_field_limit() {
        let big = "x".repeat(FIELD_LIMIT + 1);
        let err = parse_records(&format!("a\n{big}")).unwrap_err();
        assert_eq!(
            err,
            DelimitedError::FieldTooLarge {
                record: 2,
                limit: FIELD_LIMIT
            }
        );
        assert!(parse_records(&"x".repeat(FIELD_LIMIT)).is_ok());
    }

    #[test]
    fn test_write_record_minimal_quoting() {
        let mut buf = Vec::new();
        write_record(&mut buf, &["plain", "a,b", "say \"hi\"", "two\nlines", ""]).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "plain,\"a,b\",\"say \"\"hi\"\"\",\"two\nlines\",\r\n"
        );
    }

    #[test]
    fn test_written_record_parses_back() {
        let original = rec(&["Acme, Ltd.", "\"quoted\"", "multi\nline", "x"]);
        let mut buf = Vec::new();
        write_record(&mut buf, &original).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(parse_records(&text).unwrap(), vec![original]);
    }
}
