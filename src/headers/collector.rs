//! Line scanning and header collection

use std::io::{self, BufRead, Read};

use thiserror::Error;

use super::classify::{classify_line, LineClass};
use super::{HeaderMap, OrderedHeaders};
use crate::config::ParseConfig;

/// Errors that can occur while reading rendered header lines
#[derive(Debug, Error)]
pub enum ScanError {
    /// The underlying reader failed or produced invalid UTF-8
    #[error("read failed at line {line}: {source}")]
    Io {
        line: usize,
        #[source]
        source: io::Error,
    },

    /// A line exceeded the configured maximum length
    #[error("line {line} is longer than {limit} bytes")]
    LineTooLong { line: usize, limit: usize },
}

/// Names that are recorded in the order list but never get a value entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SuppressedName {
    /// Ordered once, at its first occurrence
    Cookie,
    /// Ordered at every occurrence
    ContentLength,
}

impl SuppressedName {
    fn of(name: &str, config: &ParseConfig) -> Option<Self> {
        if lowercase_eq(name, "cookie") {
            Some(Self::Cookie)
        } else if config.suppress_content_length && lowercase_eq(name, "content-length") {
            Some(Self::ContentLength)
        } else {
            None
        }
    }
}

/// Full Unicode lowercase comparison against an already-lowercase target
fn lowercase_eq(name: &str, lowercase: &str) -> bool {
    name.chars().flat_map(char::to_lowercase).eq(lowercase.chars())
}

/// Accumulates headers from classified lines
///
/// All state is per instance; a collector is built for one parse and
/// consumed by [`HeaderCollector::finish`].
#[derive(Debug)]
pub struct HeaderCollector<'c> {
    config: &'c ParseConfig,
    values: HeaderMap,
    pseudo_order: Vec<String>,
    header_order: Vec<String>,
    cookie_ordered: bool,
}

impl<'c> HeaderCollector<'c> {
    pub fn new(config: &'c ParseConfig) -> Self {
        Self {
            config,
            values: HeaderMap::new(),
            pseudo_order: Vec::new(),
            header_order: Vec::new(),
            cookie_ordered: false,
        }
    }

    /// Classify and record one header line; `line_number` is only for logs
    pub fn push_line(&mut self, line_number: usize, line: &str) {
        match classify_line(line) {
            LineClass::Skipped(reason) => {
                tracing::trace!(line = line_number, ?reason, "skipping template line");
            }
            LineClass::Pseudo(name) => self.pseudo_order.push(name),
            LineClass::Regular { name, value } => self.push_regular(name, value),
        }
    }

    fn push_regular(&mut self, name: &str, value: &str) {
        match SuppressedName::of(name, self.config) {
            Some(SuppressedName::Cookie) => {
                if !self.cookie_ordered {
                    self.header_order.push(name.to_string());
                    self.cookie_ordered = true;
                }
            }
            Some(SuppressedName::ContentLength) => self.header_order.push(name.to_string()),
            None => {
                self.header_order.push(name.to_string());
                self.values
                    .entry(name.to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }
    }

    pub fn finish(self) -> OrderedHeaders {
        tracing::debug!(
            pseudo = self.pseudo_order.len(),
            regular = self.header_order.len(),
            distinct = self.values.len(),
            "collected template headers"
        );
        OrderedHeaders {
            values: self.values,
            pseudo_order: self.pseudo_order,
            header_order: self.header_order,
        }
    }
}

/// Reads newline-terminated lines with a length cap
struct LineReader<R> {
    reader: R,
    limit: usize,
    line: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    fn new(reader: R, limit: usize) -> Self {
        Self {
            reader,
            limit,
            line: 0,
            buf: Vec::new(),
        }
    }

    /// Next line without its `\n` or `\r\n` terminator, `None` at end of input
    fn next_line(&mut self) -> Result<Option<String>, ScanError> {
        self.buf.clear();
        self.line += 1;

        // Room for the longest allowed line plus "\r\n"
        let cap = self.limit.saturating_add(2) as u64;
        let read = (&mut self.reader)
            .take(cap)
            .read_until(b'\n', &mut self.buf)
            .map_err(|source| ScanError::Io {
                line: self.line,
                source,
            })?;
        if read == 0 {
            return Ok(None);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
        }
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        if self.buf.len() > self.limit {
            return Err(ScanError::LineTooLong {
                line: self.line,
                limit: self.limit,
            });
        }

        let bytes = std::mem::take(&mut self.buf);
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|err| ScanError::Io {
                line: self.line,
                source: io::Error::new(io::ErrorKind::InvalidData, err),
            })
    }
}

/// Collect headers from already-rendered template text
///
/// The first line is the request line and is always discarded. Blank and
/// malformed lines are skipped; only read failures and over-long lines are
/// errors, and they discard everything collected so far.
pub fn parse_rendered_headers<R: BufRead>(
    reader: R,
    config: &ParseConfig,
) -> Result<OrderedHeaders, ScanError> {
    let mut lines = LineReader::new(reader, config.max_line_length);

    let Some(request_line) = lines.next_line()? else {
        return Ok(OrderedHeaders::default());
    };
    tracing::trace!(request_line = %request_line, "discarding request line");

    let mut collector = HeaderCollector::new(config);
    while let Some(line) = lines.next_line()? {
        collector.push_line(lines.line, &line);
    }
    Ok(collector.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_LINE_LENGTH;

    fn parse(text: &str) -> OrderedHeaders {
        parse_rendered_headers(text.as_bytes(), &ParseConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse(""), OrderedHeaders::default());
    }

    #[test]
    fn test_request_line_only() {
        assert_eq!(parse("GET / HTTP/2"), OrderedHeaders::default());
        assert_eq!(parse("Host: looks-like-a-header\n"), OrderedHeaders::default());
    }

    #[test]
    fn test_crlf_lines() {
        let headers = parse("GET / HTTP/2\r\nAccept: */*\r\nX-A: 1\r\n");
        assert_eq!(headers.header_order, vec!["Accept", "X-A"]);
        assert_eq!(headers.get("X-A"), Some(&["1".to_string()][..]));
    }

    #[test]
    fn test_last_line_without_newline() {
        let headers = parse("REQ\nX: y");
        assert_eq!(headers.get("X"), Some(&["y".to_string()][..]));
    }

    #[test]
    fn test_cookie_ordered_once_with_first_casing() {
        let headers = parse("REQ\ncookie: a=1\nX: 1\nCOOKIE: b=2\n");
        assert_eq!(headers.header_order, vec!["cookie", "X"]);
        assert!(headers.get("cookie").is_none());
        assert!(headers.get("COOKIE").is_none());
    }

    #[test]
    fn test_content_length_ordered_every_time() {
        let headers = parse("REQ\nContent-Length: 1\ncontent-length: 2\n");
        assert_eq!(headers.header_order, vec!["Content-Length", "content-length"]);
        assert!(headers.values.is_empty());
    }

    #[test]
    fn test_content_length_collected_when_not_suppressed() {
        let config = ParseConfig::new().with_suppress_content_length(false);
        let headers = parse_rendered_headers("REQ\nContent-Length: 42\n".as_bytes(), &config).unwrap();
        assert_eq!(headers.header_order, vec!["Content-Length"]);
        assert_eq!(headers.get("Content-Length"), Some(&["42".to_string()][..]));
    }

    #[test]
    fn test_cookie_suppressed_even_when_content_length_is_not() {
        let config = ParseConfig::new().with_suppress_content_length(false);
        let headers = parse_rendered_headers("REQ\nCookie: a\n".as_bytes(), &config).unwrap();
        assert_eq!(headers.header_order, vec!["Cookie"]);
        assert!(headers.values.is_empty());
    }

    #[test]
    fn test_unicode_case_folding_for_suppressed_names() {
        // U+212A KELVIN SIGN lowercases to 'k'
        let headers = parse("REQ\nCOO\u{212A}IE: a=1\n");
        assert_eq!(headers.header_order, vec!["COO\u{212A}IE"]);
        assert!(headers.values.is_empty());
    }

    #[test]
    fn test_case_variants_are_separate_keys() {
        let headers = parse("REQ\nX-A: 1\nx-a: 2\n");
        assert_eq!(headers.get("X-A"), Some(&["1".to_string()][..]));
        assert_eq!(headers.get("x-a"), Some(&["2".to_string()][..]));
        assert_eq!(headers.header_order, vec!["X-A", "x-a"]);
    }

    #[test]
    fn test_line_too_long() {
        let config = ParseConfig::new().with_max_line_length(8);
        let err = parse_rendered_headers("REQ\nX: 12345\nX: 123456\n".as_bytes(), &config).unwrap_err();
        assert!(matches!(err, ScanError::LineTooLong { line: 3, limit: 8 }));
    }

    #[test]
    fn test_line_at_limit_with_crlf() {
        let config = ParseConfig::new().with_max_line_length(8);
        let headers = parse_rendered_headers("REQ\r\nX: 12345\r\n".as_bytes(), &config).unwrap();
        assert_eq!(headers.get("X"), Some(&["12345".to_string()][..]));
    }

    #[test]
    fn test_default_limit_boundary() {
        let longest = format!("REQ\nX: {}\n", "a".repeat(DEFAULT_MAX_LINE_LENGTH - 3));
        let headers = parse(&longest);
        assert_eq!(headers.get("X").map(|v| v[0].len()), Some(DEFAULT_MAX_LINE_LENGTH - 3));

        let over = format!("REQ\nX: {}\n", "a".repeat(DEFAULT_MAX_LINE_LENGTH - 2));
        let err = parse_rendered_headers(over.as_bytes(), &ParseConfig::default()).unwrap_err();
        assert!(matches!(err, ScanError::LineTooLong { line: 2, limit: 65535 }));
    }

    #[test]
    fn test_request_line_too_long() {
        let config = ParseConfig::new().with_max_line_length(4);
        let err = parse_rendered_headers("GET / HTTP/2\n".as_bytes(), &config).unwrap_err();
        assert!(matches!(err, ScanError::LineTooLong { line: 1, .. }));
    }

    #[test]
    fn test_invalid_utf8() {
        let input: &[u8] = b"REQ\nX: \xff\xfe\n";
        let err = parse_rendered_headers(input, &ParseConfig::default()).unwrap_err();
        match err {
            ScanError::Io { line, source } => {
                assert_eq!(line, 2);
                assert_eq!(source.kind(), io::ErrorKind::InvalidData);
            }
            other => panic!("expected io error, got {other:?}"),
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    #[test]
    fn test_reader_failure() {
        let reader = io::BufReader::new(FailingReader);
        let err = parse_rendered_headers(reader, &ParseConfig::default()).unwrap_err();
        assert!(matches!(err, ScanError::Io { line: 1, .. }));
    }

    #[test]
    fn test_failure_after_partial_headers() {
        let reader = io::BufReader::new("REQ\nX: 1\n".as_bytes().chain(FailingReader));
        let err = parse_rendered_headers(reader, &ParseConfig::default()).unwrap_err();
        assert!(matches!(err, ScanError::Io { line: 3, .. }));
    }
}
