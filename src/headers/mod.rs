//! Order-preserving header structure built from rendered templates
//!
//! A parse produces three things: the values of every regular header, the
//! order pseudo-headers appeared in, and the order regular headers appeared
//! in. `cookie` and `content-length` show up in the order list but never in
//! the values.

mod classify;
mod collector;

pub use classify::{classify_line, LineClass, SkipReason};
pub use collector::{parse_rendered_headers, HeaderCollector, ScanError};

use std::collections::HashMap;
use std::fmt;

/// Header name to every value it was given, in occurrence order
pub type HeaderMap = HashMap<String, Vec<String>>;

/// Reserved key holding the pseudo-header order in [`OrderedHeaders::into_header_map`]
pub const PSEUDO_HEADER_ORDER_KEY: &str = "PHeader-Order:";

/// Reserved key holding the regular header order in [`OrderedHeaders::into_header_map`]
pub const HEADER_ORDER_KEY: &str = "Header-Order:";

/// Headers with the exact order and casing they were written in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedHeaders {
    /// Values per exact (case-sensitive) header name
    pub values: HeaderMap,
    /// Pseudo-header names such as `:method`, in order
    pub pseudo_order: Vec<String>,
    /// Regular header names in order, one entry per occurrence
    /// (except `cookie`, which is listed once)
    pub header_order: Vec<String>,
}

impl OrderedHeaders {
    /// True when the template produced no header lines at all
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.pseudo_order.is_empty() && self.header_order.is_empty()
    }

    /// Values of a header, matched by exact name
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.values.get(name).map(Vec::as_slice)
    }

    /// Regular headers in wire order
    ///
    /// Each entry of the order list is paired with the next unused value of
    /// that name. Names without a value (`cookie`, `content-length`) are
    /// yielded with `None`.
    pub fn iter_ordered(&self) -> OrderedIter<'_> {
        OrderedIter {
            headers: self,
            position: 0,
            seen: HashMap::new(),
        }
    }

    /// Single-map form with the order lists under the reserved keys
    ///
    /// An order list is only inserted when it is non-empty.
    pub fn into_header_map(self) -> HeaderMap {
        let mut map = self.values;
        if !self.pseudo_order.is_empty() {
            map.insert(PSEUDO_HEADER_ORDER_KEY.to_string(), self.pseudo_order);
        }
        if !self.header_order.is_empty() {
            map.insert(HEADER_ORDER_KEY.to_string(), self.header_order);
        }
        map
    }
}

impl From<OrderedHeaders> for HeaderMap {
    fn from(headers: OrderedHeaders) -> Self {
        headers.into_header_map()
    }
}

/// Iterator returned by [`OrderedHeaders::iter_ordered`]
#[derive(Debug)]
pub struct OrderedIter<'a> {
    headers: &'a OrderedHeaders,
    position: usize,
    seen: HashMap<&'a str, usize>,
}

impl ExactSizeIterator for OrderedIter<'_> {}

impl<'a> Iterator for OrderedIter<'a> {
    type Item = (&'a str, Option<&'a str>);

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.headers.header_order.get(self.position)?.as_str();
        self.position += 1;

        let occurrence = self.seen.entry(name).or_insert(0);
        let value = self
            .headers
            .values
            .get(name)
            .and_then(|values| values.get(*occurrence))
            .map(String::as_str);
        *occurrence += 1;

        Some((name, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.headers.header_order.len() - self.position;
        (remaining, Some(remaining))
    }
}

/// Pseudo-header names one per line, then `Name: value` per regular header
impl fmt::Display for OrderedHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in &self.pseudo_order {
            writeln!(f, "{}", name)?;
        }
        for (name, value) in self.iter_ordered() {
            match value {
                Some(value) => writeln!(f, "{}: {}", name, value)?,
                None => writeln!(f, "{}", name)?,
            }
        }
        Ok(())
    }
}
