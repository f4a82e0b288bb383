//! Header Template - ordered HTTP header sets from text templates
//!
//! Clients that reproduce a browser's exact header sequence describe each
//! request as a template: a request line followed by `name: value` lines,
//! pseudo-headers included. This library renders such a template with data
//! and parses the result into [`OrderedHeaders`]: header values plus the
//! exact order (and casing) of pseudo-headers and regular headers.
//!
//! # Example
//!
//! ```rust
//! use header_template::parse_header_template;
//! use std::collections::BTreeMap;
//!
//! let source = "GET / HTTP/2\n:method: GET\n:path: /\nHost: {{.Host}}\n";
//! let data = BTreeMap::from([("Host", "example.com")]);
//!
//! let headers = parse_header_template(source, &data).unwrap();
//! assert_eq!(headers.pseudo_order, vec![":method", ":path"]);
//! assert_eq!(headers.header_order, vec!["Host"]);
//! assert_eq!(headers.get("Host"), Some(&["example.com".to_string()][..]));
//! ```

pub mod config;
pub mod error;
pub mod headers;
pub mod template;

pub use config::{ConfigError, ParseConfig};
pub use error::TemplateSyntaxError;
pub use headers::{
    parse_rendered_headers, HeaderMap, OrderedHeaders, ScanError, HEADER_ORDER_KEY,
    PSEUDO_HEADER_ORDER_KEY,
};
pub use template::{
    to_template_data, ExecutionError, RenderError, Renderer, TemplateData, TextTemplate,
};

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while turning a header template into headers
#[derive(Debug, Error)]
pub enum HeaderTemplateError {
    /// The template source could not be compiled; nothing was rendered
    #[error("failed to parse template string: {0}")]
    TemplateSyntax(#[from] TemplateSyntaxError),

    /// Rendering failed against the supplied data
    #[error("failed to execute template: {0}")]
    TemplateExecution(#[from] ExecutionError),

    /// Reading the rendered lines failed
    #[error("error scanning lines from processed template: {0}")]
    Scan(#[from] ScanError),
}

impl From<RenderError> for HeaderTemplateError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Syntax(err) => HeaderTemplateError::TemplateSyntax(err),
            RenderError::Execution(err) => HeaderTemplateError::TemplateExecution(err),
        }
    }
}

impl HeaderTemplateError {
    /// Format the error with source context where the error has a location
    pub fn format(&self, source: &str, filename: &str) -> String {
        match self {
            HeaderTemplateError::TemplateSyntax(err) => err.format(source, filename),
            HeaderTemplateError::TemplateExecution(err) => err.format(source, filename),
            HeaderTemplateError::Scan(_) => self.to_string(),
        }
    }
}

/// Render a header template with `data` and parse the ordered headers
///
/// This is the main entry point for the library. `data` can be any
/// serializable value; its fields are reachable from the template as `.Name`.
/// `()` and `None` render as an empty table, and a `None` field reads as an
/// empty value in `if`, `with` and `range`.
pub fn parse_header_template<T>(source: &str, data: &T) -> Result<OrderedHeaders, HeaderTemplateError>
where
    T: Serialize + ?Sized,
{
    parse_header_template_with_config(source, data, &ParseConfig::default())
}

/// Render and parse a header template with custom configuration
///
/// # Example
///
/// ```rust
/// use header_template::{parse_header_template_with_config, ParseConfig};
/// use std::collections::BTreeMap;
///
/// let config = ParseConfig::new().with_suppress_content_length(false);
/// let data: BTreeMap<String, String> = BTreeMap::new();
///
/// let headers =
///     parse_header_template_with_config("POST / HTTP/2\nContent-Length: 2\n", &data, &config)
///         .unwrap();
/// assert_eq!(headers.get("Content-Length"), Some(&["2".to_string()][..]));
/// ```
pub fn parse_header_template_with_config<T>(
    source: &str,
    data: &T,
    config: &ParseConfig,
) -> Result<OrderedHeaders, HeaderTemplateError>
where
    T: Serialize + ?Sized,
{
    let data = to_template_data(data)?;
    parse_header_template_with(&TextTemplate::new(), source, &data, config)
}

/// Render with any [`Renderer`] and parse the ordered headers
pub fn parse_header_template_with<R>(
    renderer: &R,
    source: &str,
    data: &TemplateData,
    config: &ParseConfig,
) -> Result<OrderedHeaders, HeaderTemplateError>
where
    R: Renderer + ?Sized,
{
    let rendered = renderer.render(source, data)?;
    tracing::debug!(bytes = rendered.len(), "rendered header template");

    let headers = parse_rendered_headers(rendered.as_bytes(), config)?;
    Ok(headers)
}
