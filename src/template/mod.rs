//! Template rendering for header templates
//!
//! The header parser only needs something that turns a template source and a
//! data value into text; that contract is the [`Renderer`] trait. The bundled
//! engine, [`TextTemplate`], understands the `{{ ... }}` action syntax header
//! templates are written in: field paths, string literals, `if`/`with`/`range`
//! blocks with `else`, comments and `{{-`/`-}}` trim markers.
//!
//! ```text
//! GET {{.Path}} HTTP/2
//! :authority: {{.Host}}
//! {{- if .Cookie}}
//! cookie: {{.Cookie}}
//! {{- end}}
//! {{range .Extra}}{{.}}
//! {{end}}
//! ```

mod ast;
mod exec;
mod grammar;
pub(crate) mod lexer;
mod segment;

pub use ast::{Block, BlockKind, Node, Pipeline, Spanned};
pub use exec::{to_template_data, ExecutionError, TemplateData};

use thiserror::Error;

use crate::error::TemplateSyntaxError;

/// Failure of either rendering phase
#[derive(Debug, Error)]
pub enum RenderError {
    /// The template source could not be compiled
    #[error(transparent)]
    Syntax(#[from] TemplateSyntaxError),

    /// The compiled template failed against the supplied data
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Substitutes data into a template source
pub trait Renderer {
    fn render(&self, source: &str, data: &TemplateData) -> Result<String, RenderError>;
}

impl<F> Renderer for F
where
    F: Fn(&str, &TemplateData) -> Result<String, RenderError>,
{
    fn render(&self, source: &str, data: &TemplateData) -> Result<String, RenderError> {
        self(source, data)
    }
}

/// A compiled template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// Compile template source
    pub fn parse(source: &str) -> Result<Self, TemplateSyntaxError> {
        let nodes = grammar::parse(source)?;
        Ok(Self { nodes })
    }

    /// Top-level nodes of the template
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Execute against `data`, which becomes the initial `.`
    pub fn execute(&self, data: &TemplateData) -> Result<String, ExecutionError> {
        let mut out = String::new();
        exec::execute(&self.nodes, data, &mut out)?;
        Ok(out)
    }
}

/// The bundled template engine
#[derive(Debug, Clone, Copy, Default)]
pub struct TextTemplate;

impl TextTemplate {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for TextTemplate {
    fn render(&self, source: &str, data: &TemplateData) -> Result<String, RenderError> {
        let template = Template::parse(source)?;
        tracing::trace!(nodes = template.nodes().len(), "compiled header template");
        Ok(template.execute(data)?)
    }
}
