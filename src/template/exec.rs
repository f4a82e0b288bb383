//! Template execution against a data value

use std::borrow::Cow;

use serde::ser::{self, Impossible, Serialize};
use thiserror::Error;
use toml::Value;

use crate::error::{format_report, Span};
use crate::template::ast::{Block, BlockKind, Node, Pipeline, Spanned};

/// Data a template is executed against; `.` starts out as this value
pub type TemplateData = Value;

/// Convert caller data into a template value
///
/// Data that serializes as nothing (`()`, `None`, a unit struct) becomes an
/// empty table, so templates without actions still render. `None` fields
/// inside structs are dropped and read as missing keys.
pub fn to_template_data<T>(data: &T) -> Result<TemplateData, ExecutionError>
where
    T: Serialize + ?Sized,
{
    if data.serialize(NilCheck).unwrap_or(false) {
        return Ok(Value::Table(toml::Table::new()));
    }
    Ok(Value::try_from(data)?)
}

/// Serializer answering whether a value is unit or `None`
struct NilCheck;

macro_rules! not_nil {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method(self, _: $ty) -> Result<bool, toml::ser::Error> {
                Ok(false)
            }
        )*
    };
}

fn compound() -> toml::ser::Error {
    ser::Error::custom("compound value")
}

impl ser::Serializer for NilCheck {
    type Ok = bool;
    type Error = toml::ser::Error;
    type SerializeSeq = Impossible<bool, toml::ser::Error>;
    type SerializeTuple = Impossible<bool, toml::ser::Error>;
    type SerializeTupleStruct = Impossible<bool, toml::ser::Error>;
    type SerializeTupleVariant = Impossible<bool, toml::ser::Error>;
    type SerializeMap = Impossible<bool, toml::ser::Error>;
    type SerializeStruct = Impossible<bool, toml::ser::Error>;
    type SerializeStructVariant = Impossible<bool, toml::ser::Error>;

    not_nil! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
    }

    fn serialize_none(self) -> Result<bool, toml::ser::Error> {
        Ok(true)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<bool, toml::ser::Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<bool, toml::ser::Error> {
        Ok(true)
    }

    fn serialize_unit_struct(self, _: &'static str) -> Result<bool, toml::ser::Error> {
        Ok(true)
    }

    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
    ) -> Result<bool, toml::ser::Error> {
        Ok(false)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<bool, toml::ser::Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: &T,
    ) -> Result<bool, toml::ser::Error> {
        Ok(false)
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self::SerializeSeq, toml::ser::Error> {
        Err(compound())
    }

    fn serialize_tuple(self, _: usize) -> Result<Self::SerializeTuple, toml::ser::Error> {
        Err(compound())
    }

    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleStruct, toml::ser::Error> {
        Err(compound())
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant, toml::ser::Error> {
        Err(compound())
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self::SerializeMap, toml::ser::Error> {
        Err(compound())
    }

    fn serialize_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStruct, toml::ser::Error> {
        Err(compound())
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant, toml::ser::Error> {
        Err(compound())
    }
}

/// Errors that can occur while executing a compiled template
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Field lookup on a table that has no such key
    #[error("map has no entry for key \"{field}\" at {span:?}")]
    MissingField { field: String, span: Span },

    /// Field lookup on something that is not a table
    #[error("can't evaluate field {field} in type {kind} at {span:?}")]
    NotATable {
        field: String,
        kind: &'static str,
        span: Span,
    },

    /// `range` over a scalar
    #[error("range can't iterate over {kind} at {span:?}")]
    NotIterable { kind: &'static str, span: Span },

    /// Caller data that has no template value representation
    #[error("template data is not representable: {0}")]
    Data(#[from] toml::ser::Error),
}

impl ExecutionError {
    /// Source range of the failing action, if the error came from one
    pub fn span(&self) -> Option<&Span> {
        match self {
            Self::MissingField { span, .. }
            | Self::NotATable { span, .. }
            | Self::NotIterable { span, .. } => Some(span),
            Self::Data(_) => None,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        match self.span() {
            Some(span) => format_report(
                source,
                filename,
                span,
                "template execution error",
                &self.to_string(),
            ),
            None => self.to_string(),
        }
    }
}

/// Execute `nodes` with `dot` as the current value, appending to `out`
pub fn execute(nodes: &[Node], dot: &Value, out: &mut String) -> Result<(), ExecutionError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Output(pipeline) => {
                let value = evaluate(pipeline, dot)?;
                write_value(out, &value);
            }
            Node::Block(block) => execute_block(block, dot, out)?,
        }
    }
    Ok(())
}

fn execute_block(block: &Block, dot: &Value, out: &mut String) -> Result<(), ExecutionError> {
    // An absent key guarding a block is empty, not an error
    let value = match evaluate(&block.pipeline, dot) {
        Ok(value) => value,
        Err(ExecutionError::MissingField { field, .. }) => {
            tracing::trace!(%field, keyword = block.kind.keyword(), "block pipeline has no value");
            return execute(&block.else_body, dot, out);
        }
        Err(err) => return Err(err),
    };

    match block.kind {
        BlockKind::If if is_true(&value) => execute(&block.body, dot, out),
        BlockKind::With if is_true(&value) => execute(&block.body, &value, out),
        BlockKind::If | BlockKind::With => execute(&block.else_body, dot, out),
        BlockKind::Range => {
            let items: Vec<&Value> = match value.as_ref() {
                Value::Array(items) => items.iter().collect(),
                Value::Table(table) => table.values().collect(),
                other => {
                    return Err(ExecutionError::NotIterable {
                        kind: type_name(other),
                        span: block.pipeline.span.clone(),
                    })
                }
            };

            if items.is_empty() {
                return execute(&block.else_body, dot, out);
            }
            for item in items {
                execute(&block.body, item, out)?;
            }
            Ok(())
        }
    }
}

fn evaluate<'v>(pipeline: &Spanned<Pipeline>, dot: &'v Value) -> Result<Cow<'v, Value>, ExecutionError> {
    match &pipeline.node {
        Pipeline::Dot => Ok(Cow::Borrowed(dot)),
        Pipeline::Literal(s) => Ok(Cow::Owned(Value::String(s.clone()))),
        Pipeline::Field(path) => {
            let mut current = dot;
            for field in path {
                current = match current {
                    Value::Table(table) => {
                        table
                            .get(field)
                            .ok_or_else(|| ExecutionError::MissingField {
                                field: field.clone(),
                                span: pipeline.span.clone(),
                            })?
                    }
                    other => {
                        return Err(ExecutionError::NotATable {
                            field: field.clone(),
                            kind: type_name(other),
                            span: pipeline.span.clone(),
                        })
                    }
                };
            }
            Ok(Cow::Borrowed(current))
        }
    }
}

/// Emptiness as `if`, `with` and `range` see it
fn is_true(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.is_empty(),
        Value::Integer(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Boolean(b) => *b,
        Value::Datetime(_) => true,
        Value::Array(items) => !items.is_empty(),
        Value::Table(table) => !table.is_empty(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Integer(_) => "integer",
        Value::Float(_) => "float",
        Value::Boolean(_) => "boolean",
        Value::Datetime(_) => "datetime",
        Value::Array(_) => "array",
        Value::Table(_) => "table",
    }
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Integer(i) => out.push_str(&i.to_string()),
        Value::Float(f) => write_float(out, *f),
        Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Datetime(d) => out.push_str(&d.to_string()),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Table(table) => {
            out.push_str("map[");
            for (i, (key, item)) in table.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(key);
                out.push(':');
                write_value(out, item);
            }
            out.push(']');
        }
    }
}

/// Shortest float text, switching to `1e+06` style outside `[1e-4, 1e6)`
fn write_float(out: &mut String, f: f64) {
    if f.is_nan() {
        out.push_str("NaN");
        return;
    }
    if f.is_infinite() {
        out.push_str(if f > 0.0 { "+Inf" } else { "-Inf" });
        return;
    }

    let scientific = format!("{:e}", f);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        out.push_str(&f.to_string());
        return;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if f == 0.0 || (-4..6).contains(&exponent) {
        out.push_str(&f.to_string());
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        out.push_str(&format!("{mantissa}e{sign}{:02}", exponent.abs()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::grammar::parse;

    fn run(source: &str, data: &str) -> Result<String, ExecutionError> {
        let nodes = parse(source).expect("should parse");
        let data: Value = Value::Table(toml::from_str(data).expect("valid toml"));
        let mut out = String::new();
        execute(&nodes, &data, &mut out)?;
        Ok(out)
    }

    #[test]
    fn test_field_substitution() {
        let out = run("Host: {{.Host}}", r#"Host = "example.com""#).unwrap();
        assert_eq!(out, "Host: example.com");
    }

    #[test]
    fn test_nested_field() {
        let out = run("{{.Request.Path}}", "[Request]\nPath = \"/index\"").unwrap();
        assert_eq!(out, "/index");
    }

    #[test]
    fn test_scalar_formatting() {
        let out = run("{{.N}} {{.F}} {{.B}} {{.L}}", "N = 3\nF = 1.5\nB = true\nL = [1, \"a\"]").unwrap();
        assert_eq!(out, "3 1.5 true [1 a]");
    }

    #[test]
    fn test_table_formatting() {
        let out = run("{{.T}}", "[T]\nb = 2\na = 1").unwrap();
        assert_eq!(out, "map[a:1 b:2]");
    }

    #[test]
    fn test_if_else() {
        let src = "{{if .Cookie}}cookie: {{.Cookie}}{{else}}none{{end}}";
        assert_eq!(run(src, r#"Cookie = "a=1""#).unwrap(), "cookie: a=1");
        assert_eq!(run(src, r#"Cookie = """#).unwrap(), "none");
    }

    #[test]
    fn test_with_rebinds_dot() {
        let out = run("{{with .Client}}{{.Name}}{{end}}", "[Client]\nName = \"chrome\"").unwrap();
        assert_eq!(out, "chrome");
    }

    #[test]
    fn test_with_else_keeps_dot() {
        let out = run("{{with .Empty}}x{{else}}{{.Name}}{{end}}", "Empty = 0\nName = \"n\"").unwrap();
        assert_eq!(out, "n");
    }

    #[test]
    fn test_range_array() {
        let out = run("{{range .Items}}[{{.}}]{{end}}", r#"Items = ["a", "b"]"#).unwrap();
        assert_eq!(out, "[a][b]");
    }

    #[test]
    fn test_range_empty_runs_else() {
        let out = run("{{range .Items}}x{{else}}empty{{end}}", "Items = []").unwrap();
        assert_eq!(out, "empty");
    }

    #[test]
    fn test_missing_field() {
        let err = run("Host: {{.Host}}", "").unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::MissingField { ref field, ref span } if field == "Host" && *span == (8..13)
        ));
    }

    #[test]
    fn test_missing_key_in_block_takes_else() {
        assert_eq!(run("{{if .Cookie}}c{{else}}none{{end}}", "").unwrap(), "none");
        assert_eq!(run("{{with .Origin}}{{.}}{{end}}", "").unwrap(), "");
        assert_eq!(run("{{range .Extra}}x{{else}}empty{{end}}", "").unwrap(), "empty");
        assert_eq!(run("{{if .A.B}}x{{else}}y{{end}}", "[A]").unwrap(), "y");
    }

    #[test]
    fn test_block_on_scalar_field_still_fails() {
        let err = run("{{if .Host.Name}}x{{end}}", r#"Host = "x""#).unwrap_err();
        assert!(matches!(err, ExecutionError::NotATable { .. }));
    }

    #[test]
    fn test_float_formatting() {
        let out = run(
            "{{.A}} {{.B}} {{.C}} {{.D}} {{.E}} {{.F}} {{.G}}",
            "A = 1e21\nB = 1e6\nC = 123456.0\nD = 1.5e-7\nE = 0.0001\nF = -2.5e10\nG = 0.0",
        )
        .unwrap();
        assert_eq!(out, "1e+21 1e+06 123456 1.5e-07 0.0001 -2.5e+10 0");
    }

    #[test]
    fn test_nil_data_is_empty_table() {
        let empty = Value::Table(toml::Table::new());
        assert_eq!(to_template_data(&()).unwrap(), empty);
        assert_eq!(to_template_data(&None::<u8>).unwrap(), empty);
        assert_eq!(to_template_data(&Some(())).unwrap(), empty);
        assert_eq!(to_template_data("x").unwrap(), Value::String("x".to_string()));
    }

    #[test]
    fn test_field_on_scalar() {
        let err = run("{{.Host.Name}}", r#"Host = "x""#).unwrap_err();
        assert!(matches!(err, ExecutionError::NotATable { kind: "string", .. }));
    }

    #[test]
    fn test_range_over_scalar() {
        let err = run("{{range .N}}{{end}}", "N = 1").unwrap_err();
        assert!(matches!(err, ExecutionError::NotIterable { kind: "integer", .. }));
    }

    #[test]
    fn test_format_points_at_action() {
        let source = "GET / HTTP/2\nHost: {{.Host}}\n";
        let err = run(source, "").unwrap_err();
        let report = err.format(source, "req.tmpl");
        assert!(report.contains("template execution error"));
        assert!(report.contains("Host"));
    }
}
