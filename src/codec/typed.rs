//! Typed value codec
//!
//! Decoding dispatches first on cardinality (scalar vs. multi-valued), then
//! on value type. Encoding is the exact inverse and produces the tokens the
//! relational store keeps.

use crate::metadata::{FieldId, FieldMetadata, FieldShape, MetadataGraph, ValueType};

use super::errors::{CodecError, CodecResult};
use super::escape::{escape, unescape};
use super::value::{format_real, Token, Value};

/// Historical sentinel for an empty character
const EMPTY_CHARACTER: &str = "..";

/// Decodes a token according to a non-nested shape
pub fn decode_value(shape: FieldShape<'_>, token: &Token) -> CodecResult<Value> {
    if shape.is_multi() {
        decode_multi(shape, token)
    } else {
        decode_scalar(shape, token)
    }
}

/// Encodes a value according to a non-nested shape
pub fn encode_value(shape: FieldShape<'_>, value: &Value) -> CodecResult<Token> {
    if shape.is_multi() {
        encode_multi(shape, value)
    } else {
        encode_scalar(shape, value)
    }
}

fn decode_multi(shape: FieldShape<'_>, token: &Token) -> CodecResult<Value> {
    if token.is_empty() {
        return Ok(Value::Array(Vec::new()));
    }
    let element = shape.element();
    match token {
        Token::Text(s) if s.trim_start().starts_with('[') => {
            let items: Vec<serde_json::Value> = serde_json::from_str(s)
                .map_err(|_| CodecError::invalid_token("JSON array", s))?;
            items
                .iter()
                .map(|item| decode_scalar(element, &json_token(item)?))
                .collect::<CodecResult<Vec<_>>>()
                .map(Value::Array)
        }
        _ => Ok(Value::Array(vec![decode_scalar(element, token)?])),
    }
}

fn json_token(item: &serde_json::Value) -> CodecResult<Token> {
    match item {
        serde_json::Value::Null => Ok(Token::Null),
        serde_json::Value::Bool(b) => Ok(Token::Integer(i64::from(*b))),
        serde_json::Value::Number(n) => Ok(match n.as_i64() {
            Some(i) => Token::Integer(i),
            None => Token::Real(n.as_f64().unwrap_or(f64::NAN)),
        }),
        serde_json::Value::String(s) => Ok(Token::Text(s.clone())),
        other => Err(CodecError::invalid_token("array element", other)),
    }
}

/// Parses `INF`, `INFINITY`, `-INF`, `-INFINITY` and `NAN` (any case)
fn special_number(s: &str) -> Option<f64> {
    match s.to_ascii_uppercase().as_str() {
        "INF" | "INFINITY" | "+INF" | "+INFINITY" => Some(f64::INFINITY),
        "-INF" | "-INFINITY" => Some(f64::NEG_INFINITY),
        "NAN" => Some(f64::NAN),
        _ => None,
    }
}

fn decode_scalar(shape: FieldShape<'_>, token: &Token) -> CodecResult<Value> {
    if token.is_empty() {
        return Ok(Value::Null);
    }
    match shape.value_type {
        ValueType::Character => {
            let text = token.to_text();
            if text == EMPTY_CHARACTER {
                return Ok(Value::Null);
            }
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(CodecError::invalid_token("CHARACTER", &text)),
            }
        }
        ValueType::String => Ok(Value::String(unescape(&token.to_text()))),
        ValueType::Integer => match token {
            Token::Integer(n) => Ok(Value::Integer(*n)),
            Token::Real(f) if !f.is_finite() => Ok(Value::Float(*f)),
            Token::Real(f) if f.fract() == 0.0 => Ok(Value::Integer(*f as i64)),
            Token::Text(s) => special_number(s)
                .map(Value::Float)
                .or_else(|| s.trim().parse::<i64>().ok().map(Value::Integer))
                .ok_or_else(|| CodecError::invalid_token("INTEGER", s)),
            other => Err(CodecError::invalid_token("INTEGER", other)),
        },
        ValueType::Float => match token {
            Token::Integer(n) => Ok(Value::Float(*n as f64)),
            Token::Real(f) => Ok(Value::Float(*f)),
            Token::Text(s) => special_number(s)
                .or_else(|| s.trim().parse::<f64>().ok())
                .map(Value::Float)
                .ok_or_else(|| CodecError::invalid_token("FLOAT", s)),
            Token::Null => Ok(Value::Null),
        },
        ValueType::Flag => match token.to_text().as_str() {
            "1" => Ok(Value::Bool(true)),
            "0" => Ok(Value::Bool(false)),
            other => Err(CodecError::invalid_token("FLAG", other)),
        },
        ValueType::Categorical => {
            let key = token
                .as_i64()
                .ok_or_else(|| CodecError::invalid_token("CATEGORICAL key", token))?;
            Ok(shape
                .categories
                .and_then(|cats| cats.label(key))
                .map(|label| Value::String(label.to_string()))
                .unwrap_or(Value::Null))
        }
    }
}

fn encode_multi(shape: FieldShape<'_>, value: &Value) -> CodecResult<Token> {
    let items = match value {
        Value::Null => return Ok(Token::Null),
        Value::Array(items) => items,
        other => return Err(CodecError::type_mismatch("array", other.type_name())),
    };
    let element = shape.element();
    let json = items
        .iter()
        .map(|item| encode_scalar(element, item).map(token_json))
        .collect::<CodecResult<Vec<_>>>()?;
    serde_json::to_string(&json)
        .map(Token::Text)
        .map_err(|e| CodecError::invalid_token("JSON array", e.to_string()))
}

fn token_json(token: Token) -> serde_json::Value {
    match token {
        Token::Null => serde_json::Value::Null,
        Token::Integer(n) => n.into(),
        Token::Real(f) if f.is_finite() => f.into(),
        Token::Real(f) => format_real(f).into(),
        Token::Text(s) => s.into(),
    }
}

fn encode_scalar(shape: FieldShape<'_>, value: &Value) -> CodecResult<Token> {
    if value.is_null() {
        return Ok(Token::Null);
    }
    let mismatch = || CodecError::type_mismatch(shape.value_type.as_str(), value.type_name());
    match shape.value_type {
        ValueType::Character => match value {
            Value::Char(c) => Ok(Token::Text(escape(&c.to_string()))),
            Value::String(s) if s.chars().count() == 1 => Ok(Token::Text(escape(s))),
            _ => Err(mismatch()),
        },
        ValueType::String => value
            .as_text()
            .map(|s| Token::Text(escape(&s)))
            .ok_or_else(mismatch),
        ValueType::Integer => match value {
            Value::Integer(n) => Ok(Token::Integer(*n)),
            Value::Float(f) if f.is_nan() => Ok(Token::Text(format_real(*f))),
            Value::Float(f) if f.is_infinite() => Ok(Token::Real(*f)),
            Value::Float(f) if f.fract() == 0.0 => Ok(Token::Integer(*f as i64)),
            _ => Err(mismatch()),
        },
        ValueType::Float => match value {
            Value::Float(f) if f.is_nan() => Ok(Token::Text(format_real(*f))),
            Value::Float(f) => Ok(Token::Real(*f)),
            Value::Integer(n) => Ok(Token::Real(*n as f64)),
            _ => Err(mismatch()),
        },
        ValueType::Flag => match value {
            Value::Bool(b) => Ok(Token::Integer(i64::from(*b))),
            _ => Err(mismatch()),
        },
        ValueType::Categorical => {
            let label = value.as_text().ok_or_else(mismatch)?;
            shape
                .categories
                .and_then(|cats| cats.key(&label))
                .map(Token::Integer)
                .ok_or_else(|| CodecError::type_mismatch("known category label", &label))
        }
    }
}

/// Field-level codec aware of nested (composite) fields
#[derive(Debug, Clone, Copy)]
pub struct ValueCodec<'g> {
    graph: &'g MetadataGraph,
}

impl<'g> ValueCodec<'g> {
    pub fn new(graph: &'g MetadataGraph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &'g MetadataGraph {
        self.graph
    }

    /// Decodes the stored token of a field. Nested fields are split on
    /// their separator into one object per composite string.
    pub fn decode(&self, id: FieldId, token: &Token) -> CodecResult<Value> {
        let field = self.graph.field(id);
        let result = match &field.nested {
            None => decode_value(field.shape(), token),
            Some(_) if field.cardinality.is_multi() => self.decode_composites(field, token),
            Some(_) if token.is_empty() => Ok(Value::Null),
            Some(_) => self.decode_composite(field, &token.to_text()),
        };
        result.map_err(|e| e.at(self.graph.path(id)))
    }

    /// Encodes a field value into its stored token
    pub fn encode(&self, id: FieldId, value: &Value) -> CodecResult<Token> {
        let field = self.graph.field(id);
        let result = match &field.nested {
            None => encode_value(field.shape(), value),
            Some(_) if field.cardinality.is_multi() => match value {
                Value::Null => Ok(Token::Null),
                Value::Array(items) => items
                    .iter()
                    .map(|item| self.encode_composite(field, item).map(serde_json::Value::from))
                    .collect::<CodecResult<Vec<_>>>()
                    .and_then(|parts| {
                        serde_json::to_string(&parts).map_err(|e| {
                            CodecError::invalid_token("JSON array", e.to_string())
                        })
                    })
                    .map(Token::Text),
                other => Err(CodecError::type_mismatch("array", other.type_name())),
            },
            Some(_) if value.is_null() => Ok(Token::Null),
            Some(_) => self.encode_composite(field, value).map(Token::Text),
        };
        result.map_err(|e| e.at(self.graph.path(id)))
    }

    fn decode_composites(&self, field: &FieldMetadata, token: &Token) -> CodecResult<Value> {
        if token.is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        let text = token.to_text();
        if !text.trim_start().starts_with('[') {
            return Ok(Value::Array(vec![self.decode_composite(field, &text)?]));
        }
        let parts: Vec<Option<String>> = serde_json::from_str(&text)
            .map_err(|_| CodecError::invalid_token("JSON array of composites", &text))?;
        parts
            .iter()
            .map(|part| match part {
                Some(s) => self.decode_composite(field, s),
                None => Ok(Value::Null),
            })
            .collect::<CodecResult<Vec<_>>>()
            .map(Value::Array)
    }

    fn decode_composite(&self, field: &FieldMetadata, text: &str) -> CodecResult<Value> {
        let (separator, children) = match &field.nested {
            Some(nested) => (nested.separator.as_str(), nested.children.as_slice()),
            None => return decode_value(field.shape(), &Token::Text(text.to_string())),
        };
        let parts: Vec<&str> = text.split(separator).collect();
        if parts.len() != children.len() {
            return Err(CodecError::invalid_token(
                &format!("{} parts separated by '{}'", children.len(), separator),
                text,
            ));
        }
        children
            .iter()
            .zip(parts)
            .map(|(child, part)| {
                let meta = self.graph.field(*child);
                decode_value(meta.shape(), &Token::Text(part.to_string()))
                    .map(|v| (meta.id.clone(), v))
                    .map_err(|e| e.at(self.graph.path(*child)))
            })
            .collect::<CodecResult<Vec<_>>>()
            .map(Value::Object)
    }

    fn encode_composite(&self, field: &FieldMetadata, value: &Value) -> CodecResult<String> {
        let nested = match (&field.nested, value) {
            (Some(nested), Value::Object(_)) => nested,
            _ => return Err(CodecError::type_mismatch("object", value.type_name())),
        };
        let parts = nested
            .children
            .iter()
            .map(|child| {
                let meta = self.graph.field(*child);
                let member = value.get(&meta.id).unwrap_or(&Value::Null);
                encode_value(meta.shape(), member)
                    .map(|token| token.to_text())
                    .map_err(|e| e.at(self.graph.path(*child)))
            })
            .collect::<CodecResult<Vec<_>>>()?;
        Ok(parts.join(&nested.separator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecErrorCode;
    use crate::metadata::{Categories, CategoryDescriptor, FieldDescriptor};

    fn scalar(value_type: ValueType) -> FieldShape<'static> {
        FieldShape::scalar(value_type)
    }

    fn text(s: &str) -> Token {
        Token::Text(s.to_string())
    }

    #[test]
    fn test_scalar_empty_is_null() {
        for vt in [
            ValueType::Character,
            ValueType::String,
            ValueType::Integer,
            ValueType::Float,
            ValueType::Flag,
            ValueType::Categorical,
        ] {
            assert_eq!(decode_value(scalar(vt), &Token::Null).unwrap(), Value::Null);
            assert_eq!(decode_value(scalar(vt), &text("")).unwrap(), Value::Null);
        }
    }

    #[test]
    fn test_character() {
        let shape = scalar(ValueType::Character);
        assert_eq!(decode_value(shape, &text("A")).unwrap(), Value::Char('A'));
        assert_eq!(decode_value(shape, &text("..")).unwrap(), Value::Null);
        let err = decode_value(shape, &text("AB")).unwrap_err();
        assert_eq!(err.code(), CodecErrorCode::InvalidToken);
    }

    #[test]
    fn test_string_unescaped() {
        let shape = scalar(ValueType::String);
        assert_eq!(
            decode_value(shape, &text("a%3Bb%2cc")).unwrap(),
            Value::from("a;b,c")
        );
    }

    #[test]
    fn test_special_numbers() {
        let shape = scalar(ValueType::Float);
        assert_eq!(
            decode_value(shape, &text("inf")).unwrap(),
            Value::Float(f64::INFINITY)
        );
        assert_eq!(
            decode_value(shape, &text("-Infinity")).unwrap(),
            Value::Float(f64::NEG_INFINITY)
        );
        match decode_value(shape, &text("NaN")).unwrap() {
            Value::Float(f) => assert!(f.is_nan()),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            decode_value(scalar(ValueType::Integer), &text("-INF")).unwrap(),
            Value::Float(f64::NEG_INFINITY)
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            decode_value(scalar(ValueType::Integer), &Token::Integer(7)).unwrap(),
            Value::Integer(7)
        );
        assert_eq!(
            decode_value(scalar(ValueType::Integer), &text("12")).unwrap(),
            Value::Integer(12)
        );
        assert_eq!(
            decode_value(scalar(ValueType::Float), &Token::Integer(2)).unwrap(),
            Value::Float(2.0)
        );
        assert!(decode_value(scalar(ValueType::Integer), &text("twelve")).is_err());
        assert!(decode_value(scalar(ValueType::Float), &text("1.2.3")).is_err());
    }

    #[test]
    fn test_flag() {
        let shape = scalar(ValueType::Flag);
        assert_eq!(decode_value(shape, &Token::Integer(1)).unwrap(), Value::Bool(true));
        assert_eq!(decode_value(shape, &text("0")).unwrap(), Value::Bool(false));
        assert!(decode_value(shape, &text("true")).is_err());
        assert!(decode_value(shape, &Token::Integer(2)).is_err());
    }

    #[test]
    fn test_categorical() {
        let cats = Categories::from_descriptors(
            "IMPACT",
            &[CategoryDescriptor {
                key: 3,
                label: "HIGH".to_string(),
                description: None,
            }],
        )
        .unwrap();
        let shape = FieldShape {
            value_type: ValueType::Categorical,
            cardinality: crate::metadata::Cardinality::Number(1),
            categories: Some(&cats),
        };
        assert_eq!(decode_value(shape, &Token::Integer(3)).unwrap(), Value::from("HIGH"));
        assert_eq!(decode_value(shape, &Token::Integer(4)).unwrap(), Value::Null);
        assert_eq!(encode_value(shape, &Value::from("HIGH")).unwrap(), Token::Integer(3));
        assert!(encode_value(shape, &Value::from("LOW")).is_err());
    }

    #[test]
    fn test_multi_values() {
        let shape = FieldShape::array(ValueType::Integer);
        assert_eq!(decode_value(shape, &Token::Null).unwrap(), Value::Array(vec![]));
        assert_eq!(
            decode_value(shape, &text("[1,null,\"INF\"]")).unwrap(),
            Value::Array(vec![
                Value::Integer(1),
                Value::Null,
                Value::Float(f64::INFINITY)
            ])
        );
        assert_eq!(
            decode_value(shape, &Token::Integer(5)).unwrap(),
            Value::Array(vec![Value::Integer(5)])
        );
        assert!(decode_value(shape, &text("[1,")).is_err());
    }

    #[test]
    fn test_encode_scalar_tokens() {
        assert_eq!(
            encode_value(scalar(ValueType::Float), &Value::Float(f64::INFINITY)).unwrap(),
            Token::Real(f64::INFINITY)
        );
        assert_eq!(
            encode_value(scalar(ValueType::Float), &Value::Float(f64::NAN)).unwrap(),
            text("NaN")
        );
        assert_eq!(
            encode_value(scalar(ValueType::String), &Value::from("a=b")).unwrap(),
            text("a%3Db")
        );
        assert_eq!(
            encode_value(scalar(ValueType::Flag), &Value::Bool(true)).unwrap(),
            Token::Integer(1)
        );
        assert!(encode_value(scalar(ValueType::Integer), &Value::from("x")).is_err());
    }

    #[test]
    fn test_encode_arrays() {
        let shape = FieldShape::array(ValueType::Float);
        let token = encode_value(
            shape,
            &Value::Array(vec![Value::Float(0.5), Value::Float(f64::NEG_INFINITY), Value::Null]),
        )
        .unwrap();
        assert_eq!(token, text("[0.5,\"-Infinity\",null]"));
        assert_eq!(
            encode_value(shape, &Value::Array(vec![])).unwrap(),
            text("[]")
        );
        assert_eq!(encode_value(shape, &Value::Null).unwrap(), Token::Null);
    }

    fn csq_graph() -> MetadataGraph {
        MetadataGraph::build(&[
            FieldDescriptor::format("ANN", "STRING")
                .with_number("OTHER", None)
                .with_nested("|"),
            FieldDescriptor::format("Gene", "STRING").with_parent("ANN"),
            FieldDescriptor::format("Score", "FLOAT").with_parent("ANN"),
            FieldDescriptor::format("PAIR", "STRING").with_nested(":"),
            FieldDescriptor::format("L", "STRING").with_parent("PAIR"),
            FieldDescriptor::format("R", "INTEGER").with_parent("PAIR"),
        ])
        .unwrap()
    }

    #[test]
    fn test_nested_decode() {
        let graph = csq_graph();
        let codec = ValueCodec::new(&graph);
        let ann = graph.format("ANN").unwrap();

        let value = codec
            .decode(ann, &text(r#"["BRCA1|0.5","TP53|"]"#))
            .unwrap();
        assert_eq!(
            value,
            Value::Array(vec![
                Value::object([("Gene", Value::from("BRCA1")), ("Score", Value::Float(0.5))]),
                Value::object([("Gene", Value::from("TP53")), ("Score", Value::Null)]),
            ])
        );

        let pair = graph.format("PAIR").unwrap();
        assert_eq!(
            codec.decode(pair, &text("x%3Ay:3")).unwrap(),
            Value::object([("L", Value::from("x:y")), ("R", Value::Integer(3))])
        );
        assert_eq!(codec.decode(pair, &Token::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_nested_part_count_mismatch() {
        let graph = csq_graph();
        let codec = ValueCodec::new(&graph);
        let ann = graph.format("ANN").unwrap();
        let err = codec.decode(ann, &text(r#"["BRCA1|0.5|x"]"#)).unwrap_err();
        assert_eq!(err.code(), CodecErrorCode::InvalidToken);
        assert_eq!(err.field(), Some("FORMAT/ANN"));
    }

    #[test]
    fn test_nested_encode_inverse() {
        let graph = csq_graph();
        let codec = ValueCodec::new(&graph);
        let ann = graph.format("ANN").unwrap();
        let value = Value::Array(vec![Value::object([
            ("Gene", Value::from("BRCA2")),
            ("Score", Value::Float(1.25)),
        ])]);
        let token = codec.encode(ann, &value).unwrap();
        assert_eq!(token, text(r#"["BRCA2|1.25"]"#));
        assert_eq!(codec.decode(ann, &token).unwrap(), value);

        let pair = graph.format("PAIR").unwrap();
        let value = Value::object([("L", Value::from("k")), ("R", Value::Integer(9))]);
        let token = codec.encode(pair, &value).unwrap();
        assert_eq!(codec.decode(pair, &token).unwrap(), value);
    }
}
