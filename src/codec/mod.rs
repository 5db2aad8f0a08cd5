//! Typed value codec
//!
//! Converts between the primitive tokens held by the relational store and
//! typed values, using field metadata:
//! - scalars: empty token is null
//! - multi-valued fields: JSON arrays, empty token is `[]`
//! - nested fields: separator-joined composite strings
//! - categorical fields: integer key <-> dictionary label
//!
//! `decode(encode(v)) == v` for every value type; the empty string is the
//! one exception and decodes to null.

mod errors;
mod escape;
mod typed;
mod value;

pub use errors::{CodecError, CodecErrorCode, CodecResult};
pub use escape::{escape, text_sort_key, unescape};
pub use typed::{decode_value, encode_value, ValueCodec};
pub use value::{format_real, Token, Value};
