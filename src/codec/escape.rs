//! Percent escaping of reserved characters in stored strings
//!
//! Only a fixed set is escaped: `:` `;` `=` `%` `,` CR LF TAB.

const ESCAPES: [(char, &str); 8] = [
    (':', "%3A"),
    (';', "%3B"),
    ('=', "%3D"),
    ('%', "%25"),
    (',', "%2C"),
    ('\r', "%0D"),
    ('\n', "%0A"),
    ('\t', "%09"),
];

/// Escapes reserved characters
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match ESCAPES.iter().find(|(reserved, _)| *reserved == c) {
            Some((_, code)) => out.push_str(code),
            None => out.push(c),
        }
    }
    out
}

/// Ordering key of stored text: unescaped, then uppercased per Unicode
pub fn text_sort_key(stored: &str) -> String {
    unescape(stored).to_uppercase()
}

/// Reverses `escape`. Percent sequences outside the reserved set are kept
/// verbatim; hex digits match case-insensitively.
pub fn unescape(s: &str) -> String {
    if !s.contains('%') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let candidate = rest.get(pos..pos + 3);
        match candidate.and_then(decode_sequence) {
            Some(c) => {
                out.push(c);
                rest = &rest[pos + 3..];
            }
            None => {
                out.push('%');
                rest = &rest[pos + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_sequence(seq: &str) -> Option<char> {
    ESCAPES
        .iter()
        .find(|(_, code)| code.eq_ignore_ascii_case(seq))
        .map(|(c, _)| *c)
}
