//! Parameter sets parsed from query strings.

use std::fmt;

/// Parameter names whose value is passed through as one opaque string.
///
/// Session-style values (`cookie=a=1; b=2&c=3`) contain the very characters
/// used to frame a query string, so everything after the first `=` of such a
/// parameter, up to the end of the query, becomes its value.
const OPAQUE_MARKERS: &[&str] = &["cookie"];

/// One named parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub value: String,
    /// Whether the value was taken verbatim to the end of the query.
    pub opaque: bool,
}

/// Ordered (name, value) pairs supplied by a caller for one invocation.
///
/// Order is preserved and significant to the cache key; duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    params: Vec<Parameter>,
}

impl ParameterSet {
    /// An empty set ("call with no parameters").
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw (still percent-encoded) query string.
    ///
    /// A leading `?` is ignored, `+` decodes to a space, and a segment with
    /// no `=` is a parameter with an empty value. Segments with an empty
    /// name are dropped, so `""`, `"?"` and `"&&"` all parse to an empty set.
    pub fn from_query(raw: &str) -> Self {
        let mut set = Self::new();
        let mut rest = raw.strip_prefix('?').unwrap_or(raw);

        while !rest.is_empty() {
            let (segment, tail) = rest.split_once('&').unwrap_or((rest, ""));
            let (raw_name, raw_value) = segment.split_once('=').unwrap_or((segment, ""));
            let name = decode_component(raw_name);

            if segment.contains('=') && is_opaque(&name) {
                // The first '=' in `rest` is this segment's separator.
                let to_end = rest.split_once('=').map_or("", |(_, v)| v);
                set.params.push(Parameter {
                    name,
                    value: decode_component(to_end),
                    opaque: true,
                });
                break;
            }

            if !name.trim().is_empty() {
                set.push(name, decode_component(raw_value));
            }
            rest = tail;
        }
        set
    }

    /// Build a set from already-decoded pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut set = Self::new();
        for (name, value) in pairs {
            set.push(name, value);
        }
        set
    }

    /// Append a parameter.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.push(Parameter {
            name: name.into(),
            value: value.into(),
            opaque: false,
        });
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Canonical rendering used for cache keys: `name="value"` pairs in
    /// received order, joined by `", "`. Opaque values render single-quoted.
    ///
    /// Backslashes and quotes are escaped in names and values, and `=` in
    /// names, so distinct sets never render alike. No other normalization is
    /// applied: reordered or re-spaced parameter sets render differently.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            escape_into(&mut out, &p.name, &['=']);
            let quote = if p.opaque { '\'' } else { '"' };
            out.push('=');
            out.push(quote);
            escape_into(&mut out, &p.value, &[]);
            out.push(quote);
        }
        out
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

fn is_opaque(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    OPAQUE_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn escape_into(out: &mut String, text: &str, extra: &[char]) {
    for c in text.chars() {
        if matches!(c, '\\' | '"' | '\'') || extra.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}
