//! Cache Key Derivation
//!
//! Turns a call's argument list into a deterministic cache key. Three strategies
//! exist, tried in this order: explicit argument paths, a custom generator, or
//! stringifying every argument.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::error::{GatewayError, Result};

/// Separator between the prefix and each extracted key fragment.
pub const KEY_DELIMITER: &str = "_";

/// TTL applied when a spec does not choose one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Custom key generator over the argument list.
pub type KeyGenerator = Arc<dyn Fn(&[Value]) -> String + Send + Sync>;

// == Argument Paths ==
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Index(usize),
    Field(String),
    /// Direct children
    Wildcard,
    /// Every scalar underneath, in document order
    DeepWildcard,
}

/// A path into the argument list, e.g. `$[0]`, `$[1].id`, `$['user']`, `$..*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgPath {
    raw: String,
    segments: Vec<Segment>,
}

impl ArgPath {
    /// Whether the path can select at most one value.
    pub fn is_singular(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Index(_) | Segment::Field(_)))
    }

    /// Returns every value the path selects from `root`.
    pub fn select<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![root];

        for segment in &self.segments {
            current = match segment {
                Segment::Index(index) => current
                    .into_iter()
                    .filter_map(|value| value.as_array().and_then(|items| items.get(*index)))
                    .collect(),
                Segment::Field(name) => current
                    .into_iter()
                    .filter_map(|value| value.as_object().and_then(|map| map.get(name)))
                    .collect(),
                Segment::Wildcard => current.into_iter().flat_map(children).collect(),
                Segment::DeepWildcard => {
                    let mut leaves = Vec::new();
                    for value in current {
                        children(value)
                            .into_iter()
                            .for_each(|child| collect_leaves(child, &mut leaves));
                    }
                    leaves
                }
            };
        }

        current
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ArgPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ArgPath {
    type Err = GatewayError;

    fn from_str(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| GatewayError::CacheApply(format!("invalid key path `{raw}`: {reason}"));

        let rest = raw
            .trim()
            .strip_prefix('$')
            .ok_or_else(|| invalid("must start with `$`"))?;
        let chars: Vec<char> = rest.chars().collect();
        let mut segments = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '.' if chars.get(i + 1) == Some(&'.') => {
                    if chars.get(i + 2) != Some(&'*') {
                        return Err(invalid("only `..*` is supported for recursive descent"));
                    }
                    segments.push(Segment::DeepWildcard);
                    i += 3;
                }
                '.' => {
                    i += 1;
                    if chars.get(i) == Some(&'*') {
                        segments.push(Segment::Wildcard);
                        i += 1;
                        continue;
                    }
                    let start = i;
                    while i < chars.len() && is_name_char(chars[i]) {
                        i += 1;
                    }
                    if start == i {
                        return Err(invalid("expected a field name after `.`"));
                    }
                    segments.push(Segment::Field(chars[start..i].iter().collect()));
                }
                '[' => {
                    let close = chars[i..]
                        .iter()
                        .position(|c| *c == ']')
                        .map(|offset| i + offset)
                        .ok_or_else(|| invalid("unclosed `[`"))?;
                    let inner: String = chars[i + 1..close].iter().collect();
                    segments.push(parse_bracket(inner.trim()).ok_or_else(|| invalid("bad bracket selector"))?);
                    i = close + 1;
                }
                _ => return Err(invalid("unexpected character")),
            }
        }

        Ok(Self {
            raw: raw.trim().to_string(),
            segments,
        })
    }
}

fn parse_bracket(inner: &str) -> Option<Segment> {
    if inner == "*" {
        return Some(Segment::Wildcard);
    }
    for quote in ['\'', '"'] {
        if let Some(name) = inner.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return Some(Segment::Field(name.to_string()));
        }
    }
    inner.parse().ok().map(Segment::Index)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '-'
}

fn children(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => Vec::new(),
    }
}

fn collect_leaves<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_leaves(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_leaves(item, out)),
        scalar => out.push(scalar),
    }
}

/// Renders a selected value as a key fragment: strings verbatim, the rest as JSON.
fn fragment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Escapes the delimiter inside a fragment so joined fragments split back uniquely.
fn escaped_fragment(value: &Value) -> String {
    let raw = fragment(value);
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '\\' || KEY_DELIMITER.starts_with(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// == Argument List ==
/// Serializes call arguments into the list key derivation runs over.
///
/// Tuples become arrays (`(a, b)` is `[a, b]`); anything else is a one-element list.
pub fn argument_list<A: Serialize + ?Sized>(args: &A) -> Result<Value> {
    let value = serde_json::to_value(args)
        .map_err(|e| GatewayError::CacheApply(format!("arguments are not serializable: {e}")))?;
    Ok(match value {
        list @ Value::Array(_) => list,
        single => Value::Array(vec![single]),
    })
}

// == Cache Key Spec ==
/// How a memoized operation derives its keys and how long results live.
#[derive(Clone)]
pub struct CacheKeySpec {
    prefix: String,
    key_params: Option<Vec<String>>,
    key_generator: Option<KeyGenerator>,
    ttl: Option<Duration>,
}

impl Default for CacheKeySpec {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            key_params: None,
            key_generator: None,
            ttl: Some(DEFAULT_TTL),
        }
    }
}

impl fmt::Debug for CacheKeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheKeySpec")
            .field("prefix", &self.prefix)
            .field("key_params", &self.key_params)
            .field("key_generator", &self.key_generator.is_some())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl CacheKeySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Literal namespace prepended to every key.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Paths whose matches seed the key. Takes precedence over a generator.
    pub fn key_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_params = Some(params.into_iter().map(Into::into).collect());
        self
    }

    pub fn key_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(&[Value]) -> String + Send + Sync + 'static,
    {
        self.key_generator = Some(Arc::new(generator));
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Entries live until evicted or deleted.
    pub fn without_ttl(mut self) -> Self {
        self.ttl = None;
        self
    }

    pub fn ttl_value(&self) -> Option<Duration> {
        self.ttl
    }

    /// Validates the spec and prepares it for repeated use.
    pub fn compile(&self) -> Result<KeyDeriver> {
        let strategy = match (&self.key_params, &self.key_generator) {
            (Some(params), _) => {
                if params.is_empty() {
                    return Err(GatewayError::CacheApply(
                        "key_params must name at least one path".to_string(),
                    ));
                }
                let paths = params
                    .iter()
                    .map(|raw| raw.parse())
                    .collect::<Result<Vec<ArgPath>>>()?;
                let escape = !(paths.len() == 1 && paths[0].is_singular());
                KeyStrategy::Params { paths, escape }
            }
            (None, Some(generator)) => KeyStrategy::Generator(generator.clone()),
            (None, None) => KeyStrategy::Stringify,
        };

        Ok(KeyDeriver {
            prefix: self.prefix.clone(),
            strategy,
        })
    }
}

// == Key Deriver ==
#[derive(Clone)]
enum KeyStrategy {
    /// `escape` is set unless a single singular path is used
    Params { paths: Vec<ArgPath>, escape: bool },
    Generator(KeyGenerator),
    Stringify,
}

/// A validated [`CacheKeySpec`], ready to derive keys.
#[derive(Clone)]
pub struct KeyDeriver {
    prefix: String,
    strategy: KeyStrategy,
}

impl fmt::Debug for KeyDeriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strategy = match &self.strategy {
            KeyStrategy::Params { .. } => "params",
            KeyStrategy::Generator(_) => "generator",
            KeyStrategy::Stringify => "stringify",
        };
        f.debug_struct("KeyDeriver")
            .field("prefix", &self.prefix)
            .field("strategy", &strategy)
            .finish()
    }
}

impl KeyDeriver {
    /// Derives the key for an argument list produced by [`argument_list`].
    pub fn derive(&self, args: &Value) -> String {
        let body = match &self.strategy {
            KeyStrategy::Params { paths, escape } => {
                let render = if *escape { escaped_fragment } else { fragment };
                paths
                    .iter()
                    .flat_map(|path| path.select(args))
                    .map(render)
                    .collect::<Vec<_>>()
                    .join(KEY_DELIMITER)
            }
            KeyStrategy::Generator(generator) => {
                let list = args.as_array().map(Vec::as_slice).unwrap_or_default();
                generator(list)
            }
            KeyStrategy::Stringify => args.to_string(),
        };

        if self.prefix.is_empty() {
            body
        } else {
            format!("{}{KEY_DELIMITER}{body}", self.prefix)
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}
