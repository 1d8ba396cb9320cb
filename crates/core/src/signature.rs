//! Structural decomposition of type reference strings.
//!
//! Reference strings follow the extractor's conventions:
//!
//! - `pkg.Type.method(int,pkg.Other)` for methods
//! - `pkg.Type[][]` for arrays
//! - `<?>`, `<?+pkg.Upper>` and `<?-pkg.Lower>` for wildcards
//! - `<T+pkg.A&pkg.B>` for type variables with bounds
//! - `pkg.Map<pkg.K,pkg.V>` for parameterized types
//!
//! Anything else is an atomic name. Classification never fails: malformed
//! input falls back to [`Signature::Atomic`].

/// Bound of a wildcard type argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WildcardBound {
    Unbounded,
    Upper(String),
    Lower(String),
}

/// Structural shape of a reference string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    /// Method reference, never decomposed
    Method,
    Array {
        element: String,
        dimensions: usize,
    },
    Wildcard(WildcardBound),
    TypeVariable {
        name: String,
        bounds: Vec<String>,
    },
    Parameterized {
        base: String,
        arguments: Vec<String>,
    },
    Atomic,
}

impl Signature {
    /// Classify a reference string.
    pub fn parse(fqn: &str) -> Self {
        if fqn.contains('(') && fqn.ends_with(')') {
            return Signature::Method;
        }
        if let Some(array) = Self::parse_array(fqn) {
            return array;
        }
        if fqn.starts_with("<?") {
            return Self::parse_wildcard(fqn).unwrap_or(Signature::Atomic);
        }
        if fqn.starts_with('<') {
            return Self::parse_type_variable(fqn).unwrap_or(Signature::Atomic);
        }
        if fqn.contains('<') {
            return Self::parse_parameterized(fqn).unwrap_or(Signature::Atomic);
        }
        Signature::Atomic
    }

    /// Whether resolving this shape materializes a synthetic entity
    pub fn is_structural(&self) -> bool {
        !matches!(self, Signature::Method | Signature::Atomic)
    }

    fn parse_array(fqn: &str) -> Option<Self> {
        let mut element = fqn;
        let mut dimensions = 0;
        while let Some(stripped) = element.strip_suffix("[]") {
            element = stripped;
            dimensions += 1;
        }
        if dimensions == 0 || element.is_empty() {
            return None;
        }
        Some(Signature::Array {
            element: element.to_string(),
            dimensions,
        })
    }

    fn parse_wildcard(fqn: &str) -> Option<Self> {
        if fqn == "<?>" {
            return Some(Signature::Wildcard(WildcardBound::Unbounded));
        }
        let inner = fqn.strip_suffix('>')?;
        if let Some(bound) = inner.strip_prefix("<?+") {
            return (!bound.is_empty())
                .then(|| Signature::Wildcard(WildcardBound::Upper(bound.to_string())));
        }
        if let Some(bound) = inner.strip_prefix("<?-") {
            return (!bound.is_empty())
                .then(|| Signature::Wildcard(WildcardBound::Lower(bound.to_string())));
        }
        None
    }

    fn parse_type_variable(fqn: &str) -> Option<Self> {
        let inner = fqn.strip_prefix('<')?.strip_suffix('>')?;
        match inner.split_once('+') {
            None => {
                if inner.is_empty() || inner.contains(['<', '>', '&']) {
                    return None;
                }
                Some(Signature::TypeVariable {
                    name: inner.to_string(),
                    bounds: Vec::new(),
                })
            }
            Some((name, bounds)) => {
                if name.is_empty() {
                    return None;
                }
                let bounds = split_top_level(bounds, '&')?;
                Some(Signature::TypeVariable {
                    name: name.to_string(),
                    bounds,
                })
            }
        }
    }

    fn parse_parameterized(fqn: &str) -> Option<Self> {
        let mut base = String::with_capacity(fqn.len());
        let mut arguments = Vec::new();
        let mut depth = 0usize;
        let mut start = 0usize;

        for (i, c) in fqn.char_indices() {
            match (c, depth) {
                ('<', 0) => {
                    depth = 1;
                    start = i + 1;
                }
                ('<', _) => depth += 1,
                ('>', 0) => return None,
                ('>', 1) => {
                    depth = 0;
                    arguments.push(non_empty(&fqn[start..i])?);
                }
                ('>', _) => depth -= 1,
                (',', 1) => {
                    arguments.push(non_empty(&fqn[start..i])?);
                    start = i + 1;
                }
                (_, 0) => base.push(c),
                _ => {}
            }
        }

        if depth != 0 || base.is_empty() || arguments.is_empty() {
            return None;
        }
        Some(Signature::Parameterized { base, arguments })
    }
}

/// Split `list` on `separator` wherever the angle-bracket depth is zero.
/// Unbalanced input yields `None`.
fn split_top_level(list: &str, separator: char) -> Option<Vec<String>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, c) in list.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.checked_sub(1)?,
            c if c == separator && depth == 0 => {
                parts.push(non_empty(&list[start..i])?);
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return None;
    }
    parts.push(non_empty(&list[start..])?);
    Some(parts)
}

fn non_empty(part: &str) -> Option<String> {
    (!part.is_empty()).then(|| part.to_string())
}
