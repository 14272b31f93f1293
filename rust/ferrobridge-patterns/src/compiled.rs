use regex::Regex;

/// A compiled pattern. Simple shapes (no regex metacharacters) are
/// recognized and compiled to a direct string comparison instead of going
/// through the `regex` engine at all, matching the original's fast-path
/// intent without needing a separate glob syntax.
pub enum CompiledPattern {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
    Regex(Box<Regex>),
}

impl CompiledPattern {
    pub fn matches(&self, input: &str) -> bool {
        match self {
            CompiledPattern::Exact(s) => input == s,
            CompiledPattern::Prefix(s) => input.starts_with(s.as_str()),
            CompiledPattern::Suffix(s) => input.ends_with(s.as_str()),
            CompiledPattern::Contains(s) => input.contains(s.as_str()),
            CompiledPattern::Regex(re) => re.is_match(input),
        }
    }

    /// Classifies a validated pattern string into its compiled form. A
    /// pattern with no regex metacharacters at all is exact; one ending or
    /// starting in a bare `.*` collapses to prefix/suffix/contains.
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        if let Some(simple) = Self::simple_shape(pattern) {
            return Ok(simple);
        }
        Ok(CompiledPattern::Regex(Box::new(Regex::new(pattern)?)))
    }

    fn simple_shape(pattern: &str) -> Option<Self> {
        const META: &[char] = &[
            '.', '*', '+', '?', '(', ')', '[', ']', '{', '}', '^', '$', '|', '\\',
        ];
        if !pattern.contains(META) {
            return Some(CompiledPattern::Exact(pattern.to_string()));
        }
        if let Some(inner) = pattern.strip_prefix("^").and_then(|p| p.strip_suffix(".*")) {
            if !inner.contains(META) {
                return Some(CompiledPattern::Prefix(inner.to_string()));
            }
        }
        if let Some(inner) = pattern.strip_prefix(".*").and_then(|p| p.strip_suffix("$")) {
            if !inner.contains(META) {
                return Some(CompiledPattern::Suffix(inner.to_string()));
            }
        }
        if let Some(inner) = pattern.strip_prefix(".*").and_then(|p| p.strip_suffix(".*")) {
            if !inner.contains(META) {
                return Some(CompiledPattern::Contains(inner.to_string()));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_pattern_fast_path() {
        let p = CompiledPattern::compile("line1/temp").unwrap();
        assert!(matches!(p, CompiledPattern::Exact(_)));
        assert!(p.matches("line1/temp"));
        assert!(!p.matches("line1/pressure"));
    }

    #[test]
    fn regex_fallback_for_complex_patterns() {
        let p = CompiledPattern::compile(r"line[0-9]+/temp").unwrap();
        assert!(matches!(p, CompiledPattern::Regex(_)));
        assert!(p.matches("line12/temp"));
        assert!(!p.matches("lineX/temp"));
    }
}
