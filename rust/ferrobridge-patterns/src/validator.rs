/// Outcome of validating a pattern's *textual shape*, before any attempt to
/// compile it. Scanning happens over the pattern source only — an unsafe
/// pattern is never executed or compiled to reach this verdict.
#[derive(Debug, Clone)]
pub struct PatternValidationResult {
    pub is_safe: bool,
    pub reason: Option<String>,
    pub estimated_complexity: u32,
    pub has_backreferences: bool,
    pub has_nested_quantifiers: bool,
    pub max_repetition_depth: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct ValidatorConfig {
    pub max_pattern_length: usize,
    pub max_complexity: u32,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_pattern_length: 1024,
            max_complexity: 50,
        }
    }
}

const QUANTIFIERS: [char; 3] = ['*', '+', '?'];

pub struct PatternValidator;

impl PatternValidator {
    pub fn validate(pattern: &str, config: &ValidatorConfig) -> PatternValidationResult {
        if pattern.len() > config.max_pattern_length {
            return PatternValidationResult {
                is_safe: false,
                reason: Some(format!(
                    "pattern length {} exceeds max {}",
                    pattern.len(),
                    config.max_pattern_length
                )),
                estimated_complexity: 0,
                has_backreferences: false,
                has_nested_quantifiers: false,
                max_repetition_depth: 0,
            };
        }

        let has_backrefs = Self::has_backreferences(pattern);
        let has_nested = Self::has_nested_quantifiers(pattern);
        let max_depth = Self::max_repetition_depth(pattern);
        let complexity = Self::calculate_complexity(pattern, has_backrefs, has_nested);

        let mut reason = None;
        let mut is_safe = true;
        if has_nested {
            is_safe = false;
            reason = Some("nested quantifiers can cause catastrophic backtracking".to_string());
        } else if Self::has_quantified_backreference(pattern) {
            is_safe = false;
            reason = Some("backreferences inside a quantified group are not permitted".to_string());
        } else if complexity > config.max_complexity {
            is_safe = false;
            reason = Some(format!(
                "complexity score {complexity} exceeds max {}",
                config.max_complexity
            ));
        }

        PatternValidationResult {
            is_safe,
            reason,
            estimated_complexity: complexity,
            has_backreferences: has_backrefs,
            has_nested_quantifiers: has_nested,
            max_repetition_depth: max_depth,
        }
    }

    fn has_backreferences(pattern: &str) -> bool {
        let bytes = pattern.as_bytes();
        let mut i = 0;
        while i + 1 < bytes.len() {
            if bytes[i] == b'\\' && bytes[i + 1].is_ascii_digit() && bytes[i + 1] != b'0' {
                return true;
            }
            i += 1;
        }
        false
    }

    /// Detects a backreference that sits inside a group later closed by a
    /// quantifier, e.g. `(a\1)+`. A bare backreference outside any
    /// quantified group only contributes to the complexity score; this is
    /// the shape that actually risks catastrophic backtracking, mirroring
    /// how `has_nested_quantifiers` tracks group/quantifier nesting.
    fn has_quantified_backreference(pattern: &str) -> bool {
        let bytes = pattern.as_bytes();
        let mut group_has_backref: Vec<bool> = Vec::new();

        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => {
                    if i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit() && bytes[i + 1] != b'0' {
                        if let Some(top) = group_has_backref.last_mut() {
                            *top = true;
                        }
                    }
                    i += 2;
                    continue;
                }
                b'(' => {
                    group_has_backref.push(false);
                }
                b')' => {
                    let inner_has_backref = group_has_backref.pop().unwrap_or(false);
                    let followed_by_quantifier = bytes
                        .get(i + 1)
                        .map(|c| *c == b'*' || *c == b'+' || *c == b'?' || *c == b'{')
                        .unwrap_or(false);
                    if inner_has_backref && followed_by_quantifier {
                        return true;
                    }
                    if let Some(parent) = group_has_backref.last_mut() {
                        if inner_has_backref {
                            *parent = true;
                        }
                    }
                }
                _ => {}
            }
            i += 1;
        }
        false
    }

    /// Detects the `(...+)+` / `(...*)* `/ `(...+)*` / `(...*)+` shape: a
    /// quantified group that is itself quantified. This is the classic
    /// catastrophic-backtracking trigger for a backtracking engine and is
    /// rejected unconditionally regardless of the compiling engine's own
    /// guarantees (see crate-level note on the `regex` crate's NFA
    /// semantics).
    fn has_nested_quantifiers(pattern: &str) -> bool {
        let chars: Vec<char> = pattern.chars().collect();
        let mut depth_quantified: Vec<bool> = Vec::new();
        let mut group_start_quantified: Vec<usize> = Vec::new();

        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '\\' => {
                    i += 2;
                    continue;
                }
                '(' => {
                    group_start_quantified.push(i);
                    depth_quantified.push(false);
                }
                ')' => {
                    let inner_has_quantifier = depth_quantified.pop().unwrap_or(false);
                    group_start_quantified.pop();
                    // Is this closing paren itself followed by a quantifier?
                    let followed_by_quantifier = chars
                        .get(i + 1)
                        .map(|c| QUANTIFIERS.contains(c))
                        .unwrap_or(false)
                        || (chars.get(i + 1) == Some(&'{'));
                    if inner_has_quantifier && followed_by_quantifier {
                        return true;
                    }
                    if let Some(parent) = depth_quantified.last_mut() {
                        if inner_has_quantifier && followed_by_quantifier {
                            *parent = true;
                        }
                    }
                }
                c if QUANTIFIERS.contains(&c) => {
                    if let Some(top) = depth_quantified.last_mut() {
                        *top = true;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        false
    }

    fn max_repetition_depth(pattern: &str) -> u32 {
        let mut depth = 0u32;
        let mut max_depth = 0u32;
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    chars.next();
                }
                '(' => depth += 1,
                ')' => {
                    max_depth = max_depth.max(depth);
                    depth = depth.saturating_sub(1);
                }
                _ => {}
            }
        }
        max_depth
    }

    /// alternation-in-quantified-group: `(a|b)+` style — not inherently
    /// catastrophic under an NFA engine, but still scored, matching the
    /// original's complexity weighting.
    fn has_alternation_in_quantified_group(pattern: &str) -> bool {
        let chars: Vec<char> = pattern.chars().collect();
        let mut i = 0;
        let mut group_stack: Vec<bool> = Vec::new(); // has '|' seen at this depth
        while i < chars.len() {
            match chars[i] {
                '\\' => {
                    i += 2;
                    continue;
                }
                '(' => group_stack.push(false),
                '|' => {
                    if let Some(top) = group_stack.last_mut() {
                        *top = true;
                    }
                }
                ')' => {
                    let had_alt = group_stack.pop().unwrap_or(false);
                    let quantified = chars
                        .get(i + 1)
                        .map(|c| QUANTIFIERS.contains(c) || *c == '{')
                        .unwrap_or(false);
                    if had_alt && quantified {
                        return true;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        false
    }

    fn count_quantifiers(pattern: &str) -> u32 {
        let mut count = 0u32;
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\\' {
                chars.next();
                continue;
            }
            if QUANTIFIERS.contains(&c) || c == '{' {
                count += 1;
            }
        }
        count
    }

    fn count_groups(pattern: &str) -> u32 {
        let mut count = 0u32;
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\\' {
                chars.next();
                continue;
            }
            if c == '(' {
                count += 1;
            }
        }
        count
    }

    fn calculate_complexity(pattern: &str, has_backrefs: bool, has_nested: bool) -> u32 {
        let mut score = 0u32;
        score += Self::count_quantifiers(pattern);
        score += Self::count_groups(pattern) * 2;
        if has_nested {
            score += 10;
        }
        if has_backrefs {
            score += 5;
        }
        if Self::has_alternation_in_quantified_group(pattern) {
            score += 5;
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_nested_quantifiers() {
        let r = PatternValidator::validate("(a+)+b", &ValidatorConfig::default());
        assert!(!r.is_safe);
        assert!(r.has_nested_quantifiers);
    }

    #[test]
    fn rejects_nested_star() {
        let r = PatternValidator::validate("(a*)*", &ValidatorConfig::default());
        assert!(!r.is_safe);
    }

    #[test]
    fn bare_backreference_is_safe_but_scored() {
        let r = PatternValidator::validate(r"(a)\1", &ValidatorConfig::default());
        assert!(r.is_safe);
        assert!(r.has_backreferences);
        assert!(r.estimated_complexity >= 5);
    }

    #[test]
    fn rejects_backreference_inside_quantified_group() {
        let r = PatternValidator::validate(r"(a\1)+", &ValidatorConfig::default());
        assert!(!r.is_safe);
        assert!(r.has_backreferences);
    }

    #[test]
    fn accepts_simple_patterns() {
        let r = PatternValidator::validate("line[0-9]+/temp", &ValidatorConfig::default());
        assert!(r.is_safe);
        assert!(!r.has_nested_quantifiers);
        assert!(!r.has_backreferences);
    }

    #[test]
    fn rejects_overlong_patterns() {
        let long = "a".repeat(2000);
        let r = PatternValidator::validate(&long, &ValidatorConfig::default());
        assert!(!r.is_safe);
    }

    #[test]
    fn scores_alternation_in_quantified_group() {
        let r = PatternValidator::validate("(foo|bar)+", &ValidatorConfig::default());
        // Not a nested-quantifier shape, so still "safe" on its own, but
        // should have picked up the alternation-in-quantified-group score.
        assert!(r.estimated_complexity >= 5);
    }
}
