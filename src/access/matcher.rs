//! Compilation of route requirements into capability-claim matchers.
//!
//! Requirement tokens are sorted by resource name and joined with a gap that
//! matches any run of other tokens, so a claim satisfies the matcher when it
//! contains every required token in order. Claims are produced in the same
//! resource order by [`capability_claim`](super::capability_claim); a claim
//! with its tokens out of order does not match.
//!
//! Tokens are escaped before insertion and must sit on whitespace boundaries,
//! so `users:read` is not satisfied by `superusers:read` and resource names
//! containing regex metacharacters match literally.

use super::permission::{ResourcePermission, sorted_unique};
use crate::error::{AuthError, AuthResult};
use regex::Regex;
use std::fmt;

/// Separator between consecutive required tokens: one space, optionally
/// followed by anything ending in a space.
const GAP: &str = r"\s(?:.*\s)?";
const LEADING: &str = r"(?:^|\s)";
const TRAILING: &str = r"(?:\s|$)";

/// Compiled matcher for one route's access requirement.
///
/// Immutable after compilation; share it between requests behind an `Arc`.
#[derive(Clone)]
pub struct AccessMatcher {
    regex: Regex,
}

impl AccessMatcher {
    /// Matcher with no requirements. Any claim passes, including `""`.
    pub fn unrestricted() -> Self {
        Self {
            regex: Regex::new("").expect("empty pattern is valid"),
        }
    }

    /// Test a capability claim against this matcher.
    pub fn test(&self, claim: &str) -> bool {
        self.regex.is_match(claim)
    }

    /// The compiled pattern, for diagnostics.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

}

impl fmt::Debug for AccessMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessMatcher")
            .field("pattern", &self.pattern())
            .finish()
    }
}

/// Compile a set of required permissions into an [`AccessMatcher`].
///
/// Fails with [`AuthError::DuplicateResource`] if two requirements name the
/// same resource.
pub fn compile(requirements: Vec<ResourcePermission>) -> AuthResult<AccessMatcher> {
    let requirements = sorted_unique(requirements)?;

    let tokens: Vec<String> = requirements
        .iter()
        .flat_map(ResourcePermission::tokens)
        .map(|token| regex::escape(&token))
        .collect();

    if tokens.is_empty() {
        return Ok(AccessMatcher::unrestricted());
    }

    let pattern = format!("{LEADING}{}{TRAILING}", tokens.join(GAP));
    let regex = Regex::new(&pattern)
        .map_err(|e| AuthError::Internal(format!("access pattern failed to compile: {e}")))?;

    Ok(AccessMatcher { regex })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn res1_read_res2_write() -> AccessMatcher {
        compile(vec![
            ResourcePermission::new("res1", true, false),
            ResourcePermission::new("res2", false, true),
        ])
        .unwrap()
    }

    #[test]
    fn test_ordered_tokens_match() {
        assert!(res1_read_res2_write().test("res1:read res2:write"));
    }

    #[test]
    fn test_unmet_write_requirement() {
        assert!(!res1_read_res2_write().test("res1:read res2:read"));
    }

    #[test]
    fn test_out_of_order_claim_fails() {
        assert!(!res1_read_res2_write().test("res2:write res1:read"));
    }

    #[test]
    fn test_gaps_are_allowed() {
        let matcher = res1_read_res2_write();
        assert!(matcher.test("alpha:read res1:read res1:write res15:read res2:write zeta:write"));
    }

    #[test]
    fn test_requirement_order_is_irrelevant() {
        let matcher = compile(vec![
            ResourcePermission::write("res2"),
            ResourcePermission::read("res1"),
        ])
        .unwrap();
        assert!(matcher.test("res1:read res2:write"));
        assert_eq!(matcher.pattern(), res1_read_res2_write().pattern());
    }

    #[test]
    fn test_empty_requirement_matches_everything() {
        let matcher = compile(Vec::new()).unwrap();
        assert!(matcher.test(""));
        assert!(matcher.test("anything at all"));
        assert_eq!(matcher.pattern(), "");
    }

    #[test]
    fn test_flagless_requirement_is_unrestricted() {
        let matcher = compile(vec![ResourcePermission::new("users", false, false)]).unwrap();
        assert!(matcher.test(""));
    }

    #[test]
    fn test_duplicate_resource_rejected() {
        let err = compile(vec![
            ResourcePermission::read("res1"),
            ResourcePermission::write("res1"),
        ])
        .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateResource(r) if r == "res1"));
    }

    #[test]
    fn test_read_write_requires_both() {
        let matcher = compile(vec![ResourcePermission::read_write("users")]).unwrap();
        assert!(matcher.test("users:read users:write"));
        assert!(!matcher.test("users:read"));
        assert!(!matcher.test("users:write"));
    }

    #[test]
    fn test_tokens_match_on_boundaries() {
        let matcher = compile(vec![ResourcePermission::read("users")]).unwrap();
        assert!(!matcher.test("superusers:read"));
        assert!(!matcher.test("users:reader"));
        assert!(matcher.test("roles:read users:read"));
    }

    #[test]
    fn test_metacharacters_match_literally() {
        let matcher = compile(vec![ResourcePermission::read("a.c")]).unwrap();
        assert!(matcher.test("a.c:read"));
        assert!(!matcher.test("abc:read"));
    }

    #[test]
    fn test_matches_subset_semantics() {
        // every subset of a sorted claim is satisfied by that claim
        let claim = "roles:read topics:read topics:write users:write";
        let grants = [
            ResourcePermission::read("roles"),
            ResourcePermission::read_write("topics"),
            ResourcePermission::write("users"),
        ];
        for mask in 0u8..8 {
            let subset: Vec<_> = grants
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, p)| p.clone())
                .collect();
            assert!(compile(subset).unwrap().test(claim), "mask {mask}");
        }
        assert!(!compile(vec![ResourcePermission::read("users")]).unwrap().test(claim));
    }
}
