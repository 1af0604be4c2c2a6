//! Resource permissions and their capability-string encoding.
//!
//! A permission for resource `users` that is readable and writable encodes to
//! `"users:read users:write"`. A role's full grant set becomes the capability
//! claim carried in an access token's `aud` field, always ordered by resource
//! name.

use crate::error::{AuthError, AuthResult};
use serde::{Deserialize, Serialize};

const READ_SUFFIX: &str = ":read";
const WRITE_SUFFIX: &str = ":write";

/// One row of a role's access grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourcePermission {
    pub resource: String,
    pub readable: bool,
    pub writable: bool,
}

impl ResourcePermission {
    pub fn new(resource: impl Into<String>, readable: bool, writable: bool) -> Self {
        Self {
            resource: resource.into(),
            readable,
            writable,
        }
    }

    pub fn read(resource: impl Into<String>) -> Self {
        Self::new(resource, true, false)
    }

    pub fn write(resource: impl Into<String>) -> Self {
        Self::new(resource, false, true)
    }

    pub fn read_write(resource: impl Into<String>) -> Self {
        Self::new(resource, true, true)
    }

    /// Capability tokens for this permission, read before write.
    pub(crate) fn tokens(&self) -> impl Iterator<Item = String> + '_ {
        let read = self
            .readable
            .then(|| format!("{}{}", self.resource, READ_SUFFIX));
        let write = self
            .writable
            .then(|| format!("{}{}", self.resource, WRITE_SUFFIX));
        read.into_iter().chain(write)
    }
}

/// Encode a permission as its capability string.
///
/// Returns `None` when neither flag is set.
pub fn encode(permission: &ResourcePermission) -> Option<String> {
    let tokens: Vec<String> = permission.tokens().collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

/// Decode the capability string of a single resource.
///
/// Accepts `"<r>:read"`, `"<r>:write"` or both (in either order). Tokens for
/// different resources, unknown actions and empty input yield `None`.
pub fn decode(capability: &str) -> Option<ResourcePermission> {
    let mut decoded: Option<ResourcePermission> = None;

    for token in capability.split_whitespace() {
        let (resource, readable, writable) = split_token(token)?;
        match decoded.as_mut() {
            None => decoded = Some(ResourcePermission::new(resource, readable, writable)),
            Some(existing) if existing.resource == resource => {
                existing.readable |= readable;
                existing.writable |= writable;
            }
            Some(_) => return None,
        }
    }

    decoded
}

/// Fold a whole capability claim back into per-resource permissions.
///
/// Unrecognized tokens are skipped. The result is ordered by resource name.
pub fn decode_claim(claim: &str) -> Vec<ResourcePermission> {
    let mut permissions: Vec<ResourcePermission> = Vec::new();

    for (resource, readable, writable) in claim.split_whitespace().filter_map(split_token) {
        match permissions.iter_mut().find(|p| p.resource == resource) {
            Some(existing) => {
                existing.readable |= readable;
                existing.writable |= writable;
            }
            None => permissions.push(ResourcePermission::new(resource, readable, writable)),
        }
    }

    permissions.sort_by(|a, b| a.resource.cmp(&b.resource));
    permissions
}

/// Build the capability claim for a set of granted permissions.
///
/// The set is sorted by resource name here even if the source already returns
/// it ordered; duplicated resources are rejected.
pub fn capability_claim(permissions: &[ResourcePermission]) -> AuthResult<String> {
    let sorted = sorted_unique(permissions.to_vec())?;
    let claim = sorted
        .iter()
        .filter_map(encode)
        .collect::<Vec<_>>()
        .join(" ");
    Ok(claim)
}

/// Sort ascending by resource name, failing on the first duplicate.
pub(crate) fn sorted_unique(
    mut permissions: Vec<ResourcePermission>,
) -> AuthResult<Vec<ResourcePermission>> {
    permissions.sort_by(|a, b| a.resource.cmp(&b.resource));

    if let Some(pair) = permissions
        .windows(2)
        .find(|pair| pair[0].resource == pair[1].resource)
    {
        return Err(AuthError::DuplicateResource(pair[0].resource.clone()));
    }

    Ok(permissions)
}

fn split_token(token: &str) -> Option<(&str, bool, bool)> {
    if let Some(resource) = token.strip_suffix(READ_SUFFIX)
        && !resource.is_empty()
    {
        return Some((resource, true, false));
    }
    if let Some(resource) = token.strip_suffix(WRITE_SUFFIX)
        && !resource.is_empty()
    {
        return Some((resource, false, true));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_flags() {
        assert_eq!(
            encode(&ResourcePermission::read("users")).as_deref(),
            Some("users:read")
        );
        assert_eq!(
            encode(&ResourcePermission::write("users")).as_deref(),
            Some("users:write")
        );
        assert_eq!(
            encode(&ResourcePermission::read_write("users")).as_deref(),
            Some("users:read users:write")
        );
        assert_eq!(encode(&ResourcePermission::new("users", false, false)), None);
    }

    #[test]
    fn test_decode_inverts_encode() {
        for permission in [
            ResourcePermission::read("topics"),
            ResourcePermission::write("topics"),
            ResourcePermission::read_write("topics"),
        ] {
            let encoded = encode(&permission).unwrap();
            assert_eq!(decode(&encoded), Some(permission));
        }
    }

    #[test]
    fn test_decode_rejects_mixed_resources() {
        assert_eq!(decode("users:read roles:write"), None);
        assert_eq!(decode("users:delete"), None);
        assert_eq!(decode(":read"), None);
        assert_eq!(decode(""), None);
    }

    #[test]
    fn test_capability_claim_sorts_by_resource() {
        let claim = capability_claim(&[
            ResourcePermission::read_write("users"),
            ResourcePermission::new("audit", false, false),
            ResourcePermission::read("roles"),
            ResourcePermission::write("topics"),
        ])
        .unwrap();
        assert_eq!(claim, "roles:read topics:write users:read users:write");
    }

    #[test]
    fn test_capability_claim_empty() {
        assert_eq!(capability_claim(&[]).unwrap(), "");
        assert_eq!(
            capability_claim(&[ResourcePermission::new("users", false, false)]).unwrap(),
            ""
        );
    }

    #[test]
    fn test_capability_claim_rejects_duplicates() {
        let err = capability_claim(&[
            ResourcePermission::read("users"),
            ResourcePermission::write("users"),
        ])
        .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateResource(r) if r == "users"));
    }

    #[test]
    fn test_decode_claim() {
        let permissions = decode_claim("roles:read topics:write users:read users:write");
        assert_eq!(
            permissions,
            vec![
                ResourcePermission::read("roles"),
                ResourcePermission::write("topics"),
                ResourcePermission::read_write("users"),
            ]
        );
    }
}
