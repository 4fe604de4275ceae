use crate::access::error::ResourceError;
use crate::api::jsonapi::{Linkage, ResourcePayload};

/// Check that every named relationship is present and non-null in a
/// create payload. Reports the first missing name.
pub fn require(names: &[&str], payload: &ResourcePayload) -> Result<(), ResourceError> {
    for name in names {
        match payload.relationships.get(*name) {
            Some(Linkage::One(Some(_))) | Some(Linkage::Many(_)) => {}
            _ => return Err(ResourceError::MissingRelationship((*name).to_string())),
        }
    }
    Ok(())
}
