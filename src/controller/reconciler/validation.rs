//! # Validation
//!
//! Validates the generated cluster identifier before it is persisted.

use thiserror::Error;
use uuid::{Uuid, Variant};

/// Validation failure of a generated desired config
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid clusterID {id:?}, must be an RFC4122-variant UUID: found {variant:?}")]
    ClusterIdVariant { id: Uuid, variant: Variant },
    #[error("invalid clusterID {id:?}, must be a version-4 UUID: found version {version}")]
    ClusterIdVersion { id: Uuid, version: usize },
}

/// Check that a cluster identifier is an RFC4122-variant, version-4 (random) UUID
pub fn validate_cluster_id(id: &Uuid) -> Result<(), ValidationError> {
    let variant = id.get_variant();
    if variant != Variant::RFC4122 {
        return Err(ValidationError::ClusterIdVariant { id: *id, variant });
    }

    let version = id.get_version_num();
    if version != 4 {
        return Err(ValidationError::ClusterIdVersion { id: *id, version });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_uuid_is_valid() {
        assert_eq!(validate_cluster_id(&Uuid::new_v4()), Ok(()));
    }

    #[test]
    fn test_nil_uuid_has_wrong_variant() {
        let result = validate_cluster_id(&Uuid::nil());
        assert!(matches!(
            result,
            Err(ValidationError::ClusterIdVariant {
                variant: Variant::NCS,
                ..
            })
        ));
    }

    #[test]
    fn test_microsoft_variant_rejected() {
        let id = Uuid::parse_str("00000000-0000-4000-c000-000000000000").unwrap();
        assert!(matches!(
            validate_cluster_id(&id),
            Err(ValidationError::ClusterIdVariant {
                variant: Variant::Microsoft,
                ..
            })
        ));
    }

    #[test]
    fn test_version_one_rejected() {
        // DNS namespace UUID: RFC4122 variant, time-based version 1
        let id = Uuid::parse_str("6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap();
        assert_eq!(
            validate_cluster_id(&id),
            Err(ValidationError::ClusterIdVersion { id, version: 1 })
        );
    }

    #[test]
    fn test_error_message_names_the_id() {
        let id = Uuid::parse_str("6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap();
        let message = validate_cluster_id(&id).unwrap_err().to_string();
        assert!(message.contains("6ba7b810-9dad-11d1-80b4-00c04fd430c8"));
        assert!(message.contains("version-4"));
    }
}
