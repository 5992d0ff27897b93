//! # Field Merge
//!
//! Reconciles incoming fields against the data already stored at a Vault
//! path and decides, field by field, what to write.
//!
//! Existing keys that are not part of the mapping are never removed. With
//! `force_apply` disabled, a mapped key that already holds a different value
//! keeps it.

use crate::crd::FieldMapping;
use crate::vault::{SecretData, VaultError};
use std::borrow::Cow;
use std::collections::HashSet;
use tracing::{debug, info};

/// Anything that can be merged into a Vault path
///
/// Implemented by `VaultBindingSpec` and `VaultMirrorSpec`.
pub trait Mapper {
    /// Overwrite existing fields whose value differs from the source
    fn is_force_apply(&self) -> bool;

    /// Destination Vault path
    fn path(&self) -> &str;

    /// Field selection. Empty means every source field under its own name.
    fn field_mapping(&self) -> &[FieldMapping];
}

/// What the merge decided for a single destination field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAction {
    /// Field did not exist and gets written
    Create,
    /// Field already holds the source value
    Unchanged,
    /// Field holds a different value which is kept
    Preserved,
    /// Field holds a different value which gets replaced
    Overwrite,
}

impl FieldAction {
    /// Whether this action requires a write to Vault
    #[must_use]
    pub fn is_write(self) -> bool {
        matches!(self, FieldAction::Create | FieldAction::Overwrite)
    }
}

/// Result of merging source fields into existing data
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Existing data with all staged changes applied
    pub data: SecretData,
    /// True if at least one field was staged
    pub write_back: bool,
    /// Per destination field decisions, in processing order
    pub actions: Vec<(String, FieldAction)>,
}

impl MergeOutcome {
    /// Number of fields that get written
    #[must_use]
    pub fn written_fields(&self) -> usize {
        self.actions
            .iter()
            .filter(|(_, action)| action.is_write())
            .count()
    }
}

/// Mapping used for a merge
///
/// An empty configured mapping maps every source field to itself, ordered
/// by field name.
#[must_use]
pub fn effective_mapping<'a, M: Mapper + ?Sized>(
    mapper: &'a M,
    src: &SecretData,
) -> Cow<'a, [FieldMapping]> {
    let configured = mapper.field_mapping();
    if !configured.is_empty() {
        return Cow::Borrowed(configured);
    }

    let mut names: Vec<&String> = src.keys().collect();
    names.sort();
    Cow::Owned(names.into_iter().map(FieldMapping::new).collect())
}

/// Merge `src` into `existing` according to the mapper
///
/// Pure function, nothing is written. When the same destination field is
/// mapped more than once the later entry wins.
///
/// # Errors
/// `InvalidFieldMapping` for a mapping without a name and
/// `FieldNotAvailable` if a mapped source field is missing from `src`.
pub fn merge_fields<M: Mapper + ?Sized>(
    mapper: &M,
    existing: SecretData,
    src: &SecretData,
) -> Result<MergeOutcome, VaultError> {
    let force_apply = mapper.is_force_apply();
    let mapping = effective_mapping(mapper, src);

    let mut data = existing;
    let mut staged: HashSet<String> = HashSet::new();
    let mut actions = Vec::with_capacity(mapping.len());

    for field in mapping.iter() {
        field.validate()?;

        let src_field = field.source_field();
        let dst_field = field.destination_field();

        debug!(
            src.field = src_field,
            dst.field = dst_field,
            dst.path = mapper.path(),
            "applying field to vault"
        );

        let Some(src_value) = src.get(src_field) else {
            return Err(VaultError::FieldNotAvailable {
                field: src_field.to_string(),
            });
        };

        let action = match data.get(dst_field) {
            None => FieldAction::Create,
            Some(current) if current == src_value => FieldAction::Unchanged,
            // A value staged by an earlier entry in this pass is replaced
            Some(_) if staged.contains(dst_field) => FieldAction::Overwrite,
            Some(_) if force_apply => FieldAction::Overwrite,
            Some(_) => FieldAction::Preserved,
        };

        match action {
            FieldAction::Create => {
                info!(dst.field = dst_field, "found new field to write");
            }
            FieldAction::Unchanged => {
                debug!(dst.field = dst_field, "skipping field, no update required");
            }
            FieldAction::Preserved => {
                info!(
                    dst.field = dst_field,
                    "skipping field, it already exists in vault and force apply is not enabled"
                );
            }
            FieldAction::Overwrite => {
                info!(dst.field = dst_field, "overwriting existing field");
            }
        }

        if action.is_write() {
            data.insert(dst_field.to_string(), src_value.clone());
            staged.insert(dst_field.to_string());
        }
        actions.push((dst_field.to_string(), action));
    }

    Ok(MergeOutcome {
        data,
        write_back: !staged.is_empty(),
        actions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct TestMapper {
        force_apply: bool,
        fields: Vec<FieldMapping>,
    }

    impl Mapper for TestMapper {
        fn is_force_apply(&self) -> bool {
            self.force_apply
        }

        fn path(&self) -> &str {
            "/food"
        }

        fn field_mapping(&self) -> &[FieldMapping] {
            &self.fields
        }
    }

    fn mapper(force_apply: bool, fields: Vec<FieldMapping>) -> TestMapper {
        TestMapper {
            force_apply,
            fields,
        }
    }

    fn data(value: serde_json::Value) -> SecretData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_empty_mapping_maps_all_fields_sorted() {
        let src = data(json!({"fruit": "banana", "carbs": "pasta"}));
        let binding = mapper(false, vec![]);
        let mapping = effective_mapping(&binding, &src);

        assert_eq!(
            mapping.into_owned(),
            vec![FieldMapping::new("carbs"), FieldMapping::new("fruit")]
        );
    }

    #[test]
    fn test_new_field_is_created() {
        let outcome = merge_fields(
            &mapper(false, vec![]),
            SecretData::new(),
            &data(json!({"fruit": "banana"})),
        )
        .unwrap();

        assert!(outcome.write_back);
        assert_eq!(outcome.data, data(json!({"fruit": "banana"})));
        assert_eq!(
            outcome.actions,
            vec![("fruit".to_string(), FieldAction::Create)]
        );
    }

    #[test]
    fn test_existing_field_is_preserved_without_force() {
        let outcome = merge_fields(
            &mapper(false, vec![]),
            data(json!({"fruit": "strawberry"})),
            &data(json!({"fruit": "banana"})),
        )
        .unwrap();

        assert!(!outcome.write_back);
        assert_eq!(outcome.data, data(json!({"fruit": "strawberry"})));
        assert_eq!(outcome.actions[0].1, FieldAction::Preserved);
    }

    #[test]
    fn test_existing_field_is_overwritten_with_force() {
        let outcome = merge_fields(
            &mapper(true, vec![]),
            data(json!({"fruit": "strawberry"})),
            &data(json!({"fruit": "banana"})),
        )
        .unwrap();

        assert!(outcome.write_back);
        assert_eq!(outcome.data, data(json!({"fruit": "banana"})));
        assert_eq!(outcome.written_fields(), 1);
    }

    #[test]
    fn test_equal_value_is_unchanged() {
        let outcome = merge_fields(
            &mapper(true, vec![]),
            data(json!({"fruit": "banana"})),
            &data(json!({"fruit": "banana"})),
        )
        .unwrap();

        assert!(!outcome.write_back);
        assert_eq!(outcome.actions[0].1, FieldAction::Unchanged);
    }

    #[test]
    fn test_equality_does_not_coerce_types() {
        let outcome = merge_fields(
            &mapper(true, vec![]),
            data(json!({"port": "8200"})),
            &data(json!({"port": 8200})),
        )
        .unwrap();

        assert!(outcome.write_back);
        assert_eq!(outcome.data["port"], json!(8200));
    }

    #[test]
    fn test_unmapped_existing_fields_are_kept() {
        let outcome = merge_fields(
            &mapper(false, vec![FieldMapping::new("vegetable"), FieldMapping::new("sweet")]),
            data(json!({"carbs": "pasta"})),
            &data(json!({"fruit": "banana", "vegetable": "tomato?", "sweet": "icecream"})),
        )
        .unwrap();

        assert!(outcome.write_back);
        assert_eq!(
            outcome.data,
            data(json!({"carbs": "pasta", "vegetable": "tomato?", "sweet": "icecream"}))
        );
    }

    #[test]
    fn test_rename_only_affects_destination() {
        let outcome = merge_fields(
            &mapper(
                false,
                vec![
                    FieldMapping::renamed("vegetable", "fruit"),
                    FieldMapping::new("carbs"),
                ],
            ),
            data(json!({"vegetable": "cucumber"})),
            &data(json!({"vegetable": "tomato?", "carbs": "pasta", "dessert": "icecream"})),
        )
        .unwrap();

        assert_eq!(
            outcome.data,
            data(json!({"vegetable": "cucumber", "fruit": "tomato?", "carbs": "pasta"}))
        );
    }

    #[test]
    fn test_missing_source_field_aborts() {
        let err = merge_fields(
            &mapper(false, vec![FieldMapping::new("vegetable"), FieldMapping::new("z")]),
            SecretData::new(),
            &data(json!({"vegetable": "tomato?"})),
        )
        .unwrap_err();

        match err {
            VaultError::FieldNotAvailable { field } => assert_eq!(field, "z"),
            other => panic!("Expected FieldNotAvailable, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_mapping_name_is_rejected() {
        let err = merge_fields(
            &mapper(false, vec![FieldMapping::new("")]),
            SecretData::new(),
            &data(json!({"fruit": "banana"})),
        )
        .unwrap_err();

        assert!(matches!(err, VaultError::InvalidFieldMapping(_)));
    }

    #[test]
    fn test_later_duplicate_destination_wins() {
        let outcome = merge_fields(
            &mapper(
                false,
                vec![
                    FieldMapping::renamed("apple", "fruit"),
                    FieldMapping::renamed("pear", "fruit"),
                ],
            ),
            SecretData::new(),
            &data(json!({"apple": "red", "pear": "green"})),
        )
        .unwrap();

        assert!(outcome.write_back);
        assert_eq!(outcome.data, data(json!({"fruit": "green"})));
        assert_eq!(
            outcome.actions,
            vec![
                ("fruit".to_string(), FieldAction::Create),
                ("fruit".to_string(), FieldAction::Overwrite),
            ]
        );
    }

    #[test]
    fn test_duplicate_destination_does_not_touch_preserved_value() {
        let outcome = merge_fields(
            &mapper(
                false,
                vec![
                    FieldMapping::renamed("apple", "fruit"),
                    FieldMapping::renamed("pear", "fruit"),
                ],
            ),
            data(json!({"fruit": "yellow"})),
            &data(json!({"apple": "red", "pear": "green"})),
        )
        .unwrap();

        assert!(!outcome.write_back);
        assert_eq!(outcome.data, data(json!({"fruit": "yellow"})));
    }
}
