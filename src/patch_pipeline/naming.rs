//! Output names for patches and their augmented replicas.
//!
//! `{image}_{index:04}[_train][_aug{k:03}]`. The index is zero-padded to four
//! digits; larger indices widen the field, which breaks the fixed-width
//! ordering of file listings, so they are reported rather than reformatted.

use tracing::warn;

/// First linear index that no longer fits the four-digit field.
pub const INDEX_FIELD_LIMIT: usize = 10_000;

pub fn patch_name(image_name: &str, linear_index: usize, train_suffix: bool) -> String {
    if linear_index >= INDEX_FIELD_LIMIT {
        warn!(
            image = image_name,
            linear_index,
            "Patch index exceeds the 4-digit name field"
        );
    }
    if train_suffix {
        format!("{image_name}_{linear_index:04}_train")
    } else {
        format!("{image_name}_{linear_index:04}")
    }
}

pub fn replica_name(patch_name: &str, replica: usize) -> String {
    format!("{patch_name}_aug{replica:03}")
}

/// True for names produced by [`replica_name`].
pub fn is_replica(name: &str) -> bool {
    name.rsplit_once("_aug")
        .map(|(_, suffix)| suffix.len() >= 3 && suffix.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// True when `name` is a patch (or replica) of `image_name`.
pub fn belongs_to_image(name: &str, image_name: &str) -> bool {
    name.strip_prefix(image_name)
        .and_then(|rest| rest.strip_prefix('_'))
        .map(|rest| rest.len() >= 4 && rest.bytes().take(4).all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_name_padding() {
        assert_eq!(patch_name("S1A_0512", 7, false), "S1A_0512_0007");
        assert_eq!(patch_name("S1A_0512", 7, true), "S1A_0512_0007_train");
        assert_eq!(patch_name("img", 12345, false), "img_12345");
    }

    #[test]
    fn test_index_field_widens_past_limit() {
        let last_fixed = patch_name("img", INDEX_FIELD_LIMIT - 1, false);
        let first_wide = patch_name("img", INDEX_FIELD_LIMIT, false);
        assert_eq!(last_fixed, "img_9999");
        assert_eq!(first_wide, "img_10000");
        assert_eq!(first_wide.len(), last_fixed.len() + 1);
        assert!(belongs_to_image(&first_wide, "img"));
    }

    #[test]
    fn test_replica_name() {
        assert_eq!(replica_name("img_0042_train", 5), "img_0042_train_aug005");
        assert!(is_replica("img_0042_train_aug005"));
        assert!(!is_replica("img_0042_train"));
    }

    #[test]
    fn test_belongs_to_image() {
        assert!(belongs_to_image("scene_0001", "scene"));
        assert!(belongs_to_image("scene_0001_train_aug010", "scene"));
        assert!(!belongs_to_image("scene_b_0001", "scene"));
        assert!(!belongs_to_image("scenery_0001", "scene"));
    }
}
