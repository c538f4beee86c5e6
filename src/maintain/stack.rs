// Stacking of near-duplicate records

use crate::catalog::{Catalog, ColumnValue, PhotoRecord};
use crate::error::Result;

/// Join `photo` with matching records; returns the records that were changed.
/// The stack is named after the uid of its lowest-id member.
pub fn stack(
    catalog: &dyn Catalog,
    photo: &mut PhotoRecord,
    by_meta: bool,
    by_uuid: bool,
) -> Result<Vec<PhotoRecord>> {
    if !by_meta && !by_uuid {
        return Ok(Vec::new());
    }

    let candidates = catalog.find_stack_candidates(photo, by_meta, by_uuid)?;
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let stack_uid = candidates
        .iter()
        .chain(std::iter::once(&*photo))
        .min_by_key(|p| p.id)
        .map(|p| p.uid.clone())
        .unwrap_or_default();

    let mut merged = Vec::new();
    for mut other in candidates {
        if other.stack_uid == stack_uid {
            continue;
        }
        catalog.update_columns(other.id, &[("stack_uid", ColumnValue::text(&stack_uid))])?;
        other.stack_uid = stack_uid.clone();
        merged.push(other);
    }

    if photo.stack_uid != stack_uid {
        log::debug!("Stack: {} joins stack {}", photo.uid, stack_uid);
        photo.stack_uid = stack_uid;
    }

    Ok(merged)
}
