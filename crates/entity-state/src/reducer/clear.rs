//! `Clear`: reset every engine-owned field of the slice, keeping host fields.

use super::Reduction;
use crate::domain::EntitySlice;

pub(super) fn reduce(slice: &EntitySlice) -> Reduction {
    if slice.is_pristine() {
        return Reduction::Unchanged;
    }
    Reduction::edit(EntitySlice::reset)
}
