//! PATCH operation evaluation (RFC 7644 §3.5.2).

mod evaluator;
mod path;

pub use evaluator::{
    MemberSnapshot, MembershipOp, PatchConfig, PatchOpKind, PatchOperationInput, PatchOutcome,
    apply_patch,
};
pub use path::{TargetPath, is_empty_form, remove_at, set_at};
