//! Pure reconciliation algorithms.
//!
//! - `myers`: shortest Insert/Remove edit script between child-id sequences
//! - `batch`: compact binary + base64 transport of an edit script
//!
//! Everything here is a pure function with no shared state, safe to call
//! concurrently for independent subtrees.

mod batch;
mod myers;

pub use batch::{decode_batch, decode_raw, encode_batch, encode_raw};
pub use myers::{apply_edit_script, diff_indices, edit_script, Edit, EditOp, OpKind};

#[cfg(feature = "parallel")]
pub use myers::edit_scripts_par;
