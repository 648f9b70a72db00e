pub mod atomic;
pub mod backup;
pub mod meta;
pub mod paths;

pub use atomic::{copy_staged, fsync_parent_dir, write_atomic};
pub use backup::{backup_path_with_tag, move_aside, restore_from};
pub use meta::{kind_of, modified_of, sha256_hex_of};
pub use paths::{file_stem_for, is_safe_path};
