//! Pin verification sub-checks of Pinned-Dependencies.
//!
//! Each file-based sub-check threads a `bool` accumulator through the file
//! iteration. It starts at `true` and is ANDed with every file's outcome,
//! so a repository without matching files counts as pinned.

pub mod actions;
pub mod docker_image;
pub mod downloads;
pub mod lockfile;

use crate::logger::DetailLogger;
use crate::result::SubScore;

/// Map a sub-check outcome to a score, noting what passed.
pub fn create_return_values(pinned: bool, info_message: &str, dl: &mut DetailLogger) -> SubScore {
    if !pinned {
        return SubScore::min();
    }
    dl.info(info_message);
    SubScore::max()
}
