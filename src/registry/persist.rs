//! Writing dirty containers back to disk.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use super::{Registry, Side};
use crate::container::Container;
use crate::util::{Error, Result};

impl Registry {
    /// Flush every dirty container, leaf first.
    ///
    /// Each container is written to `~<name>` beside the original, detached
    /// from its mapping, renamed over the original and reopened. The two
    /// files are replaced independently. A container that fails to save
    /// stays dirty and readable.
    pub fn save(&mut self) -> Result<()> {
        for side in Side::ALL {
            let slot = &mut self.slots[side.slot()];
            if !slot.dirty {
                continue;
            }
            save_container(&mut slot.container)?;
            slot.dirty = false;
        }
        Ok(())
    }
}

fn save_container(container: &mut Container) -> Result<()> {
    let path = container
        .path()
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::other(format!("{} has no backing file", container.name())))?;
    let temp = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("~{}", container.name()));

    info!("saving {}", path.display());
    container.write_file(&temp)?;

    // Windows refuses to replace a file that is still mapped.
    container.detach();
    if let Err(err) = fs::rename(&temp, &path) {
        if let Err(cleanup) = fs::remove_file(&temp) {
            warn!("could not remove {}: {cleanup}", temp.display());
        }
        return Err(err.into());
    }
    container.reopen(&path)
}
