//! Persisted update cursor: a plain-integer text file holding the next
//! expected `update_id`. Written after every processed batch, never rewound.

use std::{fs, path::PathBuf};

use ideabot_core::{domain::UpdateId, Result};

#[derive(Clone, Debug)]
pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `None` when the file is missing, empty, or corrupt; a corrupt value
    /// triggers an initialization run, which can skip updates but never
    /// duplicate them.
    pub fn load(&self) -> Result<Option<UpdateId>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let txt = fs::read_to_string(&self.path)?;
        let trimmed = txt.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        match trimmed.parse::<i64>() {
            Ok(v) => Ok(Some(UpdateId(v))),
            Err(_) => {
                eprintln!(
                    "[bridge] ignoring corrupt cursor file {}: {trimmed:?}",
                    self.path.display()
                );
                Ok(None)
            }
        }
    }

    pub fn save(&self, cursor: UpdateId) -> Result<()> {
        fs::write(&self.path, cursor.0.to_string())?;
        Ok(())
    }
}
