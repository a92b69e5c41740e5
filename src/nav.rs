// Navigation state: where the shell currently is in the remote tree.

use crate::api::ROOT_FOLDER_ID;
use crate::error::{LanzouError, Result};
use crate::models::FolderEntry;

pub const ROOT_FOLDER_NAME: &str = "root";

/// Anything that can list the subfolders of a folder id.
pub trait FolderSource {
    fn list_folders(&self, parent_id: &str) -> Result<Vec<FolderEntry>>;
}

/// Current folder plus the ancestors needed to walk back up with `..`.
///
/// The stack always holds the `(id, name)` pairs visited since the last
/// reset, so `path()` can be computed without asking the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    current_id: String,
    current_name: String,
    stack: Vec<(String, String)>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self {
            current_id: ROOT_FOLDER_ID.to_string(),
            current_name: ROOT_FOLDER_NAME.to_string(),
            stack: Vec::new(),
        }
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_id(&self) -> &str {
        &self.current_id
    }

    pub fn current_name(&self) -> &str {
        &self.current_name
    }

    pub fn is_root(&self) -> bool {
        self.stack.is_empty()
    }

    /// `/root/a/b` style display path.
    pub fn path(&self) -> String {
        self.stack
            .iter()
            .map(|(_, name)| name.as_str())
            .chain(std::iter::once(self.current_name.as_str()))
            .fold(String::new(), |mut path, name| {
                path.push('/');
                path.push_str(name);
                path
            })
    }

    /// Enter the child folder `name`, the parent for `..`, or the root
    /// for `/`.
    ///
    /// On any failure the state is left untouched.
    pub fn cd<S: FolderSource + ?Sized>(&mut self, source: &S, name: &str) -> Result<()> {
        match name {
            ".." => return self.up(),
            "/" => {
                self.reset();
                return Ok(());
            }
            _ => {}
        }
        let folders = source.list_folders(&self.current_id)?;
        let target = folders
            .into_iter()
            .find(|f| f.name == name)
            .ok_or_else(|| LanzouError::FolderNotFound(name.to_string()))?;

        let previous_id = std::mem::replace(&mut self.current_id, target.folder_id);
        let previous_name = std::mem::replace(&mut self.current_name, target.name);
        self.stack.push((previous_id, previous_name));
        Ok(())
    }

    /// Return to the parent folder.
    pub fn up(&mut self) -> Result<()> {
        let (id, name) = self.stack.pop().ok_or(LanzouError::AlreadyAtRoot)?;
        self.current_id = id;
        self.current_name = name;
        Ok(())
    }

    /// Jump back to the root and forget the ancestors.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
