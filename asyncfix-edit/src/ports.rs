use std::io::Write;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use tempfile::NamedTempFile;

/// Access to the source files a run reads and rewrites.
///
/// Paths are relative to [`SourceFiles::root`] unless absolute, which is how compilers usually
/// report them.
pub trait SourceFiles {
    fn root(&self) -> &Utf8Path;

    fn read_to_string(&self, rel: &Utf8Path) -> anyhow::Result<String>;

    /// Replace the file's contents in one step; readers never observe a partial write.
    fn write_atomic(&self, rel: &Utf8Path, contents: &str) -> anyhow::Result<()>;

    /// Store `contents` at `<file><suffix>` and return that path.
    fn write_backup(
        &self,
        rel: &Utf8Path,
        suffix: &str,
        contents: &str,
    ) -> anyhow::Result<Utf8PathBuf>;
}

/// File-system backed `SourceFiles`.
#[derive(Debug, Clone)]
pub struct FsSourceFiles {
    root: Utf8PathBuf,
}

impl FsSourceFiles {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    fn abs(&self, rel: &Utf8Path) -> Utf8PathBuf {
        if rel.is_absolute() {
            rel.to_path_buf()
        } else {
            self.root.join(rel)
        }
    }
}

impl SourceFiles for FsSourceFiles {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn read_to_string(&self, rel: &Utf8Path) -> anyhow::Result<String> {
        let abs = self.abs(rel);
        fs::read_to_string(&abs).with_context(|| format!("read {}", abs))
    }

    fn write_atomic(&self, rel: &Utf8Path, contents: &str) -> anyhow::Result<()> {
        let abs = self.abs(rel);
        let dir = match abs.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };

        // The temp file is created 0600; the replaced file keeps its own mode.
        let permissions = fs::metadata(&abs).ok().map(|meta| meta.permissions());

        // Same directory, so the final rename never crosses a filesystem.
        let mut tmp =
            NamedTempFile::new_in(dir).with_context(|| format!("create temp file in {}", dir))?;
        tmp.write_all(contents.as_bytes())
            .with_context(|| format!("write temp file for {}", abs))?;
        if let Some(permissions) = permissions {
            tmp.as_file()
                .set_permissions(permissions)
                .with_context(|| format!("copy permissions of {}", abs))?;
        }
        tmp.persist(&abs)
            .map_err(|err| err.error)
            .with_context(|| format!("replace {}", abs))?;
        Ok(())
    }

    fn write_backup(
        &self,
        rel: &Utf8Path,
        suffix: &str,
        contents: &str,
    ) -> anyhow::Result<Utf8PathBuf> {
        let backup = Utf8PathBuf::from(format!("{rel}{suffix}"));
        let abs = self.abs(&backup);
        fs::write(&abs, contents).with_context(|| format!("write backup {}", abs))?;
        Ok(backup)
    }
}
