//! Depth-first file walk that honours the directory policy

use crate::context::DirectoryPolicy;
use crate::types::DirectorySkipRecord;
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A regular file found in an admitted directory
#[derive(Debug)]
pub struct WalkedFile {
    pub path: PathBuf,
    /// Logical size, or the error met while reading metadata
    pub size: io::Result<u64>,
}

/// Lazily yields the files of every admitted directory under a root
///
/// The policy is asked about each directory before it is listed, the root
/// included. A denied directory is neither listed nor descended; instead
/// every file below it is passed to the pruned-file callback with its size
/// so callers can still account for the bytes. Symlinks are not followed.
pub struct DirectoryWalker<'a, P, F>
where
    P: DirectoryPolicy + ?Sized,
    F: FnMut(&Path, u64),
{
    base: PathBuf,
    policy: &'a P,
    on_pruned_file: F,
    stack: Vec<PathBuf>,
    ready: VecDeque<WalkedFile>,
    directory_skips: Vec<DirectorySkipRecord>,
    started: bool,
}

impl<'a, P> DirectoryWalker<'a, P, fn(&Path, u64)>
where
    P: DirectoryPolicy + ?Sized,
{
    /// Walker that discards pruned files
    pub fn without_pruned_callback(root: &Path, policy: &'a P) -> Self {
        fn ignore(_path: &Path, _size: u64) {}
        DirectoryWalker::new(root, policy, ignore as fn(&Path, u64))
    }
}

impl<'a, P, F> DirectoryWalker<'a, P, F>
where
    P: DirectoryPolicy + ?Sized,
    F: FnMut(&Path, u64),
{
    pub fn new(root: &Path, policy: &'a P, on_pruned_file: F) -> Self {
        Self {
            base: root.to_path_buf(),
            policy,
            on_pruned_file,
            stack: Vec::new(),
            ready: VecDeque::new(),
            directory_skips: Vec::new(),
            started: false,
        }
    }

    /// System skip records for directories denied so far
    pub fn take_directory_skips(&mut self) -> Vec<DirectorySkipRecord> {
        std::mem::take(&mut self.directory_skips)
    }

    /// Ask the policy about `directory`; prune it when denied
    fn admit(&mut self, directory: &Path) -> bool {
        let decision = self.policy.evaluate(directory);
        if !decision.skip {
            return true;
        }

        let reason = decision
            .reason
            .unwrap_or_else(|| "Excluded system directory".to_string());
        log::debug!(
            "Skipping system directory {}: {}",
            directory.display(),
            reason
        );
        self.directory_skips
            .push(DirectorySkipRecord::system(directory, &self.base, reason));
        self.report_pruned(directory);
        false
    }

    fn report_pruned(&mut self, directory: &Path) {
        for entry in WalkDir::new(directory).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            match entry.metadata() {
                Ok(meta) => (self.on_pruned_file)(entry.path(), meta.len()),
                Err(e) => log::debug!(
                    "Unable to size pruned file {}: {}",
                    entry.path().display(),
                    e
                ),
            }
        }
    }

    /// List one admitted directory
    fn expand(&mut self, directory: &Path) {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("Unable to read directory {}: {}", directory.display(), e);
                return;
            }
        };

        let mut subdirectories = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::debug!("Unable to read entry in {}: {}", directory.display(), e);
                    continue;
                }
            };
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                subdirectories.push(entry.path());
            } else if file_type.is_file() {
                self.ready.push_back(WalkedFile {
                    size: entry.metadata().map(|meta| meta.len()),
                    path: entry.path(),
                });
            }
        }

        let admitted: Vec<PathBuf> = subdirectories
            .into_iter()
            .filter(|dir| self.admit(dir))
            .collect();
        self.stack.extend(admitted.into_iter().rev());
    }
}

impl<P, F> Iterator for DirectoryWalker<'_, P, F>
where
    P: DirectoryPolicy + ?Sized,
    F: FnMut(&Path, u64),
{
    type Item = WalkedFile;

    fn next(&mut self) -> Option<WalkedFile> {
        if !self.started {
            self.started = true;
            let root = self.base.clone();
            if self.admit(&root) {
                self.stack.push(root);
            }
        }

        loop {
            if let Some(file) = self.ready.pop_front() {
                return Some(file);
            }
            let directory = self.stack.pop()?;
            self.expand(&directory);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AllowAll;
    use crate::types::{DirectoryDecision, SkipCategory};
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn write(path: &Path, len: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![b'x'; len]).unwrap();
    }

    fn deny_named(name: &'static str) -> impl Fn(&Path) -> DirectoryDecision + Sync {
        move |dir: &Path| {
            if dir.file_name().is_some_and(|n| n == name) {
                DirectoryDecision::deny(format!("{name} is protected"))
            } else {
                DirectoryDecision::allow()
            }
        }
    }

    #[test]
    fn test_yields_every_file_when_allowed() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("a.txt"), 10);
        write(&tmp.path().join("sub/b.txt"), 20);
        write(&tmp.path().join("sub/deeper/c.txt"), 30);

        let files: BTreeSet<PathBuf> = DirectoryWalker::without_pruned_callback(tmp.path(), &AllowAll)
            .map(|f| f.path)
            .collect();

        assert_eq!(files.len(), 3);
        assert!(files.contains(&tmp.path().join("sub/deeper/c.txt")));
    }

    #[test]
    fn test_reports_sizes() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("a.bin"), 1234);

        let file = DirectoryWalker::without_pruned_callback(tmp.path(), &AllowAll)
            .next()
            .unwrap();
        assert_eq!(file.size.unwrap(), 1234);
    }

    #[test]
    fn test_denied_directory_is_pruned_and_accounted() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("keep/a.txt"), 10);
        write(&tmp.path().join("vault/b.txt"), 100);
        write(&tmp.path().join("vault/inner/c.txt"), 1000);
        write(&tmp.path().join("vault/inner/more/d.txt"), 5);

        let policy = deny_named("vault");
        let mut pruned_bytes = 0u64;
        let mut pruned_files = 0usize;
        let mut walker = DirectoryWalker::new(tmp.path(), &policy, |_: &Path, size: u64| {
            pruned_bytes += size;
            pruned_files += 1;
        });

        let yielded: Vec<PathBuf> = walker.by_ref().map(|f| f.path).collect();
        let skips = walker.take_directory_skips();
        drop(walker);

        assert_eq!(yielded, vec![tmp.path().join("keep/a.txt")]);
        assert_eq!(pruned_bytes, 1105);
        assert_eq!(pruned_files, 3);
        assert_eq!(skips.len(), 1);
        assert_eq!(skips[0].category, SkipCategory::System);
        assert_eq!(skips[0].relative_path, "vault");
        assert_eq!(skips[0].reason, "vault is protected");
    }

    #[test]
    fn test_denied_root_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("vault");
        write(&root.join("a.txt"), 7);
        write(&root.join("b/c.txt"), 8);

        let policy = deny_named("vault");
        let mut pruned = 0u64;
        let mut walker = DirectoryWalker::new(&root, &policy, |_: &Path, size: u64| pruned += size);
        assert!(walker.next().is_none());
        let skips = walker.take_directory_skips();
        drop(walker);

        assert_eq!(pruned, 15);
        assert_eq!(skips.len(), 1);
        assert_eq!(skips[0].relative_path, ".");
    }

    #[test]
    fn test_skip_without_reason_gets_default() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("sys")).unwrap();

        let policy = |dir: &Path| DirectoryDecision {
            skip: dir.ends_with("sys"),
            reason: None,
        };
        let mut walker = DirectoryWalker::without_pruned_callback(tmp.path(), &policy);
        assert!(walker.next().is_none());
        let skips = walker.take_directory_skips();
        assert_eq!(skips[0].reason, "Excluded system directory");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directories_are_not_followed() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("real/a.txt"), 10);
        std::os::unix::fs::symlink(tmp.path().join("real"), tmp.path().join("link")).unwrap();

        let files: Vec<PathBuf> = DirectoryWalker::without_pruned_callback(tmp.path(), &AllowAll)
            .map(|f| f.path)
            .collect();
        assert_eq!(files, vec![tmp.path().join("real/a.txt")]);
    }
}
