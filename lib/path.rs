use std::fmt::{self, Display};

use typed_path::{Utf8UnixComponent, Utf8UnixPath};

use crate::{
    HostMount, MountQuery, UnionPathError, UnionPathResult, OPAQUE_XATTR, OPAQUE_XATTR_VALUE,
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The filename prefix marking a file in a lower layer as deleted (AUFS convention).
pub const WHITEOUT_PREFIX: &str = ".wh.";

/// The filename marking a directory's lower-layer contents as erased (AUFS convention).
pub const OPAQUE_WHITEOUT: &str = ".wh..wh..opq";

/// The path segment delimiter. Layer paths are always POSIX paths, independent
/// of the host platform.
pub const DIR_SEPARATOR: &str = "/";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A file path within a single layer's namespace.
///
/// Construction does not normalize; callers call [`Path::normalize`] before
/// relying on the normalized-form invariants (no trailing separator except
/// root, no accidental leading spaces). All derivations return new `Path`
/// values.
///
/// The derived `Ord` compares the underlying strings lexicographically, so a
/// sorted [`Paths`] gives a deterministic, repeatable traversal order for
/// building a merged tree top-down.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(String);

/// An ordered sequence of [`Path`] values.
pub type Paths = Vec<Path>;

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Path {
    /// Returns the underlying path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the cleaned representation of the path: leading spaces
    /// trimmed, trailing separators stripped, `.` and `..` segments resolved
    /// and repeated separators collapsed. An empty result normalizes to the
    /// root path.
    ///
    /// Trailing whitespace is legal filename content, so a path made entirely
    /// of spaces passes through untouched rather than being mistaken for
    /// accidental padding.
    pub fn normalize(&self) -> Path {
        let mut trimmed = self.0.as_str();
        if trimmed.chars().any(|c| c != ' ') {
            trimmed = trimmed.trim_start_matches(' ');
        }

        let trimmed = trimmed.trim_end_matches(DIR_SEPARATOR);

        // special case for root "/"
        if trimmed.is_empty() {
            return Path::from(DIR_SEPARATOR);
        }

        Path(clean(trimmed))
    }

    /// Indicates if the path starts with the separator.
    pub fn is_absolute_path(&self) -> bool {
        self.0.starts_with(DIR_SEPARATOR)
    }

    /// The basename of the path (i.e. filename). The root path's basename is
    /// the separator itself.
    pub fn basename(&self) -> &str {
        let trimmed = self.0.trim_end_matches(DIR_SEPARATOR);
        if trimmed.is_empty() {
            return if self.0.is_empty() { "." } else { DIR_SEPARATOR };
        }
        trimmed.rsplit(DIR_SEPARATOR).next().unwrap_or(trimmed)
    }

    /// Indicates if the basename is an opaque whiteout marker, meaning all
    /// lower-layer contents of the parent directory should be ignored during
    /// squashing.
    pub fn is_dir_whiteout(&self) -> bool {
        self.basename() == OPAQUE_WHITEOUT
    }

    /// Indicates if the basename has a whiteout prefix, meaning the named
    /// file should be removed during squashing.
    ///
    /// Opaque whiteout markers also answer `true` here since their name
    /// starts with the whiteout prefix; callers that care about the
    /// distinction must check [`Path::is_dir_whiteout`] first.
    pub fn is_whiteout(&self) -> bool {
        self.basename().starts_with(WHITEOUT_PREFIX)
    }

    /// Indicates if the parent directory of this path carries the opaque
    /// extended attribute on the host filesystem (overlayfs convention).
    ///
    /// Any failure to read the attribute collapses to `false`: an absent
    /// attribute and an unreadable one are the same absence of opacity to
    /// the classifier.
    pub fn is_dir_whiteout_mount(&self) -> bool {
        self.is_dir_whiteout_mount_with(&HostMount)
    }

    /// Like [`Path::is_dir_whiteout_mount`], against an injected
    /// [`MountQuery`] instead of the host filesystem.
    pub fn is_dir_whiteout_mount_with(&self, query: &impl MountQuery) -> bool {
        let dir = self.dirname();
        match query.read_xattr(&dir, OPAQUE_XATTR) {
            Ok(Some(value)) => value.as_slice() == OPAQUE_XATTR_VALUE.as_bytes(),
            Ok(None) => false,
            Err(e) => {
                tracing::trace!(dir = %dir, error = %e, "opaque attribute unreadable, treating as not opaque");
                false
            }
        }
    }

    /// Indicates if the path exists on the host filesystem as a character
    /// device special file (overlayfs convention for a deleted file).
    ///
    /// Any stat failure, including not-found, collapses to `false`.
    pub fn is_whiteout_mount(&self) -> bool {
        self.is_whiteout_mount_with(&HostMount)
    }

    /// Like [`Path::is_whiteout_mount`], against an injected [`MountQuery`]
    /// instead of the host filesystem.
    pub fn is_whiteout_mount_with(&self, query: &impl MountQuery) -> bool {
        match query.is_char_device(self.as_str()) {
            Ok(char_device) => char_device,
            Err(e) => {
                tracing::trace!(path = %self, error = %e, "stat failed, treating as not a whiteout");
                false
            }
        }
    }

    /// A representation of the current path with no whiteout prefixes (AUFS
    /// convention).
    ///
    /// An opaque whiteout marker names its parent directory, so it resolves
    /// to the parent itself; any other whiteout resolves to the parent joined
    /// with the basename stripped of the whiteout prefix.
    pub fn un_whiteout_path(&self) -> UnionPathResult<Path> {
        let basename = self.basename();
        if basename.starts_with(OPAQUE_WHITEOUT) {
            return self.parent_path();
        }

        let parent = self.parent_path()?;
        let name = basename.strip_prefix(WHITEOUT_PREFIX).unwrap_or(basename);

        Ok(join(parent.as_str(), name))
    }

    /// A representation of the current path with no whiteout markers
    /// (overlayfs convention), against the host filesystem.
    pub fn un_whiteout_path_mount(&self) -> UnionPathResult<Path> {
        self.un_whiteout_path_mount_with(&HostMount)
    }

    /// Like [`Path::un_whiteout_path_mount`], against an injected
    /// [`MountQuery`].
    pub fn un_whiteout_path_mount_with(&self, query: &impl MountQuery) -> UnionPathResult<Path> {
        if self.is_dir_whiteout_mount_with(query) {
            return self.parent_path();
        }

        // A character device whiteout carries no encoded name to strip; the
        // device's own deletion is the deletion act, leaving the containing
        // directory.
        self.parent_path()
    }

    /// Returns the path of the current file's parent directory, or errors out
    /// if there is no parent (root has no parent).
    pub fn parent_path(&self) -> UnionPathResult<Path> {
        let (dir, file) = match self.0.rfind(DIR_SEPARATOR) {
            Some(idx) => self.0.split_at(idx + 1),
            None => ("", self.0.as_str()),
        };

        let sanitized = Path::from(dir).normalize();
        if sanitized.as_str() == DIR_SEPARATOR {
            if !file.is_empty() {
                return Ok(sanitized);
            }
            return Err(UnionPathError::NoParent(self.clone()));
        }

        Ok(sanitized)
    }

    /// Returns all constituent paths for the current path, not including the
    /// current path itself, in top-down order
    /// (e.g. `/home/user/file.txt` -> `/`, `/home`, `/home/user`).
    pub fn constituent_paths(&self) -> Paths {
        let segments: Vec<&str> = self.0.trim_matches('/').split('/').collect();
        (0..segments.len())
            .map(|idx| Path(format!("/{}", segments[..idx].join(DIR_SEPARATOR))))
            .collect()
    }

    /// Returns all constituent paths of the current path plus the current
    /// path itself (e.g. `/home/user/file.txt` -> `/`, `/home`,
    /// `/home/user`, `/home/user/file.txt`). Root is not duplicated.
    pub fn all_paths(&self) -> Paths {
        let mut full_paths = self.constituent_paths();
        if self.0 != DIR_SEPARATOR {
            full_paths.push(self.clone());
        }
        full_paths
    }

    /// The directory portion of the path, without requiring a parent to
    /// exist: the part before the final separator, cleaned, `/` at root and
    /// `.` when the path has no separator at all.
    fn dirname(&self) -> String {
        match self.0.rfind(DIR_SEPARATOR) {
            Some(idx) => {
                let dir = &self.0[..idx];
                if dir.is_empty() {
                    DIR_SEPARATOR.to_string()
                } else {
                    clean(dir)
                }
            }
            None => ".".to_string(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Cleans a non-empty path string: resolves `.` and `..` segments and
/// collapses repeated separators. Absolute paths clamp `..` at root;
/// relative paths keep unresolvable leading `..` segments. An empty relative
/// result cleans to `.`.
fn clean(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let mut is_absolute = false;

    for component in Utf8UnixPath::new(path).components() {
        match component {
            Utf8UnixComponent::RootDir => is_absolute = true,
            Utf8UnixComponent::CurDir => continue,
            Utf8UnixComponent::ParentDir => {
                if segments.last().is_some_and(|segment| *segment != "..") {
                    segments.pop();
                } else if !is_absolute {
                    segments.push("..");
                }
            }
            Utf8UnixComponent::Normal(segment) => {
                if !segment.is_empty() {
                    segments.push(segment);
                }
            }
        }
    }

    if is_absolute {
        format!("/{}", segments.join(DIR_SEPARATOR))
    } else if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join(DIR_SEPARATOR)
    }
}

/// Joins a parent directory with a child name and cleans the result. An
/// empty name joins to the cleaned parent itself.
fn join(parent: &str, name: &str) -> Path {
    if name.is_empty() {
        return Path(clean(parent));
    }
    Path(clean(&format!("{parent}{DIR_SEPARATOR}{name}")))
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl From<&str> for Path {
    fn from(path: &str) -> Self {
        Path(path.to_string())
    }
}

impl From<String> for Path {
    fn from(path: String) -> Self {
        Path(path)
    }
}

impl AsRef<str> for Path {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
