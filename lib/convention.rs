use crate::{HostMount, MountQuery, Path, UnionPathResult};

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// A whiteout encoding strategy.
///
/// The two historical encodings of deletion intent — the AUFS name-based
/// convention and the overlayfs attribute-based convention — answer the same
/// three questions for a squashing engine: does this path delete a single
/// lower-layer file, does it erase a lower-layer directory's contents, and
/// what real path does the marker refer to. The engine picks the convention
/// once per layer format and drives the rest of the merge through this trait.
///
/// As with the underlying predicates, an opaque directory marker also counts
/// as a file deletion under the name-based convention; callers distinguishing
/// the two check [`WhiteoutConvention::is_dir_opaque`] first.
pub trait WhiteoutConvention {
    /// Indicates if the path marks a single lower-layer file as deleted.
    fn is_file_deletion(&self, path: &Path) -> bool;

    /// Indicates if the path marks a directory's lower-layer contents as
    /// erased.
    fn is_dir_opaque(&self, path: &Path) -> bool;

    /// Derives the real path the marker refers to. Fails with
    /// [`UnionPathError::NoParent`](crate::UnionPathError::NoParent) on the
    /// root path.
    fn resolve(&self, path: &Path) -> UnionPathResult<Path>;
}

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The AUFS name-based whiteout convention: deletion intent is encoded in
/// reserved filenames inside the layer's entry listing, so classification is
/// pure string work and never touches a filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct AufsWhiteout;

/// The overlayfs attribute-based whiteout convention: a deleted file shows up
/// as a character device, an opaque directory carries an extended attribute.
/// Classification goes through the given [`MountQuery`].
#[derive(Clone, Copy, Debug, Default)]
pub struct OverlayWhiteout<Q = HostMount> {
    query: Q,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl OverlayWhiteout {
    /// Creates an overlay convention backed by the host filesystem.
    pub fn host() -> Self {
        Self { query: HostMount }
    }
}

impl<Q: MountQuery> OverlayWhiteout<Q> {
    /// Creates an overlay convention backed by the given query.
    pub fn new(query: Q) -> Self {
        Self { query }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl WhiteoutConvention for AufsWhiteout {
    fn is_file_deletion(&self, path: &Path) -> bool {
        path.is_whiteout()
    }

    fn is_dir_opaque(&self, path: &Path) -> bool {
        path.is_dir_whiteout()
    }

    fn resolve(&self, path: &Path) -> UnionPathResult<Path> {
        path.un_whiteout_path()
    }
}

impl<Q: MountQuery> WhiteoutConvention for OverlayWhiteout<Q> {
    fn is_file_deletion(&self, path: &Path) -> bool {
        path.is_whiteout_mount_with(&self.query)
    }

    fn is_dir_opaque(&self, path: &Path) -> bool {
        path.is_dir_whiteout_mount_with(&self.query)
    }

    fn resolve(&self, path: &Path) -> UnionPathResult<Path> {
        path.un_whiteout_path_mount_with(&self.query)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::{
        collections::{HashMap, HashSet},
        io,
    };

    use super::*;
    use crate::{UnionPathError, OPAQUE_XATTR, OPAQUE_XATTR_VALUE};

    /// An in-memory stand-in for a mounted overlay upper layer.
    #[derive(Default)]
    struct FakeMount {
        char_devices: HashSet<String>,
        xattrs: HashMap<(String, String), Vec<u8>>,
    }

    impl FakeMount {
        fn with_char_device(mut self, path: &str) -> Self {
            self.char_devices.insert(path.to_string());
            self
        }

        fn with_opaque_dir(mut self, path: &str) -> Self {
            self.xattrs.insert(
                (path.to_string(), OPAQUE_XATTR.to_string()),
                OPAQUE_XATTR_VALUE.as_bytes().to_vec(),
            );
            self
        }
    }

    impl MountQuery for FakeMount {
        fn is_char_device(&self, path: &str) -> io::Result<bool> {
            if self.char_devices.contains(path) {
                return Ok(true);
            }
            if self.xattrs.keys().any(|(p, _)| p == path) {
                return Ok(false);
            }
            Err(io::Error::from(io::ErrorKind::NotFound))
        }

        fn read_xattr(&self, path: &str, name: &str) -> io::Result<Option<Vec<u8>>> {
            Ok(self
                .xattrs
                .get(&(path.to_string(), name.to_string()))
                .cloned())
        }
    }

    #[test]
    fn test_aufs_convention_classification() {
        let convention = AufsWhiteout;

        assert!(convention.is_file_deletion(&Path::from("/a/.wh.b")));
        assert!(!convention.is_file_deletion(&Path::from("/a/b")));

        assert!(convention.is_dir_opaque(&Path::from("/a/.wh..wh..opq")));
        assert!(!convention.is_dir_opaque(&Path::from("/a/.wh.b")));

        // Opaque markers are whiteouts too; dir opacity is the narrower check.
        assert!(convention.is_file_deletion(&Path::from("/a/.wh..wh..opq")));
    }

    #[test]
    fn test_aufs_convention_resolve() {
        let convention = AufsWhiteout;

        assert_eq!(
            convention.resolve(&Path::from("/a/.wh.b")).unwrap(),
            Path::from("/a/b")
        );
        assert_eq!(
            convention.resolve(&Path::from("/a/.wh..wh..opq")).unwrap(),
            Path::from("/a")
        );
        assert!(matches!(
            convention.resolve(&Path::from("/")),
            Err(UnionPathError::NoParent(_))
        ));
    }

    #[test]
    fn test_overlay_convention_file_deletion() {
        let convention = OverlayWhiteout::new(FakeMount::default().with_char_device("/upper/etc/passwd"));

        assert!(convention.is_file_deletion(&Path::from("/upper/etc/passwd")));
        assert!(!convention.is_file_deletion(&Path::from("/upper/etc/group")));
    }

    #[test]
    fn test_overlay_convention_dir_opacity() {
        let convention = OverlayWhiteout::new(FakeMount::default().with_opaque_dir("/upper/etc"));

        assert!(convention.is_dir_opaque(&Path::from("/upper/etc/passwd")));
        assert!(!convention.is_dir_opaque(&Path::from("/upper/var/log")));
    }

    #[test]
    fn test_overlay_convention_resolve() {
        let convention = OverlayWhiteout::new(
            FakeMount::default()
                .with_char_device("/upper/etc/passwd")
                .with_opaque_dir("/upper/etc"),
        );

        // Both the device whiteout and the opaque attribute resolve to the
        // directory containing them.
        assert_eq!(
            convention.resolve(&Path::from("/upper/etc/passwd")).unwrap(),
            Path::from("/upper/etc")
        );
        assert!(matches!(
            convention.resolve(&Path::from("/")),
            Err(UnionPathError::NoParent(_))
        ));

        // A device whiteout under a non-opaque parent still resolves to its
        // containing directory.
        let convention =
            OverlayWhiteout::new(FakeMount::default().with_char_device("/upper/var/secret"));
        assert_eq!(
            convention.resolve(&Path::from("/upper/var/secret")).unwrap(),
            Path::from("/upper/var")
        );
    }

    #[test]
    fn test_overlay_convention_swallows_query_errors() {
        let convention = OverlayWhiteout::new(FakeMount::default());

        // Nothing exists in the fake mount; stat errors collapse to false.
        assert!(!convention.is_file_deletion(&Path::from("/missing")));
        assert!(!convention.is_dir_opaque(&Path::from("/missing/child")));
    }
}
