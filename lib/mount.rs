use std::io;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The extended attribute overlayfs sets on a directory whose lower-layer
/// contents are erased.
pub const OPAQUE_XATTR: &str = "trusted.overlay.opaque";

/// The attribute value marking the directory as opaque.
pub const OPAQUE_XATTR_VALUE: &str = "y";

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// The filesystem-status queries the attribute-based whiteout classifiers
/// depend on.
///
/// The classifiers themselves never surface these errors; they collapse any
/// failure to a `false` classification. Keeping the queries behind this trait
/// keeps the classifiers testable without a live overlay mount.
pub trait MountQuery {
    /// Indicates if the path exists and is a character device special file.
    fn is_char_device(&self, path: &str) -> io::Result<bool>;

    /// Reads the named extended attribute from the path, `None` when the
    /// attribute is not set.
    fn read_xattr(&self, path: &str, name: &str) -> io::Result<Option<Vec<u8>>>;
}

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A [`MountQuery`] backed by the host filesystem.
///
/// Off unix there are no character devices or extended attributes to find, so
/// every query answers in the negative.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostMount;

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl MountQuery for HostMount {
    fn is_char_device(&self, path: &str) -> io::Result<bool> {
        cfg_if::cfg_if! {
            if #[cfg(unix)] {
                use std::os::unix::fs::FileTypeExt;

                let metadata = std::fs::metadata(path)?;
                Ok(metadata.file_type().is_char_device())
            } else {
                let _ = path;
                Ok(false)
            }
        }
    }

    fn read_xattr(&self, path: &str, name: &str) -> io::Result<Option<Vec<u8>>> {
        cfg_if::cfg_if! {
            if #[cfg(unix)] {
                xattr::get(path, name)
            } else {
                let _ = (path, name);
                Ok(None)
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
