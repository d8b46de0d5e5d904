//! Path helpers shared by URL parsing and document handling

use std::path::Path;

/// Whether `location` names a directory on this machine rather than a remote
///
/// Absolute paths, `./` or `../` relative paths, Windows drive and UNC paths
/// count as local. Anything with a scheme (`https://`, `file://`) or an scp
/// style `user@host:` prefix does not.
pub fn is_local_path(location: &str) -> bool {
  if location.contains("://") {
    return false;
  }
  if location.starts_with("./") || location.starts_with("../") || location.starts_with("\\\\") {
    return true;
  }

  // C:\repo or C:/repo (checked before the scp form, which also has a colon)
  let bytes = location.as_bytes();
  if bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && matches!(bytes[2], b'\\' | b'/') {
    return true;
  }

  if location.starts_with('/') {
    return !location.contains('@');
  }

  !location.contains('@') && Path::new(location).is_absolute()
}

/// Render a relative path with forward slashes, as git and document links expect
pub fn path_to_git_format(path: &Path) -> String {
  let text = path.to_string_lossy();
  if cfg!(windows) {
    text.replace('\\', "/")
  } else {
    text.into_owned()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_local_paths() {
    assert!(is_local_path("/srv/git/acme/env.git"));
    assert!(is_local_path("./env"));
    assert!(is_local_path("../acme/env"));
    assert!(is_local_path("C:\\repos\\env"));
    assert!(is_local_path("D:/repos/env"));
    assert!(is_local_path("\\\\server\\share\\env"));
  }

  #[test]
  fn test_remote_urls() {
    assert!(!is_local_path("https://github.com/acme/env.git"));
    assert!(!is_local_path("git@github.com:acme/env.git"));
    assert!(!is_local_path("ssh://git@github.com/acme/env.git"));
    assert!(!is_local_path("file:///srv/git/env.git"));
    assert!(!is_local_path("env"));
  }

  #[test]
  fn test_git_format() {
    assert_eq!(
      path_to_git_format(Path::new("namespaces/staging/releases.toml")),
      "namespaces/staging/releases.toml"
    );
  }
}
