#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("Empty path")]
    Empty,
}

/// Resolves `path` against the directory of `base`.
///
/// Paths starting with `/` are absolute and returned unchanged. A `base`
/// ending in `/` (or empty) is treated as a directory; otherwise its last
/// component is dropped. A `base` with no `/` at all has no directory, so
/// `path` is returned as is.
pub fn resolve_path(
    base: &str,
    path: &str,
) -> Result<String, PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    if path.starts_with('/') {
        return Ok(path.to_owned());
    }
    if base.is_empty() || base.ends_with('/') {
        return Ok(format!("{base}{path}"));
    }
    match base.rfind('/') {
        Some(ofs) => Ok(format!("{}{path}", &base[..=ofs])),
        None => Ok(path.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_to_file_directory() {
        assert_eq!(resolve_path("data/models/tank.g3d", "tank.png").unwrap(), "data/models/tank.png");
        assert_eq!(resolve_path("/abs/m.g3d", "tex/a.png").unwrap(), "/abs/tex/a.png");
    }

    #[test]
    fn directory_bases() {
        assert_eq!(resolve_path("data/", "a.png").unwrap(), "data/a.png");
        assert_eq!(resolve_path("", "a.png").unwrap(), "a.png");
        assert_eq!(resolve_path("model.g3d", "a.png").unwrap(), "a.png");
    }

    #[test]
    fn absolute_and_empty() {
        assert_eq!(resolve_path("data/m.g3d", "/a.png").unwrap(), "/a.png");
        assert_eq!(resolve_path("data/m.g3d", ""), Err(PathError::Empty));
    }
}
