//! Standard project paths used by the EZ tools

use std::path::PathBuf;

/// File layout for a project managed with EZ.
///
/// Built once from the working directory (or `--dir`) and handed to each
/// handler; nothing reads paths from global state.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    /// Project root
    pub root: PathBuf,
    /// Directory holding the key and the encrypted document (`<root>/secrets`)
    pub secrets_dir: PathBuf,
    /// Age private key file, mode 0600 (must never be committed)
    pub age_key_file: PathBuf,
    /// Encrypted secrets document (safe to commit)
    pub secrets_file: PathBuf,
    /// SOPS creation rules (`<root>/.sops.yaml`)
    pub sops_config: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let secrets_dir = root.join("secrets");

        Self {
            age_key_file: secrets_dir.join("age-key.txt"),
            secrets_file: secrets_dir.join("secrets.yaml"),
            sops_config: root.join(".sops.yaml"),
            secrets_dir,
            root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let paths = ProjectPaths::new("/tmp/project");
        assert_eq!(paths.root, PathBuf::from("/tmp/project"));
        assert_eq!(paths.secrets_dir, PathBuf::from("/tmp/project/secrets"));
        assert_eq!(
            paths.age_key_file,
            PathBuf::from("/tmp/project/secrets/age-key.txt")
        );
        assert_eq!(
            paths.secrets_file,
            PathBuf::from("/tmp/project/secrets/secrets.yaml")
        );
        assert_eq!(paths.sops_config, PathBuf::from("/tmp/project/.sops.yaml"));
    }
}
