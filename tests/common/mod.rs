use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const BASICS: &str = r#"
profile:
  tng:
    PICARD: captain
    RIKER: number1
  ds9:
    SISKO: depends on season

group:
  starfleet:
    - tng
    - ds9
"#;

/// Test helper owning a temporary directory with an env-config.yaml
pub struct TestFixture {
    _temp_dir: TempDir,
    pub base_path: PathBuf,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            base_path,
        }
    }

    pub fn with_config(content: &str) -> Self {
        let fixture = Self::new();
        fs::write(fixture.config_path(), content).unwrap();
        fixture
    }

    pub fn config_path(&self) -> PathBuf {
        self.base_path.join("env-config.yaml")
    }

    /// An empty directory, usable as a PATH without any tools on it
    pub fn empty_dir(&self) -> PathBuf {
        let dir = self.base_path.join("empty");
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Install an executable shell script named `name` in the fixture's bin
    /// directory.
    #[cfg(unix)]
    pub fn stub_program(&self, name: &str, script: &str) {
        use std::os::unix::fs::PermissionsExt;

        let dir = self.base_path.join("bin");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}", script)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// A PATH finding the stub programs first, then the system tools.
    pub fn stub_path(&self) -> String {
        format!("{}:/usr/bin:/bin", self.base_path.join("bin").display())
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.base_path.join(name)).unwrap_or_default()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
