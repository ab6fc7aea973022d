//! Cross-platform application paths

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Result<Self, String> {
        let base = dirs::config_dir().ok_or("Could not determine config directory")?;
        Ok(Self::at(base.join("forecastd")))
    }

    /// Paths rooted at an explicit directory (tests, portable installs).
    pub fn at(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_lives_in_config_dir() {
        let paths = AppPaths::at(PathBuf::from("/tmp/forecastd-test"));
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/tmp/forecastd-test/config.json")
        );
    }
}
