use std::path::PathBuf;

/// Startup settings for a debugging session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub program_file: PathBuf,
    /// Source directory, always ending in `/`.
    pub base_path: String,
    pub arguments: Vec<String>,
}

impl SessionConfig {
    pub fn new(program_file: impl Into<PathBuf>, base_path: &str) -> Self {
        Self {
            program_file: program_file.into(),
            base_path: normalize_base_path(base_path),
            arguments: Vec::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<String>) -> Self {
        self.arguments = arguments;
        self
    }
}

/// Appends the trailing separator source paths are joined with.
pub fn normalize_base_path(path: &str) -> String {
    let path = if path.is_empty() { "." } else { path };
    if path.ends_with('/') || path.ends_with('\\') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_path_gets_one_trailing_separator() {
        assert_eq!(normalize_base_path("src"), "src/");
        assert_eq!(normalize_base_path("src/"), "src/");
        assert_eq!(normalize_base_path(""), "./");
    }

    #[test]
    fn config_keeps_arguments() {
        let config = SessionConfig::new("prog.json", "lib").with_arguments(vec!["a".into()]);
        assert_eq!(config.base_path, "lib/");
        assert_eq!(config.arguments, vec!["a".to_string()]);
    }
}
