use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub file_name: String,
    pub line_number: i32,
}

/// Session breakpoints in insertion order.
///
/// A file name relative to the source root and the same name prefixed with
/// the root refer to the same file.
#[derive(Debug, Default)]
pub struct BreakpointRegistry {
    points: Vec<Breakpoint>,
    source_root: String,
}

impl BreakpointRegistry {
    pub fn new(source_root: impl Into<String>) -> Self {
        Self {
            points: Vec::new(),
            source_root: source_root.into(),
        }
    }

    pub fn source_root(&self) -> &str {
        &self.source_root
    }

    pub fn set_source_root(&mut self, root: impl Into<String>) {
        self.source_root = root.into();
    }

    pub fn same_file(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        let root = self.source_root.as_str();
        !root.is_empty() && (a.strip_prefix(root) == Some(b) || b.strip_prefix(root) == Some(a))
    }

    pub fn add(&mut self, line: i32, file: &str) -> bool {
        if line <= 0 || self.find(line, file).is_some() {
            return false;
        }
        self.points.push(Breakpoint {
            file_name: file.to_string(),
            line_number: line,
        });
        debug!(file, line, "breakpoint added");
        true
    }

    pub fn remove(&mut self, line: i32, file: &str) -> bool {
        let Some(index) = self
            .points
            .iter()
            .position(|bp| bp.line_number == line && self.same_file(&bp.file_name, file))
        else {
            return false;
        };
        self.points.remove(index);
        debug!(file, line, "breakpoint removed");
        true
    }

    pub fn find(&self, line: i32, file: &str) -> Option<&Breakpoint> {
        self.points
            .iter()
            .find(|bp| bp.line_number == line && self.same_file(&bp.file_name, file))
    }

    pub fn list(&self) -> &[Breakpoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) -> bool {
        self.points.clear();
        true
    }
}
