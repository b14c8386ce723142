//! Ignore rules shared by the file tree snapshot and the search tools.
//!
//! Understands the common subset of `.gitignore`: blank lines and comments
//! are skipped, negations are not supported, a leading or trailing `/` is
//! dropped, and each remaining line is a glob matched against either a
//! single path component or a path relative to the root.

use glob::Pattern;
use std::path::Path;

/// Always skipped, with or without a `.gitignore`
const BUILTIN: &[&str] = &[".git", "node_modules", "target"];

#[derive(Debug, Clone)]
pub struct IgnoreRules {
    patterns: Vec<Pattern>,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            patterns: BUILTIN.iter().filter_map(|p| Pattern::new(p).ok()).collect(),
        }
    }
}

impl IgnoreRules {
    /// Builtin rules plus `<root>/.gitignore` if present
    pub fn load(root: &Path) -> Self {
        let mut rules = Self::default();
        match std::fs::read_to_string(root.join(".gitignore")) {
            Ok(content) => rules.extend(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Could not read .gitignore: {}", e),
        }
        rules
    }

    /// Add rules from `.gitignore`-style text
    pub fn extend(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let line = line.trim_start_matches('/').trim_end_matches('/');
            if line.is_empty() {
                continue;
            }
            match Pattern::new(line) {
                Ok(p) => self.patterns.push(p),
                Err(e) => tracing::debug!("Skipping ignore pattern {:?}: {}", line, e),
            }
        }
    }

    /// Whether a root-relative path (or any of its parents) is ignored
    pub fn is_ignored(&self, relative: &Path) -> bool {
        let component_hit = relative.components().any(|c| {
            let name = c.as_os_str().to_string_lossy();
            self.patterns.iter().any(|p| p.matches(&name))
        });
        component_hit
            || relative.ancestors().any(|ancestor| {
                let rel = ancestor.to_string_lossy();
                !rel.is_empty() && self.patterns.iter().any(|p| p.matches(&rel))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rules() {
        let rules = IgnoreRules::default();
        assert!(rules.is_ignored(Path::new(".git")));
        assert!(rules.is_ignored(Path::new("web/node_modules/react/index.js")));
        assert!(rules.is_ignored(Path::new("target/debug/tars")));
        assert!(!rules.is_ignored(Path::new("src/main.rs")));
    }

    #[test]
    fn test_gitignore_patterns() {
        let mut rules = IgnoreRules::default();
        rules.extend("# build output\n/dist/\n*.log\n\n!keep.log\ndocs/generated\n");
        assert!(rules.is_ignored(Path::new("dist")));
        assert!(rules.is_ignored(Path::new("dist/app.js")));
        assert!(rules.is_ignored(Path::new("logs/debug.log")));
        assert!(rules.is_ignored(Path::new("docs/generated/api.md")));
        assert!(!rules.is_ignored(Path::new("docs/guide.md")));
    }
}
