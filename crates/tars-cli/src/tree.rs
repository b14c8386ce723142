//! Workspace file tree snapshot for the prompt.

use std::fs;
use std::path::Path;

use crate::ignore::IgnoreRules;

struct Node {
    name: String,
    children: Option<Vec<Node>>,
}

/// Render `root` as an indented tree.
///
/// Directories come before files, each group sorted by name. Unreadable
/// directories are logged and rendered empty.
pub fn render_tree(root: &Path, ignore: &IgnoreRules) -> String {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());
    let nodes = build(root, root, ignore);

    let mut out = format!("{}/\n", name.trim_end_matches('/'));
    format_nodes(&nodes, "", &mut out);
    out
}

fn build(dir: &Path, root: &Path, ignore: &IgnoreRules) -> Vec<Node> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Could not read directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut nodes: Vec<(bool, Node)> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path.as_path());
        if ignore.is_ignored(relative) {
            continue;
        }
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let children = is_dir.then(|| build(&path, root, ignore));
        nodes.push((
            is_dir,
            Node {
                name: entry.file_name().to_string_lossy().into_owned(),
                children,
            },
        ));
    }

    nodes.sort_by(|(a_dir, a), (b_dir, b)| b_dir.cmp(a_dir).then_with(|| a.name.cmp(&b.name)));
    nodes.into_iter().map(|(_, node)| node).collect()
}

fn format_nodes(nodes: &[Node], prefix: &str, out: &mut String) {
    for (idx, node) in nodes.iter().enumerate() {
        let last = idx + 1 == nodes.len();
        let connector = if last { "└───" } else { "├───" };
        let slash = if node.children.is_some() { "/" } else { "" };
        out.push_str(&format!("{}{}{}{}\n", prefix, connector, node.name, slash));

        if let Some(children) = &node.children {
            let next = format!("{}{}", prefix, if last { "    " } else { "│   " });
            format_nodes(children, &next, out);
        }
    }
}
