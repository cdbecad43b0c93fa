//! ASCII tree of the included files.

use std::collections::BTreeMap;

use crate::types::TocEntry;

#[derive(Default)]
struct Node {
    children: BTreeMap<String, Node>,
    /// Set on leaves: `(tokens, truncated)`.
    file: Option<(usize, bool)>,
}

/// Render the table of contents as a tree; siblings in name order.
pub fn render_tree(root_label: &str, entries: &[TocEntry], show_tokens: bool) -> String {
    let mut root = Node::default();
    for entry in entries {
        let mut node = &mut root;
        for part in entry.path.split('/').filter(|p| !p.is_empty()) {
            node = node.children.entry(part.to_string()).or_default();
        }
        node.file = Some((entry.tokens, entry.truncated));
    }

    let mut out = String::new();
    out.push_str(root_label);
    out.push('\n');
    render_children(&root, "", show_tokens, &mut out);
    out.truncate(out.trim_end().len());
    out
}

fn render_children(node: &Node, prefix: &str, show_tokens: bool, out: &mut String) {
    let count = node.children.len();
    for (i, (name, child)) in node.children.iter().enumerate() {
        let last = i + 1 == count;
        out.push_str(prefix);
        out.push_str(if last { "└── " } else { "├── " });
        out.push_str(name);
        match child.file {
            Some((tokens, truncated)) if show_tokens => {
                out.push_str(&format!(" ({} tokens{})", tokens, if truncated { ", truncated" } else { "" }));
            }
            None => out.push('/'),
            _ => {}
        }
        out.push('\n');
        let next = format!("{}{}", prefix, if last { "    " } else { "│   " });
        render_children(child, &next, show_tokens, out);
    }
}
