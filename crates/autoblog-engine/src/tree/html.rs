use super::{DocTree, NodeId, NodeKind};

const VOID_TAGS: &[&str] = &["br", "hr", "img"];

/// Serialize `node` and its subtree to HTML.
pub fn to_html(tree: &DocTree, node: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, node, &mut out);
    out
}

fn write_node(tree: &DocTree, node: NodeId, out: &mut String) {
    match tree.kind(node) {
        NodeKind::Text(text) => out.push_str(&html_escape::encode_text(text)),
        NodeKind::Element { tag, attrs } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(value));
                out.push('"');
            }
            out.push('>');

            if VOID_TAGS.contains(&tag.as_str()) {
                return;
            }

            for &child in tree.children(node) {
                write_node(tree, child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}
