//! Markdown → [`DocTree`] rendering.
//!
//! The tree mirrors what a browser would build from the rendered HTML: one
//! element per markdown construct and a single text leaf for every run of
//! adjacent text, so anchor paths recorded against a live page line up with
//! paths walked here.
//!
//! Raw HTML in a post is kept as literal text, not parsed into elements. A
//! browser would build elements for it, so highlights recorded on a live page
//! inside or after raw HTML in the same container will not resolve against
//! this tree.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use super::{DocTree, NodeId, html};

/// Class carried by the article root container.
pub const ARTICLE_CLASS: &str = "article";

/// A rendered post: the tree plus the root every anchor path starts from.
#[derive(Debug, Clone)]
pub struct Article {
    tree: DocTree,
    root: NodeId,
}

impl Article {
    pub fn from_markdown(markdown: &str) -> Self {
        render_markdown(markdown)
    }

    /// Render from raw bytes, rejecting invalid UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        Ok(render_markdown(text))
    }

    pub fn tree(&self) -> &DocTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut DocTree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Plain text of the whole article.
    pub fn text(&self) -> String {
        self.tree.text_content(self.root)
    }

    pub fn to_html(&self) -> String {
        html::to_html(&self.tree, self.root)
    }
}

type ElementSpec = (&'static str, Vec<(String, String)>);

/// Render markdown into a fresh tree rooted at `<div class="article">`.
pub fn render_markdown(markdown: &str) -> Article {
    let mut tree = DocTree::new();
    let root = tree.new_element("div", vec![("class".to_string(), ARTICLE_CLASS.to_string())]);

    // Open elements, innermost last. `frames` records how many elements each
    // start tag pushed so the matching end tag pops the same number.
    let mut open = vec![root];
    let mut frames: Vec<usize> = Vec::new();

    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    for event in Parser::new_ext(markdown, options) {
        let parent = open.last().copied().unwrap_or(root);
        match event {
            Event::Start(tag) => {
                let specs = element_for(&tag);
                frames.push(specs.len());
                for (name, attrs) in specs {
                    let parent = open.last().copied().unwrap_or(root);
                    let element = tree.new_element(name, attrs);
                    tree.append_child(parent, element);
                    open.push(element);
                }
            }
            Event::End(end) => {
                if matches!(end, TagEnd::Image) {
                    // Image descriptions arrive as text events; fold them into `alt`.
                    let alt = tree.text_content(parent);
                    tree.clear_children(parent);
                    tree.set_attribute(parent, "alt", &alt);
                }
                for _ in 0..frames.pop().unwrap_or(0) {
                    open.pop();
                }
            }
            Event::Text(text)
            | Event::Html(text)
            | Event::InlineHtml(text)
            | Event::InlineMath(text)
            | Event::DisplayMath(text) => tree.append_text(parent, &text),
            Event::Code(code) => {
                let element = tree.new_element("code", vec![]);
                tree.append_child(parent, element);
                tree.append_text(element, &code);
            }
            Event::SoftBreak => tree.append_text(parent, "\n"),
            Event::HardBreak => {
                let element = tree.new_element("br", vec![]);
                tree.append_child(parent, element);
            }
            Event::Rule => {
                let element = tree.new_element("hr", vec![]);
                tree.append_child(parent, element);
            }
            _ => {}
        }
    }

    Article { tree, root }
}

fn element_for(tag: &Tag<'_>) -> Vec<ElementSpec> {
    match tag {
        Tag::Paragraph => vec![("p", vec![])],
        Tag::Heading { level, .. } => vec![(heading_tag(*level), vec![])],
        Tag::BlockQuote(_) => vec![("blockquote", vec![])],
        Tag::CodeBlock(kind) => {
            let code_attrs = match kind {
                CodeBlockKind::Fenced(lang) if !lang.is_empty() => {
                    vec![("class".to_string(), format!("language-{lang}"))]
                }
                _ => vec![],
            };
            vec![("pre", vec![]), ("code", code_attrs)]
        }
        Tag::HtmlBlock => vec![("div", vec![])],
        Tag::List(Some(start)) if *start != 1 => {
            vec![("ol", vec![("start".to_string(), start.to_string())])]
        }
        Tag::List(Some(_)) => vec![("ol", vec![])],
        Tag::List(None) => vec![("ul", vec![])],
        Tag::Item => vec![("li", vec![])],
        Tag::Table(_) => vec![("table", vec![])],
        Tag::TableHead => vec![("thead", vec![]), ("tr", vec![])],
        Tag::TableRow => vec![("tr", vec![])],
        Tag::TableCell => vec![("td", vec![])],
        Tag::Emphasis => vec![("em", vec![])],
        Tag::Strong => vec![("strong", vec![])],
        Tag::Strikethrough => vec![("del", vec![])],
        Tag::Link {
            dest_url, title, ..
        } => {
            let mut attrs = vec![("href".to_string(), dest_url.to_string())];
            if !title.is_empty() {
                attrs.push(("title".to_string(), title.to_string()));
            }
            vec![("a", attrs)]
        }
        Tag::Image {
            dest_url, title, ..
        } => {
            let mut attrs = vec![("src".to_string(), dest_url.to_string())];
            if !title.is_empty() {
                attrs.push(("title".to_string(), title.to_string()));
            }
            vec![("img", attrs)]
        }
        _ => vec![("span", vec![])],
    }
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}
