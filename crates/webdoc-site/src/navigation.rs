//! Site navigation fragment.
//!
//! The navigation is a nested `<ul>` mirroring the page hierarchy. Pages on
//! the branch (the current page and its ancestors) are expanded, all other
//! pages appear as leaf items.

use std::collections::HashSet;

use crate::document::{Attributes, Document, NodeHandle, NodeKind, NodeType, Origin};

/// Build the navigation list for `page`.
///
/// Returns a detached `<ul>` element, or `None` if the page is not inside a
/// `<site>`. Links use page ids as `href`, so they are relativized when the
/// fragment is serialized under the page being rendered.
pub fn drill_index(doc: &mut Document, page: NodeHandle) -> Option<NodeHandle> {
    let branch: HashSet<NodeHandle> = std::iter::once(page).chain(doc.ancestors(page)).collect();
    let site = doc.find_ancestor(page, NodeType::Site)?;
    Some(list(doc, site, &branch))
}

/// `<ul>` of the index items contributed by the children of `node`.
fn list(doc: &mut Document, node: NodeHandle, branch: &HashSet<NodeHandle>) -> NodeHandle {
    let ul = element(doc, "ul", Attributes::new());
    for child in doc.children(node).to_vec() {
        for item in make_index(doc, child, branch) {
            doc.adopt(ul, item);
        }
    }
    ul
}

/// Index items contributed by `node`.
fn make_index(
    doc: &mut Document,
    node: NodeHandle,
    branch: &HashSet<NodeHandle>,
) -> Vec<NodeHandle> {
    match doc.kind(node) {
        NodeKind::Page(info) => {
            let title = info.title.clone();
            let href = doc.id(node).to_owned();

            let li = element(doc, "li", Attributes::new());
            let a = element(doc, "a", Attributes::from([("href".to_owned(), href)]));
            let text = doc.create_generated(
                NodeKind::Text {
                    text: title,
                    cdata: false,
                },
                Attributes::new(),
                Origin::default(),
            );
            doc.adopt(a, text);
            doc.adopt(li, a);
            if branch.contains(&node) {
                let ul = list(doc, node, branch);
                doc.adopt(li, ul);
            }
            vec![li]
        }
        NodeKind::Site { .. } | NodeKind::Dir { .. } | NodeKind::Element { .. } => doc
            .children(node)
            .to_vec()
            .into_iter()
            .flat_map(|child| make_index(doc, child, branch))
            .collect(),
        NodeKind::Template
        | NodeKind::PageStyle
        | NodeKind::PageScript
        | NodeKind::Text { .. }
        | NodeKind::Expansion => Vec::new(),
    }
}

fn element(doc: &mut Document, tag: &str, attrs: Attributes) -> NodeHandle {
    doc.create_generated(NodeKind::Element { tag: tag.to_owned() }, attrs, Origin::default())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::builder::BuildOptions;
    use crate::loader::load_str;

    const SITE: &str = r#"<site>
  <page name="index" id="home" title="Home"/>
  <dir name="guide">
    <page name="start" id="start" title="Start">
      <page name="install" id="install" title="Install"/>
    </page>
    <page name="usage" id="usage" title="Usage">
      <page name="cli" id="cli" title="CLI"/>
    </page>
  </dir>
  <template id="template.default"><div/></template>
</site>"#;

    /// Render a navigation tree as `tag(children)` / `a:href` shorthand.
    fn outline(doc: &Document, node: NodeHandle) -> String {
        match doc.kind(node) {
            NodeKind::Element { tag } if tag == "a" => {
                format!("a:{}", doc.node(node).attrs()["href"])
            }
            NodeKind::Element { tag } => {
                let children: Vec<String> = doc
                    .children(node)
                    .iter()
                    .map(|&c| outline(doc, c))
                    .collect();
                format!("{tag}({})", children.join(","))
            }
            _ => String::new(),
        }
    }

    fn navigation_for(id: &str) -> String {
        let mut doc = load_str(Path::new("site.xml"), SITE, &BuildOptions::default()).unwrap();
        let page = doc.lookup(id).unwrap();
        let ul = drill_index(&mut doc, page).unwrap();
        outline(&doc, ul)
    }

    #[test]
    fn test_branch_of_nested_page_is_expanded() {
        assert_eq!(
            navigation_for("install"),
            "ul(li(a:home),li(a:start,ul(li(a:install,ul()))),li(a:usage))"
        );
    }

    #[test]
    fn test_root_page_keeps_siblings_collapsed() {
        assert_eq!(
            navigation_for("home"),
            "ul(li(a:home,ul()),li(a:start),li(a:usage))"
        );
    }

    #[test]
    fn test_sibling_subtree_collapses() {
        assert_eq!(
            navigation_for("usage"),
            "ul(li(a:home),li(a:start),li(a:usage,ul(li(a:cli))))"
        );
    }

    #[test]
    fn test_link_text_is_page_title() {
        let mut doc = load_str(Path::new("site.xml"), SITE, &BuildOptions::default()).unwrap();
        let page = doc.lookup("home").unwrap();
        let ul = drill_index(&mut doc, page).unwrap();
        let li = doc.children(ul)[0];
        let a = doc.children(li)[0];
        let text = doc.children(a)[0];
        assert_eq!(
            doc.kind(text),
            &NodeKind::Text {
                text: "Home".to_owned(),
                cdata: false
            }
        );
    }

    #[test]
    fn test_page_outside_site_has_no_navigation() {
        let mut doc = load_str(
            Path::new("site.xml"),
            r#"<div><page id="p"/></div>"#,
            &BuildOptions::default(),
        )
        .unwrap();
        let page = doc.lookup("p").unwrap();
        assert_eq!(drill_index(&mut doc, page), None);
    }
}
