//! HTML serialization of expanded content.

use webdoc_renderer::{escape_text, quote_attr};

use crate::document::{Document, NodeHandle, NodeKind};
use crate::resolve::Resolver;

/// Serialize the HTML content below `parent`.
#[must_use]
pub fn serialize_children(doc: &Document, parent: NodeHandle, resolver: &Resolver<'_>) -> String {
    let mut out = String::new();
    for &child in doc.children(parent) {
        write_node(doc, child, resolver, &mut out);
    }
    out
}

/// Append the HTML for `node` to `out`.
///
/// Elements always get an explicit close tag. Every `href` is passed through
/// [`Resolver::resolve_reference`] relative to the element carrying it.
/// Vocabulary nodes (pages, templates, styles, scripts) produce nothing.
pub fn write_node(doc: &Document, node: NodeHandle, resolver: &Resolver<'_>, out: &mut String) {
    match doc.kind(node) {
        NodeKind::Element { tag } => {
            out.push('<');
            out.push_str(tag);
            for (key, value) in doc.node(node).attrs() {
                let value = if key == "href" {
                    resolver.resolve_reference(value, node)
                } else {
                    value.clone()
                };
                out.push(' ');
                out.push_str(key);
                out.push('=');
                out.push_str(&quote_attr(&value));
            }
            out.push('>');
            for &child in doc.children(node) {
                write_node(doc, child, resolver, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        NodeKind::Text { text, cdata: true } => out.push_str(text),
        NodeKind::Text { text, cdata: false } => out.push_str(&escape_text(text)),
        NodeKind::Expansion => {
            for &child in doc.children(node) {
                write_node(doc, child, resolver, out);
            }
        }
        NodeKind::Site { .. }
        | NodeKind::Dir { .. }
        | NodeKind::Page(_)
        | NodeKind::Template
        | NodeKind::PageStyle
        | NodeKind::PageScript => {}
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::builder::BuildOptions;
    use crate::loader::load_str;

    fn serialize(source: &str) -> String {
        let doc = load_str(Path::new("site.xml"), source, &BuildOptions::default()).unwrap();
        let aliases = HashMap::new();
        let resolver = Resolver::new(&doc, &aliases);
        let mut out = String::new();
        write_node(&doc, doc.roots()[0], &resolver, &mut out);
        out
    }

    #[test]
    fn test_elements_are_closed_and_attributes_quoted() {
        assert_eq!(
            serialize(r#"<div class="a &amp; b"><br/>x</div>"#),
            r#"<div class="a &amp; b"><br></br>x</div>"#
        );
    }

    #[test]
    fn test_attribute_entities_are_escaped() {
        assert_eq!(
            serialize(r#"<p title="&quot;caf&eacute;&quot; &lt;3"/>"#),
            r#"<p title="&quot;caf&eacute;&quot; &lt;3"></p>"#
        );
    }

    #[test]
    fn test_text_is_entity_escaped() {
        assert_eq!(
            serialize("<p>a &lt; b &#169; &nbsp;</p>"),
            "<p>a &lt; b &copy; &nbsp;</p>"
        );
    }

    #[test]
    fn test_cdata_is_verbatim() {
        assert_eq!(
            serialize("<script><![CDATA[a<b && c]]></script>"),
            "<script>a<b && c</script>"
        );
    }

    #[test]
    fn test_vocabulary_nodes_are_skipped() {
        assert_eq!(
            serialize(r#"<div><page name="x"><p>p</p></page><template><i/></template>y</div>"#),
            "<div>y</div>"
        );
    }

    #[test]
    fn test_href_resolved_per_element() {
        let source = r#"<site url="http://a/">
<page name="index"><a href="guide">g</a><a href="top">t</a><p id="top"/></page>
<dir name="d"><page name="guide" id="guide"/></dir>
</site>"#;
        let doc = load_str(Path::new("site.xml"), source, &BuildOptions::default()).unwrap();
        let aliases = HashMap::new();
        let resolver = Resolver::new(&doc, &aliases);
        let site = doc.roots()[0];
        let page = doc.find_children(site, crate::NodeType::Page)[0];
        assert_eq!(
            serialize_children(&doc, page, &resolver),
            r##"<a href="d/guide.html">g</a><a href="#top">t</a><p id="top"></p>"##
        );
    }
}
