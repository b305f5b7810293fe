//! Hand-rolled XML emission
//!
//! The XML-shaped outputs (Atom, RSS, the plain XML passthrough) are built
//! with this small writer rather than a DOM: feed XML is flat and
//! order-sensitive, and the writer keeps namespace declarations and CDATA
//! handling in one place.

/// Streaming XML string builder with escaping and CDATA support.
pub struct XmlWriter {
    out: String,
    stack: Vec<String>,
}

impl XmlWriter {
    /// Start a document with the XML declaration.
    pub fn new() -> Self {
        XmlWriter {
            out: "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n".to_string(),
            stack: Vec::new(),
        }
    }

    /// Start a fragment without a declaration.
    pub fn fragment() -> Self {
        XmlWriter {
            out: String::new(),
            stack: Vec::new(),
        }
    }

    fn indent(&mut self) {
        for _ in 0..self.stack.len() {
            self.out.push_str("  ");
        }
    }

    /// Open an element with attributes (namespace declarations included).
    pub fn open(&mut self, tag: &str, attrs: &[(&str, &str)]) {
        self.indent();
        self.out.push('<');
        self.out.push_str(tag);
        for (name, value) in attrs {
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            self.out.push_str(&escape_attr(value));
            self.out.push('"');
        }
        self.out.push_str(">\n");
        self.stack.push(tag.to_string());
    }

    pub fn close(&mut self) {
        let tag = self.stack.pop().expect("close without open");
        self.indent();
        self.out.push_str("</");
        self.out.push_str(&tag);
        self.out.push_str(">\n");
    }

    /// A leaf element with escaped text content.
    pub fn element(&mut self, tag: &str, attrs: &[(&str, &str)], text: &str) {
        self.indent();
        self.out.push('<');
        self.out.push_str(tag);
        for (name, value) in attrs {
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            self.out.push_str(&escape_attr(value));
            self.out.push('"');
        }
        if text.is_empty() {
            self.out.push_str("/>\n");
            return;
        }
        self.out.push('>');
        self.out.push_str(&escape_text(text));
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push_str(">\n");
    }

    /// A leaf element whose content is CDATA-wrapped, for embedded HTML.
    pub fn element_cdata(&mut self, tag: &str, attrs: &[(&str, &str)], content: &str) {
        self.indent();
        self.out.push('<');
        self.out.push_str(tag);
        for (name, value) in attrs {
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            self.out.push_str(&escape_attr(value));
            self.out.push('"');
        }
        self.out.push_str("><![CDATA[");
        // a literal ]]> inside content would end the section early
        self.out.push_str(&content.replace("]]>", "]]]]><![CDATA[>"));
        self.out.push_str("]]></");
        self.out.push_str(tag);
        self.out.push_str(">\n");
    }

    /// A self-closing element with only attributes.
    pub fn empty(&mut self, tag: &str, attrs: &[(&str, &str)]) {
        self.element(tag, attrs, "");
    }

    pub fn finish(mut self) -> String {
        while !self.stack.is_empty() {
            self.close();
        }
        self.out
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn escape_attr(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_elements_and_escaping() {
        let mut w = XmlWriter::new();
        w.open("feed", &[("xmlns", "http://www.w3.org/2005/Atom")]);
        w.element("title", &[], "a & b <c>");
        w.close();
        let out = w.finish();

        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(out.contains("<feed xmlns=\"http://www.w3.org/2005/Atom\">"));
        assert!(out.contains("<title>a &amp; b &lt;c&gt;</title>"));
        assert!(out.trim_end().ends_with("</feed>"));
    }

    #[test]
    fn test_cdata_wraps_html() {
        let mut w = XmlWriter::fragment();
        w.element_cdata("content", &[("type", "html")], "<p>hi</p>");
        let out = w.finish();
        assert_eq!(out, "<content type=\"html\"><![CDATA[<p>hi</p>]]></content>\n");
    }

    #[test]
    fn test_cdata_escape_sequence_split() {
        let mut w = XmlWriter::fragment();
        w.element_cdata("content", &[], "a]]>b");
        let out = w.finish();
        assert!(out.contains("a]]]]><![CDATA[>b"));
    }

    #[test]
    fn test_finish_closes_open_elements() {
        let mut w = XmlWriter::fragment();
        w.open("a", &[]);
        w.open("b", &[]);
        let out = w.finish();
        assert!(out.contains("</b>"));
        assert!(out.trim_end().ends_with("</a>"));
    }
}
