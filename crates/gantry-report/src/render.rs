//! HTML assembly for the annotated log document.

use gantry_core::keys::PatchsetRef;

/// Escape text for embedding in the rendered document.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Assemble the complete log document: header, phase summary list, then the
/// annotated line buffer.
pub fn render_document(patchset: &PatchsetRef, summary_items: &[String], lines: &[String]) -> String {
    let mut doc = String::new();
    doc.push_str(&format!(
        "<html><head><title>{change} -- {revision}</title>\n\
         <link rel=\"stylesheet\" type=\"text/css\" href=\"/style.css\" />\n\
         </head><body>\n\
         <h1>CI run for {change}, patchset {revision}</h1>\n\
         <p>This page shows the logs from a database upgrade continuous \
         integration run. Each patchset which proposes a database migration \
         is run against a set of test databases; this page shows the result \
         for one of those databases.</p>\n",
        change = escape(&patchset.change),
        revision = patchset.revision,
    ));
    doc.push_str(&format!("<ul>{}</ul>", summary_items.join("\n")));
    doc.push_str("<pre><code>\n");
    for line in lines {
        doc.push_str(line);
    }
    doc.push_str("</code></pre></body></html>");
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
    }

    #[test]
    fn test_document_shape() {
        let patchset = PatchsetRef::new("I1234", 2);
        let doc = render_document(
            &patchset,
            &["<li>one".to_string()],
            &["line one\n".to_string()],
        );
        assert!(doc.starts_with("<html>"));
        assert!(doc.contains("CI run for I1234, patchset 2"));
        assert!(doc.contains("<ul><li>one</ul>"));
        assert!(doc.ends_with("</code></pre></body></html>"));
    }
}
