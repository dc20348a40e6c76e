use scraper::Html;

/// Reduce an HTML/SGML fragment to its text nodes, entities decoded,
/// separated by blank lines. Whitespace-only nodes are dropped and
/// non-breaking spaces become plain spaces.
pub fn strip_markup(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .map(|text| text.replace('\u{a0}', " "))
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_decodes_entities() {
        assert_eq!(strip_markup("<p>Hello&nbsp;World</p>"), "Hello World");
        assert_eq!(strip_markup("Tom &amp; Jerry &lt;3"), "Tom & Jerry <3");
    }

    #[test]
    fn separates_text_nodes_with_blank_lines() {
        let text = strip_markup("<p>Doors open at 6.</p>\n<p>Bring a friend!</p>");
        assert_eq!(text, "Doors open at 6.\n\nBring a friend!");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(strip_markup("Just a phonebank"), "Just a phonebank");
    }

    #[test]
    fn empty_input_yields_empty_text() {
        assert_eq!(strip_markup(""), "");
        assert_eq!(strip_markup("<br/>"), "");
    }
}
