use std::sync::OnceLock;

use regex::Regex;

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern compiles"))
}

const ENTITIES: [(&str, &str); 16] = [
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&aacute;", "á"),
    ("&eacute;", "é"),
    ("&iacute;", "í"),
    ("&oacute;", "ó"),
    ("&uacute;", "ú"),
    ("&ntilde;", "ñ"),
    ("&Aacute;", "Á"),
    ("&Eacute;", "É"),
    ("&Oacute;", "Ó"),
    ("&Ntilde;", "Ñ"),
    // last so "&amp;lt;" stays literal
    ("&amp;", "&"),
];

/// Plain text view of an HTML fragment: tags become spaces, the handful of
/// entities the portal emits are decoded, whitespace runs collapse.
pub(crate) fn to_text(fragment: &str) -> String {
    decode(&tag_pattern().replace_all(fragment, " "))
}

/// Text between consecutive tags, one entry per non-empty node. Content of
/// sibling elements is never joined.
pub(crate) fn text_nodes(fragment: &str) -> Vec<String> {
    tag_pattern()
        .split(fragment)
        .map(decode)
        .filter(|node| !node.is_empty())
        .collect()
}

fn decode(text: &str) -> String {
    let mut decoded = text.to_string();
    for (entity, replacement) in ENTITIES {
        if decoded.contains(entity) {
            decoded = decoded.replace(entity, replacement);
        }
    }
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_decodes_entities() {
        let text = to_text("<td class=\"x\">Stori&nbsp;M&eacute;xico</td>\n<td>1,200</td>");
        assert_eq!(text, "Stori México 1,200");
    }

    #[test]
    fn text_nodes_keep_elements_apart() {
        let nodes = text_nodes("<select><option>Diciembre</option></select>\n<select><option>2025</option></select><p>Noviembre&nbsp;2025</p>");
        assert_eq!(nodes, vec!["Diciembre", "2025", "Noviembre 2025"]);
    }

    #[test]
    fn ampersand_is_decoded_last() {
        assert_eq!(to_text("A &amp;lt; B"), "A &lt; B");
    }
}
