// PUG-REST URL construction

use crate::http::form_encode;

pub const DEFAULT_BASE: &str = "https://pubchem.ncbi.nlm.nih.gov/rest/pug";

/// Tokens whose value may span several `/`-separated pieces
const VALUE_KEYS: [&str; 3] = ["sourcename", "heading", "sourceall"];

/// Tokens that end a collapsed value
const BOUNDARY_TOKENS: [&str; 31] = [
    "record", "property", "synonyms", "sids", "cids", "aids", "assaysummary", "classification",
    "xrefs", "description", "conformers", "concise", "targets", "doseresponse", "summary",
    "pwaccs", "geneids", "accessions", "target", "activity", "type", "XML", "ASNT", "ASNB",
    "JSON", "JSONP", "SDF", "CSV", "PNG", "TXT", "sourceid",
];

/// Percent-encode one path segment; `&` is pre-escaped and `,` stays literal
pub fn encode_segment(seg: &str) -> String {
    let seg = seg.replace('&', "%26");
    urlencoding::encode(&seg).replace("%2C", ",")
}

fn collapse_value(tokens: &[&str], start: usize) -> (String, usize) {
    let mut i = start;
    let mut chunks = Vec::new();
    while i < tokens.len() && !BOUNDARY_TOKENS.contains(&tokens[i]) {
        chunks.push(tokens[i]);
        i += 1;
    }
    (chunks.join("."), i)
}

/// Encode a `/`-separated path, collapsing multi-token source names and headings with `.`
pub fn sanitize_path(path: &str) -> String {
    let tokens: Vec<&str> = path.trim_matches('/').split('/').filter(|t| !t.is_empty()).collect();
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let tok = tokens[i];
        out.push(encode_segment(tok));

        if tok == "sourceid" {
            // sourceid/<source name...>/<id>: the id is the final token
            if i + 2 < tokens.len() {
                let name = tokens[i + 1..tokens.len() - 1].join(".");
                out.push(encode_segment(&name));
                out.push(encode_segment(tokens[tokens.len() - 1]));
                break;
            }
            i += 1;
            continue;
        }

        if VALUE_KEYS.contains(&tok) {
            let (value, next) = collapse_value(&tokens, i + 1);
            if !value.is_empty() {
                out.push(encode_segment(&value));
            }
            i = next;
        } else {
            i += 1;
        }
    }
    out.join("/")
}

/// `{base}/{input}[/{operation}][/{output}][?options]`
pub fn pug_rest_url(
    input: &str,
    operation: Option<&str>,
    output: Option<&str>,
    options: &[(String, String)],
    base: &str,
) -> String {
    let mut parts = vec![base.trim_end_matches('/').to_string(), sanitize_path(input)];
    if let Some(op) = operation.filter(|o| !o.trim().is_empty()) {
        parts.push(sanitize_path(op));
    }
    if let Some(out) = output.map(|o| o.trim().trim_matches('/')).filter(|o| !o.is_empty()) {
        parts.push(encode_segment(out));
    }
    let url = parts.join("/");
    if options.is_empty() {
        return url;
    }
    let pairs: Vec<(&str, &str)> = options.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    format!("{}?{}", url, form_encode(&pairs))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://pubchem.ncbi.nlm.nih.gov/rest/pug";

    #[test]
    fn test_simple_url() {
        assert_eq!(
            pug_rest_url("compound/cid/2244", None, Some("JSON"), &[], BASE),
            format!("{}/compound/cid/2244/JSON", BASE)
        );
    }

    #[test]
    fn test_sourceid_collapses_name() {
        assert_eq!(
            pug_rest_url("substance/sourceid/DTP/NCI/747285", None, Some("SDF"), &[], BASE),
            format!("{}/substance/sourceid/DTP.NCI/747285/SDF", BASE)
        );
    }

    #[test]
    fn test_sourceall_encodes_ampersand() {
        let url = pug_rest_url("substance/sourceall/R&D Chemicals", Some("sids"), Some("JSON"), &[], BASE);
        assert_eq!(url, format!("{}/substance/sourceall/R%2526D%20Chemicals/sids/JSON", BASE));
    }

    #[test]
    fn test_heading_collapse_stops_at_boundary() {
        assert_eq!(
            sanitize_path("annotations/heading/Boiling/Point/JSON"),
            "annotations/heading/Boiling.Point/JSON"
        );
    }

    #[test]
    fn test_comma_lists_and_options() {
        let opts = vec![("MaxRecords".to_string(), "100".to_string())];
        let url = pug_rest_url(
            "compound/cid/1,2,3/property/MolecularFormula,MolecularWeight",
            None,
            Some("CSV"),
            &opts,
            BASE,
        );
        assert_eq!(
            url,
            format!("{}/compound/cid/1,2,3/property/MolecularFormula,MolecularWeight/CSV?MaxRecords=100", BASE)
        );
    }
}
