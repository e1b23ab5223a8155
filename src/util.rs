use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SEPARATOR_RUNS: Regex = Regex::new("[^a-zA-Z0-9]+").unwrap();
}

/// Canonical directory segment for an archived record.
///
/// Runs of non-alphanumeric characters collapse to a single hyphen, a
/// trailing hyphen is stripped, and the result is lowercased. Two inputs
/// that differ only in whitespace or punctuation runs normalize to the same
/// segment.
pub fn normalize(raw: &str) -> String {
    let collapsed = SEPARATOR_RUNS.replace_all(raw, "-");
    collapsed.trim_end_matches('-').to_lowercase()
}

/// Directory name for a record: `normalize("{id}-{name}")`.
pub fn dir_name(id: u32, name: &str) -> String {
    normalize(&format!("{}-{}", id, name))
}

/// Join already-normalized path segments onto a base URL with forward
/// slashes, regardless of the platform separator.
pub fn url_join<I, S>(base: &str, segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        url.push('/');
        url.push_str(segment.as_ref());
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_punctuation_runs_to_one_hyphen() {
        assert_eq!(normalize("1 - Ikeja / North"), "1-ikeja-north");
        assert_eq!(normalize("1-Ikeja-North"), "1-ikeja-north");
        assert_eq!(normalize("1   -   Ikeja //-// North"), "1-ikeja-north");
    }

    #[test]
    fn strips_trailing_hyphen() {
        assert_eq!(normalize("7-Gwagwalada..."), "7-gwagwalada");
        assert_eq!(normalize("7-Gwagwalada"), "7-gwagwalada");
    }

    #[test]
    fn lowercases() {
        assert_eq!(dir_name(25, "ABUJA MUNICIPAL"), "25-abuja-municipal");
    }

    #[test]
    fn url_join_uses_forward_slashes() {
        assert_eq!(
            url_join("https://example.net/results/", vec!["25-fct", "1-amac", "polling-units.json"]),
            "https://example.net/results/25-fct/1-amac/polling-units.json"
        );
    }
}
