use anyhow::Result;
use std::path::{Component, Path, PathBuf};

const INVALID_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Outcome of reviewing a mapping before it is validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Abandon,
}

/// Last look at the mapping before anything is validated or moved.
///
/// `destinations` is parallel to `sources` and may be edited in place.
pub trait MappingReviewer {
    fn review(&mut self, sources: &[PathBuf], destinations: &mut [PathBuf])
        -> Result<ReviewDecision>;
}

/// Approves every mapping unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

impl MappingReviewer for AutoApprove {
    fn review(&mut self, _: &[PathBuf], _: &mut [PathBuf]) -> Result<ReviewDecision> {
        Ok(ReviewDecision::Approve)
    }
}

/// Rewrites every destination with [`sanitize_path`] and approves
#[derive(Debug, Default, Clone, Copy)]
pub struct SanitizeNames;

impl MappingReviewer for SanitizeNames {
    fn review(&mut self, _: &[PathBuf], destinations: &mut [PathBuf]) -> Result<ReviewDecision> {
        for destination in destinations.iter_mut() {
            *destination = sanitize_path(destination);
        }
        Ok(ReviewDecision::Approve)
    }
}

/// Run `reviewer` over `mapping`.
///
/// Returns the possibly edited mapping on approval and an empty one when the
/// review is abandoned.
pub fn review_mapping(
    reviewer: &mut dyn MappingReviewer,
    mapping: Vec<(PathBuf, PathBuf)>,
) -> Result<Vec<(PathBuf, PathBuf)>> {
    if mapping.is_empty() {
        return Ok(mapping);
    }

    let (sources, mut destinations): (Vec<_>, Vec<_>) = mapping.into_iter().unzip();

    match reviewer.review(&sources, &mut destinations)? {
        ReviewDecision::Approve => Ok(sources.into_iter().zip(destinations).collect()),
        ReviewDecision::Abandon => {
            tracing::debug!("Mapping review abandoned");
            Ok(Vec::new())
        },
    }
}

pub fn is_invalid_char(c: char) -> bool {
    INVALID_CHARS.contains(&c) || c.is_control()
}

/// True for DOS device names, with or without an extension (`nul.txt`)
pub fn is_windows_reserved(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name).trim_end();
    RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
}

/// Whether a single file name needs fixing
pub fn is_invalid_file_name(name: &str) -> bool {
    name.chars().any(is_invalid_char)
        || name.ends_with('.')
        || name.ends_with(' ')
        || is_windows_reserved(name)
}

/// Indices of destinations with at least one invalid path component
pub fn find_invalid_names(destinations: &[PathBuf]) -> Vec<usize> {
    destinations
        .iter()
        .enumerate()
        .filter(|(_, path)| has_invalid_component(path))
        .map(|(i, _)| i)
        .collect()
}

fn has_invalid_component(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(name) => is_invalid_file_name(&name.to_string_lossy()),
        _ => false,
    })
}

/// Strip invalid characters and trailing dots and spaces from one name.
///
/// Reserved device names get a trailing underscore on the stem.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| !is_invalid_char(*c)).collect();
    let cleaned = cleaned.trim_end_matches(['.', ' ']).to_string();

    if is_windows_reserved(&cleaned) {
        match cleaned.split_once('.') {
            Some((stem, rest)) => format!("{stem}_.{rest}"),
            None => format!("{cleaned}_"),
        }
    } else {
        cleaned
    }
}

/// Apply [`sanitize_file_name`] to every normal component of `path`
pub fn sanitize_path(path: &Path) -> PathBuf {
    let mut sanitized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => {
                let name = sanitize_file_name(&name.to_string_lossy());
                if !name.is_empty() {
                    sanitized.push(name);
                }
            },
            other => sanitized.push(other.as_os_str()),
        }
    }
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Abandon;

    impl MappingReviewer for Abandon {
        fn review(&mut self, _: &[PathBuf], _: &mut [PathBuf]) -> Result<ReviewDecision> {
            Ok(ReviewDecision::Abandon)
        }
    }

    fn mapping() -> Vec<(PathBuf, PathBuf)> {
        vec![
            (PathBuf::from("/a/1.mkv"), PathBuf::from("Show: Pilot?.mkv")),
            (PathBuf::from("/a/2.mkv"), PathBuf::from("Show Two.mkv")),
        ]
    }

    #[test]
    fn test_find_invalid_names() {
        let destinations = vec![
            PathBuf::from("fine.txt"),
            PathBuf::from("what?.txt"),
            PathBuf::from("dir/trailing."),
            PathBuf::from("/abs/ok/name.txt"),
            PathBuf::from("con.txt"),
        ];
        assert_eq!(find_invalid_names(&destinations), vec![1, 2, 4]);
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Show: Pilot?.mkv"), "Show Pilot.mkv");
        assert_eq!(sanitize_file_name("a<b>c|d\"e*f"), "abcdef");
        assert_eq!(sanitize_file_name("name. . "), "name");
        assert_eq!(sanitize_file_name("tab\there"), "tabhere");
        assert_eq!(sanitize_file_name("NUL"), "NUL_");
        assert_eq!(sanitize_file_name("aux.log"), "aux_.log");
        assert_eq!(sanitize_file_name("plain.txt"), "plain.txt");
    }

    #[test]
    fn test_windows_reserved() {
        assert!(is_windows_reserved("CON"));
        assert!(is_windows_reserved("com1.txt"));
        assert!(is_windows_reserved("Lpt9"));
        assert!(!is_windows_reserved("console"));
        assert!(!is_windows_reserved("COM10"));
    }

    #[test]
    fn test_sanitize_path_keeps_structure() {
        assert_eq!(
            sanitize_path(Path::new("/media/Season 1?/Ep: 1.mkv")),
            PathBuf::from("/media/Season 1/Ep 1.mkv")
        );
        assert_eq!(sanitize_path(Path::new("ok.txt")), PathBuf::from("ok.txt"));
    }

    #[test]
    fn test_review_approve_keeps_mapping() {
        let result = review_mapping(&mut AutoApprove, mapping()).unwrap();
        assert_eq!(result, mapping());
    }

    #[test]
    fn test_review_can_edit_destinations() {
        let result = review_mapping(&mut SanitizeNames, mapping()).unwrap();
        assert_eq!(result[0].1, PathBuf::from("Show Pilot.mkv"));
        assert_eq!(result[1].1, PathBuf::from("Show Two.mkv"));
        assert_eq!(result[0].0, PathBuf::from("/a/1.mkv"));
    }

    #[test]
    fn test_review_abandon_yields_empty_mapping() {
        let result = review_mapping(&mut Abandon, mapping()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_empty_mapping_skips_reviewer() {
        struct Panics;
        impl MappingReviewer for Panics {
            fn review(&mut self, _: &[PathBuf], _: &mut [PathBuf]) -> Result<ReviewDecision> {
                panic!("reviewer should not be called")
            }
        }
        assert!(review_mapping(&mut Panics, Vec::new()).unwrap().is_empty());
    }
}
