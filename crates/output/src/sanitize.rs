//! Album name sanitization.

/// Longest album name (in characters) used for a directory.
pub const MAX_NAME_CHARS: usize = 200;
const INVALID: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const FALLBACK: &str = "output";

/// Turns a caller-supplied album name into a safe directory name.
///
/// Reserved characters and control characters become `_`, leading and
/// trailing dots and spaces are stripped, an empty result becomes `output`,
/// and the name is capped at [`MAX_NAME_CHARS`] characters.
///
/// ```
/// use rotamix_output::sanitize_album_name;
/// assert_eq!(sanitize_album_name("Test/Album"), "Test_Album");
/// assert_eq!(sanitize_album_name(". Album ."), "Album");
/// assert_eq!(sanitize_album_name("..."), "output");
/// ```
pub fn sanitize_album_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match INVALID.contains(&c) || c.is_control() {
            true => '_',
            false => c,
        })
        .collect();
    let trimmed = replaced.trim_matches(|c| c == '.' || c == ' ');
    match trimmed.is_empty() {
        true => FALLBACK.to_string(),
        false => trimmed.chars().take(MAX_NAME_CHARS).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Morning Bhajans", "Morning Bhajans")]
    #[case("Mix-2024", "Mix-2024")]
    #[case("Test/Album", "Test_Album")]
    #[case("Test:Name", "Test_Name")]
    #[case("Test<>|?*", "Test_____")]
    #[case("Test<>:\"/\\|?*Name", "Test_________Name")]
    #[case("Tab\there", "Tab_here")]
    #[case("  Album  ", "Album")]
    #[case("..Album..", "Album")]
    #[case(". Album .", "Album")]
    #[case("", "output")]
    #[case("   ", "output")]
    #[case("...", "output")]
    fn test_sanitize(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_album_name(input), expected);
    }

    #[test]
    fn test_long_names_are_capped() {
        assert_eq!(sanitize_album_name(&"A".repeat(300)).chars().count(), MAX_NAME_CHARS);
        // Multi-byte characters are counted, not bytes.
        let name = sanitize_album_name(&"ü".repeat(250));
        assert_eq!(name.chars().count(), MAX_NAME_CHARS);
        assert_eq!(name.len(), MAX_NAME_CHARS * 2);
    }
}
