/// Strip characters that are unsafe in filenames and collapse runs of
/// whitespace.
pub fn sanitize_filename(name: &str) -> String {
    let stripped: String = name
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name_unchanged() {
        assert_eq!(sanitize_filename("Artist - Song Title"), "Artist - Song Title");
    }

    #[test]
    fn unsafe_characters_removed() {
        assert_eq!(
            sanitize_filename("Artist/Name - Song<Title>"),
            "ArtistName - SongTitle"
        );
        assert_eq!(sanitize_filename("Artist: Song | Title?"), "Artist Song Title");
    }

    #[test]
    fn whitespace_collapsed_and_trimmed() {
        assert_eq!(
            sanitize_filename("   Spaced   Artist   -   Song   "),
            "Spaced Artist - Song"
        );
    }
}
