//! ID3v2 frame-id to comment-key mapping and ID3v1 numeric genre table.
//! Ported from `ompl/src/library/track/mod.rs` `ID3_TAGS`/`ID3_GENRES`.

/// ID3v2 frame id (lowercase) to human comment key.
const ID3_TAGS: &[(&str, &str)] = &[
    ("talb", "album"),
    ("tcom", "composer"),
    ("tcon", "genre"),
    ("tcop", "copyright"),
    ("tenc", "encodedby"),
    ("tit1", "grouping"),
    ("tit2", "title"),
    ("tlan", "language"),
    ("tpe1", "artist"),
    ("tcmp", "compilation"),
    ("tdrc", "recorddate"),
    ("tpe2", "albumartist"),
    ("tpe3", "performer"),
    ("tpos", "disc"),
    ("tpub", "publisher"),
    ("trck", "track"),
    ("tsoa", "albumsort"),
    ("tsop", "artistsort"),
    ("tsot", "titlesort"),
    ("uslt", "lyrics"),
    ("tsse", "encodingsettings"),
    ("tden", "creationtime"),
    ("tdrl", "releasedate"),
    ("tbpm", "bpm"),
    ("text", "lyricist"),
    ("tit3", "version"),
    ("tkey", "initialkey"),
    ("tmoo", "mood"),
    ("toal", "originalalbum"),
    ("toly", "author"),
    ("tope", "originalartist"),
    ("tpe4", "arranger"),
    ("tsrc", "isrc"),
    ("tsst", "setsubtitle"),
    ("tdor", "originaldate"),
    ("woar", "website"),
    ("tso2", "albumartistsort"),
    ("tsoc", "composersort"),
    ("tmed", "media"),
    ("pcnt", "playcount"),
    ("popm", "popularimeter"),
    ("rva2", "rgain"),
    ("tdat", "date"),
    ("tdly", "audiodelay"),
    ("tdtg", "taggingtime"),
    ("tflt", "filetype"),
    ("time", "time"),
    ("tipl", "involvedpeople"),
    ("tlen", "audiolength"),
    ("tmcl", "musiciancredits"),
    ("tofn", "filename"),
    ("tory", "originalyear"),
    ("town", "fileowner"),
    ("tpro", "producednotice"),
    ("trda", "recordingdates"),
    ("trsn", "radiostationname"),
    ("trso", "radioowner"),
    ("tsiz", "audiosize"),
    ("tyer", "year"),
    ("wcom", "commercialinfosite"),
    ("wcop", "copyrightsite"),
    ("woaf", "fileinfosite"),
    ("woas", "sourcesite"),
    ("wors", "radiosite"),
    ("wpay", "paymentsite"),
    ("wpub", "publishersite"),
    ("tsee", "equipment"),
];

/// ID3v1 numeric genre table (index = stored byte value), extended with the
/// Winamp additions as the teacher's table does.
const ID3_GENRES: &[&str] = &[
    "Blues",
    "Classic Rock",
    "Country",
    "Dance",
    "Disco",
    "Funk",
    "Grunge",
    "Hip-Hop",
    "Jazz",
    "Metal",
    "New Age",
    "Oldies",
    "Other",
    "Pop",
    "R&B",
    "Rap",
    "Reggae",
    "Rock",
    "Techno",
    "Industrial",
    "Alternative",
    "Ska",
    "Death Metal",
    "Pranks",
    "Soundtrack",
    "Euro-Techno",
    "Ambient",
    "Trip-Hop",
    "Vocal",
    "Jazz+Funk",
    "Fusion",
    "Trance",
    "Classical",
    "Instrumental",
    "Acid",
    "House",
    "Game",
    "Sound Clip",
    "Gospel",
    "Noise",
    "AlternRock",
    "Bass",
    "Soul",
    "Punk",
    "Space",
    "Meditative",
    "Instrumental Pop",
    "Instrumental Rock",
    "Ethnic",
    "Gothic",
    "Darkwave",
    "Techno-Industrial",
    "Electronic",
    "Pop-Folk",
    "Eurodance",
    "Dream",
    "Southern Rock",
    "Comedy",
    "Cult",
    "Gangsta",
    "Top 40",
    "Christian Rap",
    "Pop/Funk",
    "Jungle",
    "Native American",
    "Cabaret",
    "New Wave",
    "Psychadelic",
    "Rave",
    "Showtunes",
    "Trailer",
    "Lo-Fi",
    "Tribal",
    "Acid Punk",
    "Acid Jazz",
    "Polka",
    "Retro",
    "Musical",
    "Rock & Roll",
    "Hard Rock",
    "Folk",
    "Folk-Rock",
    "National Folk",
    "Swing",
    "Fast Fusion",
    "Bebob",
    "Latin",
    "Revival",
    "Celtic",
    "Bluegrass",
    "Avantgarde",
    "Gothic Rock",
    "Progressive Rock",
    "Psychedelic Rock",
    "Symphonic Rock",
    "Slow Rock",
    "Big Band",
    "Chorus",
    "Easy Listening",
    "Acoustic",
    "Humour",
    "Speech",
    "Chanson",
    "Opera",
    "Chamber Music",
    "Sonata",
    "Symphony",
    "Booty Bass",
    "Primus",
    "Porn Groove",
    "Satire",
    "Slow Jam",
    "Club",
    "Tango",
    "Samba",
    "Folklore",
    "Ballad",
    "Power Ballad",
    "Rhythmic Soul",
    "Freestyle",
    "Duet",
    "Punk Rock",
    "Drum Solo",
    "A cappella",
    "Euro-House",
    "Dance Hall",
];

/// Map an ID3v2 frame id (case-insensitive) to its comment key. Unknown keys
/// pass through lowercased, unchanged.
pub fn normalize_key(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    ID3_TAGS
        .iter()
        .find(|(id, _)| *id == lower)
        .map(|(_, name)| name.to_string())
        .unwrap_or(lower)
}

/// Resolve an ID3v1 numeric genre (accepts bare `"17"` or bracketed
/// `"(17)"`) to its name. Returns the input unchanged if it isn't numeric.
pub fn resolve_genre(raw: &str) -> String {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(trimmed);
    match digits.parse::<usize>() {
        Ok(n) => ID3_GENRES.get(n).map(|s| s.to_string()).unwrap_or_else(|| raw.to_string()),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_frame() {
        assert_eq!(normalize_key("TPE1"), "artist");
        assert_eq!(normalize_key("TALB"), "album");
    }

    #[test]
    fn unknown_key_passes_through_lowercased() {
        assert_eq!(normalize_key("CustomTag"), "customtag");
    }

    #[test]
    fn genre_numeric_resolves() {
        assert_eq!(resolve_genre("17"), "Rock");
        assert_eq!(resolve_genre("(8)"), "Jazz");
    }

    #[test]
    fn genre_text_passes_through() {
        assert_eq!(resolve_genre("Shoegaze"), "Shoegaze");
    }

    #[test]
    fn genre_out_of_range_passes_through() {
        assert_eq!(resolve_genre("9001"), "9001");
    }
}
