use percent_encoding::percent_decode_str;

/// Decodes one query component: `+` is a space and `%XX` is the byte `0xXX`.
/// A `%` not followed by two hex digits is kept literally. Decoded bytes that
/// are not valid UTF-8 are replaced lossily.
pub fn percent_decode(input: &str) -> String {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
