use std::path::Path;
use std::str::Utf8Error;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

/// Decodes UTF-8 text, dropping the byte order mark that some spreadsheet
/// programs put in front of their exports.
pub fn decode_utf8(bytes: &[u8]) -> Result<&str, Utf8Error> {
    let text = std::str::from_utf8(bytes)?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}

/// Decodes Latin-1 (ISO-8859-1) text. Every byte is a valid character, so this
/// cannot fail.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names() {
        assert_eq!(simplify_file_name("/data/results-survey1.csv"), "results-survey1.csv");
        assert_eq!(simplify_file_name("results.csv"), "results.csv");
    }

    #[test]
    fn utf8_with_bom() {
        let bytes = "\u{feff}Fecha;Hora".as_bytes();
        assert_eq!(decode_utf8(bytes), Ok("Fecha;Hora"));
    }

    #[test]
    fn latin1_accents() {
        // "Córdoba" and "género" in Latin-1
        let bytes: &[u8] = &[0x43, 0xf3, 0x72, 0x64, 0x6f, 0x62, 0x61, 0x3b, 0x67, 0xe9, 0x6e, 0x65, 0x72, 0x6f];
        assert!(decode_utf8(bytes).is_err());
        assert_eq!(decode_latin1(bytes), "Córdoba;género");
    }
}
