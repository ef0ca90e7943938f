use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    /// English display names for the ISO 639-1 codes companions actually
    /// send. Subtitle track labels are matched against these, since players
    /// expose display names ("English (auto)") rather than bare codes.
    static ref DISPLAY_LANGUAGES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("ar", "arabic");
        m.insert("de", "german");
        m.insert("en", "english");
        m.insert("es", "spanish");
        m.insert("fr", "french");
        m.insert("hi", "hindi");
        m.insert("id", "indonesian");
        m.insert("it", "italian");
        m.insert("ja", "japanese");
        m.insert("ko", "korean");
        m.insert("nl", "dutch");
        m.insert("pl", "polish");
        m.insert("pt", "portuguese");
        m.insert("ru", "russian");
        m.insert("tr", "turkish");
        m.insert("uk", "ukrainian");
        m.insert("vi", "vietnamese");
        m.insert("zh", "chinese");
        m
    };
}

/// Lowercased display name for a language code, falling back to the raw
/// code itself. Region subtags ("pt-BR") are stripped before lookup.
pub fn display_language(code: &str) -> String {
    let base = code
        .split(['-', '_'])
        .next()
        .unwrap_or(code)
        .trim()
        .to_lowercase();
    DISPLAY_LANGUAGES
        .get(base.as_str())
        .map(|name| (*name).to_string())
        .unwrap_or(base)
}

/// Case-insensitive substring match of a subtitle track label against a
/// requested language code.
pub fn language_matches(track_language: &str, requested_code: &str) -> bool {
    let wanted = display_language(requested_code);
    !wanted.is_empty() && track_language.to_lowercase().contains(&wanted)
}
