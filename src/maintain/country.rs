// Country lookup by name, for records without GPS
// Matches single words and word pairs against a table of country names.

use std::collections::HashMap;
use std::sync::OnceLock;

/// (ISO code, display name, lowercase names and aliases)
const COUNTRIES: &[(&str, &str, &[&str])] = &[
    ("ar", "Argentina", &["argentina"]),
    ("at", "Austria", &["austria", "österreich", "osterreich"]),
    ("au", "Australia", &["australia"]),
    ("be", "Belgium", &["belgium", "belgique", "belgië", "belgie"]),
    ("bg", "Bulgaria", &["bulgaria"]),
    ("br", "Brazil", &["brazil", "brasil"]),
    ("ca", "Canada", &["canada"]),
    ("ch", "Switzerland", &["switzerland", "schweiz", "suisse", "svizzera"]),
    ("cl", "Chile", &["chile"]),
    ("cn", "China", &["china"]),
    ("co", "Colombia", &["colombia"]),
    ("cr", "Costa Rica", &["costa rica"]),
    ("cu", "Cuba", &["cuba"]),
    ("cz", "Czechia", &["czechia", "czech republic"]),
    ("de", "Germany", &["germany", "deutschland"]),
    ("dk", "Denmark", &["denmark", "danmark"]),
    ("ee", "Estonia", &["estonia"]),
    ("eg", "Egypt", &["egypt"]),
    ("es", "Spain", &["spain", "españa", "espana"]),
    ("fi", "Finland", &["finland", "suomi"]),
    ("fr", "France", &["france"]),
    ("gb", "United Kingdom", &["united kingdom", "uk", "england", "scotland", "wales", "britain"]),
    ("gr", "Greece", &["greece", "hellas"]),
    ("hk", "Hong Kong", &["hong kong"]),
    ("hr", "Croatia", &["croatia", "hrvatska"]),
    ("hu", "Hungary", &["hungary", "magyarország"]),
    ("id", "Indonesia", &["indonesia", "bali"]),
    ("ie", "Ireland", &["ireland", "éire"]),
    ("il", "Israel", &["israel"]),
    ("in", "India", &["india"]),
    ("is", "Iceland", &["iceland", "ísland"]),
    ("it", "Italy", &["italy", "italia"]),
    ("jp", "Japan", &["japan", "nippon"]),
    ("ke", "Kenya", &["kenya"]),
    ("kh", "Cambodia", &["cambodia"]),
    ("kr", "South Korea", &["south korea", "korea"]),
    ("lk", "Sri Lanka", &["sri lanka"]),
    ("lt", "Lithuania", &["lithuania"]),
    ("lu", "Luxembourg", &["luxembourg"]),
    ("lv", "Latvia", &["latvia"]),
    ("ma", "Morocco", &["morocco", "maroc"]),
    ("mc", "Monaco", &["monaco"]),
    ("mt", "Malta", &["malta"]),
    ("mx", "Mexico", &["mexico", "méxico"]),
    ("my", "Malaysia", &["malaysia"]),
    ("nl", "Netherlands", &["netherlands", "holland", "nederland"]),
    ("no", "Norway", &["norway", "norge"]),
    ("np", "Nepal", &["nepal"]),
    ("nz", "New Zealand", &["new zealand"]),
    ("pe", "Peru", &["peru"]),
    ("ph", "Philippines", &["philippines"]),
    ("pl", "Poland", &["poland", "polska"]),
    ("pt", "Portugal", &["portugal"]),
    ("ro", "Romania", &["romania"]),
    ("rs", "Serbia", &["serbia"]),
    ("ru", "Russia", &["russia"]),
    ("se", "Sweden", &["sweden", "sverige"]),
    ("sg", "Singapore", &["singapore"]),
    ("si", "Slovenia", &["slovenia"]),
    ("sk", "Slovakia", &["slovakia"]),
    ("th", "Thailand", &["thailand"]),
    ("tn", "Tunisia", &["tunisia"]),
    ("tr", "Türkiye", &["türkiye", "turkiye"]),
    ("tw", "Taiwan", &["taiwan"]),
    ("tz", "Tanzania", &["tanzania", "zanzibar"]),
    ("ua", "Ukraine", &["ukraine"]),
    ("us", "United States", &["united states", "usa", "america", "new mexico", "new york"]),
    ("vn", "Vietnam", &["vietnam", "viet nam"]),
    ("za", "South Africa", &["south africa"]),
];

static BY_NAME: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

fn by_name() -> &'static HashMap<&'static str, &'static str> {
    BY_NAME.get_or_init(|| {
        COUNTRIES
            .iter()
            .flat_map(|(code, _, names)| names.iter().map(move |name| (*name, *code)))
            .collect()
    })
}

/// Country code named somewhere in `text`; word pairs win over single words
pub fn country_code(text: &str) -> Option<&'static str> {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();

    let names = by_name();

    for pair in words.windows(2) {
        let joined = format!("{} {}", pair[0], pair[1]);
        if let Some(code) = names.get(joined.as_str()) {
            return Some(*code);
        }
    }

    words.iter().find_map(|w| names.get(w.as_str()).copied())
}

/// Display name for a country code
pub fn country_name(code: &str) -> Option<&'static str> {
    COUNTRIES
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_word_and_pairs() {
        assert_eq!(country_code("Summer in Italy 2019"), Some("it"));
        assert_eq!(country_code("trip_to_new_zealand"), Some("nz"));
        assert_eq!(country_code("Holidays/New York/Day 2"), Some("us"));
        assert_eq!(country_code("Schweiz-Alpen"), Some("ch"));
        assert_eq!(country_code("IMG_1234"), None);
        assert_eq!(country_code(""), None);
    }

    #[test]
    fn test_country_name() {
        assert_eq!(country_name("de"), Some("Germany"));
        assert_eq!(country_name("zz"), None);
    }
}
