//! Test Fixtures
//!
//! A naive tokenizer plus builders for annotated documents, annotator
//! matches, gazetteers, and frontline geometry. The tokenizer stands in
//! for the external annotator: words and punctuation become tokens with
//! byte offsets, sentences end at terminal punctuation.

use sitrep_core::gazetteer::{attach_group_polygons, encode_coord};
use sitrep_core::{
    AnnotatedDoc, AnnotatorMatch, DirectionEntry, EntityLabel, EntitySpan, Frontline,
    GazetteerIndex, GroupEntry, LocaleEntry, RegionEntry, Token, WordMatch,
};

// ============================================================================
// TOKENIZATION
// ============================================================================

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '\'' || ch == '\u{2019}' || ch == '-'
}

/// Split text into word and punctuation tokens with byte offsets.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word_start: Option<usize> = None;

    let flush = |tokens: &mut Vec<Token>, start: Option<usize>, end: usize| {
        if let Some(start) = start {
            tokens.push(Token {
                text: text[start..end].to_string(),
                start_char: start,
                end_char: end,
            });
        }
    };

    for (i, ch) in text.char_indices() {
        if is_word_char(ch) {
            if word_start.is_none() {
                word_start = Some(i);
            }
        } else {
            flush(&mut tokens, word_start.take(), i);
            if !ch.is_whitespace() {
                tokens.push(Token {
                    text: ch.to_string(),
                    start_char: i,
                    end_char: i + ch.len_utf8(),
                });
            }
        }
    }
    flush(&mut tokens, word_start.take(), text.len());

    tokens
}

fn sentence_ranges(tokens: &[Token]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = 0usize;
    for (i, tok) in tokens.iter().enumerate() {
        if matches!(tok.text.as_str(), "." | "!" | "?") {
            out.push((start, i + 1));
            start = i + 1;
        }
    }
    if start < tokens.len() {
        out.push((start, tokens.len()));
    }
    out
}

fn find_phrase(tokens: &[Token], phrase: &str) -> Option<(usize, usize)> {
    let needle = tokenize(phrase);
    if needle.is_empty() {
        return None;
    }
    'outer: for start in 0..tokens.len() {
        if start + needle.len() > tokens.len() {
            break;
        }
        for (offset, n) in needle.iter().enumerate() {
            if !tokens[start + offset].text.eq_ignore_ascii_case(&n.text) {
                continue 'outer;
            }
        }
        return Some((start, start + needle.len()));
    }
    None
}

// ============================================================================
// DOCUMENT BUILDER
// ============================================================================

/// Builds an [`AnnotatedDoc`] from plain text and labeled phrases.
pub struct DocBuilder {
    text: String,
    entities: Vec<(EntityLabel, String)>,
}

impl DocBuilder {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            entities: Vec::new(),
        }
    }

    /// Annotate the first occurrence of `phrase` with `label`.
    pub fn entity(mut self, label: EntityLabel, phrase: &str) -> Self {
        self.entities.push((label, phrase.to_string()));
        self
    }

    pub fn build(self) -> AnnotatedDoc {
        let tokens = tokenize(&self.text);
        let sentences = sentence_ranges(&tokens);

        let mut entities = Vec::new();
        for (label, phrase) in &self.entities {
            let (start, end) = find_phrase(&tokens, phrase)
                .unwrap_or_else(|| panic!("fixture phrase '{phrase}' not found in text"));
            entities.push(EntitySpan {
                label: *label,
                start_token: start,
                end_token: end,
                text: phrase.clone(),
            });
        }

        AnnotatedDoc::new(self.text, tokens, sentences, entities)
    }
}

// ============================================================================
// MATCH BUILDERS
// ============================================================================

fn word_match(doc: &AnnotatedDoc, match_type: &str, phrase: &str) -> WordMatch {
    let (start, end) = find_phrase(doc.tokens(), phrase)
        .unwrap_or_else(|| panic!("match phrase '{phrase}' not found in doc"));
    WordMatch {
        match_type: match_type.to_string(),
        document_token_index: Some(start),
        document_token_length: end - start,
        word: phrase.to_string(),
        phrase: (end - start > 1).then(|| phrase.to_string()),
        similarity: 1.0,
        negated: false,
        uncertain: false,
        involves_coreference: false,
        explanation: String::new(),
    }
}

/// An `EVENT:`-labeled match whose words are located in the doc.
pub fn event_match(doc: &AnnotatedDoc, label: &str, words: &[(&str, &str)]) -> AnnotatorMatch {
    AnnotatorMatch {
        label: format!("EVENT:{label}"),
        similarity: 1.0,
        negated: false,
        uncertain: false,
        involves_coreference: false,
        word_matches: words
            .iter()
            .map(|(match_type, phrase)| word_match(doc, match_type, phrase))
            .collect(),
        sentence_text: None,
    }
}

/// A `CONTEXT:`-labeled match anchored on one phrase.
pub fn context_match(doc: &AnnotatedDoc, kind: &str, phrase: &str) -> AnnotatorMatch {
    AnnotatorMatch {
        label: format!("CONTEXT:{kind}"),
        similarity: 1.0,
        negated: false,
        uncertain: false,
        involves_coreference: false,
        word_matches: vec![word_match(doc, "context", phrase)],
        sentence_text: None,
    }
}

// ============================================================================
// GAZETTEER BUILDER
// ============================================================================

#[derive(Default)]
pub struct GazetteerBuilder {
    locales: Vec<LocaleEntry>,
    regions: Vec<RegionEntry>,
    groups: Vec<GroupEntry>,
    directions: Vec<DirectionEntry>,
    polygons_geojson: Option<String>,
}

impl GazetteerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locale(
        mut self,
        name: &str,
        lat: f64,
        lon: f64,
        region: Option<&str>,
        ru_group: Option<&str>,
    ) -> Self {
        self.locales.push(LocaleEntry {
            name: name.to_string(),
            aliases: vec![name.to_string()],
            lon,
            lat,
            cid: encode_coord(lat, lon),
            region: region.map(str::to_string),
            ru_group: ru_group.map(str::to_string),
            place: Some("city".to_string()),
            wikidata: None,
            usage: 0,
            source: "base".to_string(),
        });
        self
    }

    pub fn region(mut self, name: &str, aliases: &[&str], neighbors: &[&str]) -> Self {
        self.regions.push(RegionEntry {
            name: name.to_string(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
            neighbors: neighbors.iter().map(|s| s.to_string()).collect(),
            wikidata: None,
        });
        self
    }

    pub fn group(mut self, name: &str, aliases: &[&str], regions: &[&str]) -> Self {
        self.groups.push(GroupEntry {
            name: name.to_string(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
            regions: regions.iter().map(|s| s.to_string()).collect(),
            neighbors: Vec::new(),
            polygon: None,
        });
        self
    }

    pub fn direction(mut self, name: &str, aliases: &[&str], anchors: &[(f64, f64)]) -> Self {
        self.directions.push(DirectionEntry {
            name: name.to_string(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
            anchors: anchors.iter().map(|&(lat, lon)| encode_coord(lat, lon)).collect(),
        });
        self
    }

    /// AO polygons as a GeoJSON feature collection keyed by group name.
    pub fn polygons(mut self, geojson: &str) -> Self {
        self.polygons_geojson = Some(geojson.to_string());
        self
    }

    pub fn build(mut self) -> GazetteerIndex {
        if let Some(geojson) = &self.polygons_geojson {
            attach_group_polygons(&mut self.groups, geojson).expect("attach polygons");
        }
        GazetteerIndex::new(self.locales, self.regions, self.groups, self.directions)
            .expect("build gazetteer")
    }
}

// ============================================================================
// STANDARD FIXTURES
// ============================================================================

/// Rectangle AO polygon covering the Donetsk fixtures.
pub const TSENTR_AO_GEOJSON: &str = r#"{
    "features": [{
        "properties": {"name": "Tsentr"},
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[37.0, 47.5], [38.5, 47.5], [38.5, 48.5], [37.0, 48.5], [37.0, 47.5]]]
        }
    }]
}"#;

/// The standard fixture gazetteer used across scenarios.
pub fn donbas_gazetteer() -> GazetteerIndex {
    GazetteerBuilder::new()
        .locale("Avdiivka", 48.139732, 37.749458, Some("Donetsk"), Some("Tsentr"))
        .locale("Marinka", 47.940038, 37.502252, Some("Donetsk"), Some("Tsentr"))
        .locale("Kurakhove", 47.985556, 37.292925, Some("Donetsk"), Some("Tsentr"))
        .locale("Heorhiivka", 47.943611, 37.385000, Some("Donetsk"), Some("Tsentr"))
        .locale("Krasnohorivka", 48.011111, 37.500556, Some("Donetsk"), Some("Tsentr"))
        .locale("Pokrovsk", 48.282563, 37.175816, Some("Donetsk"), Some("Tsentr"))
        .locale("Vovchansk", 50.288611, 36.946111, Some("Kharkiv"), None)
        .region("Donetsk", &["Donetsk", "Donetsk Oblast"], &["Kharkiv", "Zaporizhzhia"])
        .region("Kharkiv", &["Kharkiv", "Kharkiv Oblast"], &["Donetsk"])
        .group("Tsentr", &["Tsentr", "Tsentr Group"], &["Donetsk"])
        .direction("Pokrovsk", &["Pokrovsk"], &[(48.282563, 37.175816)])
        .polygons(TSENTR_AO_GEOJSON)
        .build()
}

/// A north-south frontline at the given longitude.
pub fn frontline_meridian(lon: f64, lat_min: f64, lat_max: f64) -> Frontline {
    let geojson = format!(
        r#"{{
            "features": [{{
                "properties": {{}},
                "geometry": {{
                    "type": "LineString",
                    "coordinates": [[{lon}, {lat_min}], [{lon}, {lat_max}]]
                }}
            }}]
        }}"#
    );
    Frontline::from_geojson_str(&geojson).expect("fixture frontline")
}
