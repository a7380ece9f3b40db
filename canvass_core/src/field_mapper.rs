//! Mapping of arbitrary CSV headers onto the canonical record fields.
//!
//! Headers are compared through their canonical key: diacritics stripped,
//! lower-cased, everything but letters and digits removed. `"Prénom"`,
//! `"PRENOM"` and `"pré-nom"` all become `prenom`.

use std::collections::HashMap;
use std::sync::OnceLock;

use icu_normalizer::{DecomposingNormalizer, DecomposingNormalizerBorrowed};
use icu_properties::props::{GeneralCategory, GeneralCategoryGroup};
use icu_properties::CodePointMapData;
use log::debug;

/// Accepted canonical keys for each field, in priority order.
pub mod aliases {
    pub const LAST_NAME: &[&str] = &["nom", "nomdefamille", "lastname", "surname", "name"];
    pub const FIRST_NAME: &[&str] = &["prenom", "prenoms", "firstname", "first"];
    pub const PRECINCT: &[&str] = &["bureau", "bureaudevote", "codebureau", "bv", "precinct"];
    pub const ADDRESS: &[&str] = &["adresse", "addresse", "adressecomplete", "address"];
    pub const EMAIL: &[&str] = &["email", "mail", "courriel"];
    pub const PHONE: &[&str] = &["telephone", "tel", "portable", "mobile", "phone"];
    pub const REMARK: &[&str] = &["remarque", "note", "commentaire", "remark", "comment"];
    pub const STATUS: &[&str] = &["statut", "status"];
    pub const ID: &[&str] = &["id"];

    // Address parts, used when the file has no full address column.
    pub const NUMBER: &[&str] = &["numero", "num", "numerovoie", "number"];
    pub const STREET: &[&str] = &["rue", "voie", "libellevoie", "street"];
    pub const COMPLEMENT: &[&str] = &["complement", "complementadresse", "batiment"];
    pub const POSTAL_CODE: &[&str] = &["codepostal", "cp", "postalcode", "zip"];
    pub const CITY: &[&str] = &["ville", "commune", "city"];
}

fn nfd() -> &'static DecomposingNormalizerBorrowed<'static> {
    static NFD: OnceLock<DecomposingNormalizerBorrowed<'static>> = OnceLock::new();
    NFD.get_or_init(DecomposingNormalizer::new_nfd)
}

/// Any character of general category M (Mn, Mc, Me).
fn is_combining_mark(c: char) -> bool {
    GeneralCategoryGroup::Mark.contains(CodePointMapData::<GeneralCategory>::new().get(c))
}

/// Removes accents and other combining marks: `"Défavorable"` -> `"Defavorable"`.
pub fn strip_diacritics(s: &str) -> String {
    if s.is_ascii() {
        return s.to_string();
    }
    nfd()
        .normalize(s)
        .chars()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Diacritic-free, lower-cased text. Used for status matching and for collation.
pub fn fold(s: &str) -> String {
    strip_diacritics(s).to_lowercase()
}

/// The key a raw header is known by.
pub fn canonical_key(header: &str) -> String {
    fold(header).chars().filter(|c| c.is_alphanumeric()).collect()
}

/// One parsed CSV line, keyed by canonical header.
///
/// This is the only untyped representation of a row; it is turned into a
/// [`crate::Record`] by the normalizer right after parsing.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RawRow {
    fields: HashMap<String, String>,
}

impl RawRow {
    /// Builds a row from `(header, value)` pairs.
    ///
    /// When several headers share a canonical key, the first non-blank value wins.
    pub fn from_pairs<'a, I>(pairs: I) -> RawRow
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut fields: HashMap<String, String> = HashMap::new();
        for (header, value) in pairs {
            let key = canonical_key(header);
            if key.is_empty() {
                continue;
            }
            match fields.get(&key) {
                Some(existing) if !existing.trim().is_empty() => {
                    debug!("RawRow: duplicate header {:?}, keeping first value", header);
                }
                _ => {
                    fields.insert(key, value.to_string());
                }
            }
        }
        RawRow { fields }
    }

    /// The trimmed value of the first alias that is present and not blank, or an empty string.
    pub fn lookup(&self, aliases: &[&str]) -> String {
        aliases
            .iter()
            .filter_map(|alias| self.fields.get(*alias))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
            .unwrap_or("")
            .to_string()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Joins the non-empty parts with `sep`, without stray separators.
fn join_non_empty(parts: &[&str], sep: &str) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<&str>>()
        .join(sep)
}

/// Builds `"<number> <street>, <complement>, <postal code> <city>"` from the address parts.
pub fn synthesize_address(row: &RawRow) -> String {
    let number = row.lookup(aliases::NUMBER);
    let street = row.lookup(aliases::STREET);
    let complement = row.lookup(aliases::COMPLEMENT);
    let postal_code = row.lookup(aliases::POSTAL_CODE);
    let city = row.lookup(aliases::CITY);

    let street_line = join_non_empty(&[&number, &street], " ");
    let city_line = join_non_empty(&[&postal_code, &city], " ");
    join_non_empty(&[&street_line, &complement, &city_line], ", ")
}

/// The full address column when there is one, the synthesized address otherwise.
pub fn address(row: &RawRow) -> String {
    let direct = row.lookup(aliases::ADDRESS);
    if direct.is_empty() {
        synthesize_address(row)
    } else {
        direct
    }
}
