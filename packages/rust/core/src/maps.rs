//! Map search links built from address columns.

use std::sync::LazyLock;

use url::Url;

use matrikkel_shared::columns::{
    ADRESSE, ADRESSENAVN, GOOGLE_MAPS_LINK, NUMMER, POSTNUMMER, POSTSTED,
};
use matrikkel_shared::{PropertyRecord, RecordSet};

static MAPS_SEARCH_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://www.google.com/maps/search/").expect("maps search url")
});

/// Postcode as digits: `5003.0` and `"5003"` both give `"5003"`.
fn postcode(record: &PropertyRecord) -> Option<String> {
    let text = record.text(POSTNUMMER)?;
    Some(match record.float(POSTNUMMER) {
        Some(f) => format!("{}", f.trunc() as i64),
        None => text,
    })
}

/// Search link for a record's address, or empty when it has none.
pub fn maps_link(record: &PropertyRecord) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(address) = record.text(ADRESSE) {
        parts.push(address);
    } else {
        let street = format!(
            "{} {}",
            record.text(ADRESSENAVN).unwrap_or_default(),
            record.text(NUMMER).unwrap_or_default()
        );
        let street = street.trim();
        if !street.is_empty() {
            parts.push(street.to_string());
        }
    }
    parts.extend(postcode(record));
    parts.extend(record.text(POSTSTED));

    if parts.is_empty() {
        return String::new();
    }

    let mut url = MAPS_SEARCH_URL.clone();
    url.query_pairs_mut()
        .append_pair("api", "1")
        .append_pair("query", &parts.join(" "));
    url.to_string()
}

/// Set `GoogleMapsLink` on every record.
pub fn add_maps_link_column(set: &mut RecordSet) {
    set.ensure_column(GOOGLE_MAPS_LINK);
    for record in &mut set.records {
        let link = maps_link(record);
        record.set(GOOGLE_MAPS_LINK, link);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_from_address_parts() {
        let mut r = PropertyRecord::new();
        r.set(ADRESSENAVN, "Torget");
        r.set(NUMMER, 1.0);
        r.set(POSTNUMMER, 5003.0);
        r.set(POSTSTED, "Bergen");
        assert_eq!(
            maps_link(&r),
            "https://www.google.com/maps/search/?api=1&query=Torget+1+5003+Bergen"
        );
    }

    #[test]
    fn combined_address_preferred() {
        let mut r = PropertyRecord::new();
        r.set(ADRESSE, "Øvre Ole Bulls plass 3");
        r.set(ADRESSENAVN, "ignored");
        let link = maps_link(&r);
        assert!(link.contains("query=%C3%98vre+Ole+Bulls+plass+3"));
        assert!(!link.contains("ignored"));
    }

    #[test]
    fn no_address_no_link() {
        let mut set = RecordSet::new(vec![], vec![PropertyRecord::new()]);
        add_maps_link_column(&mut set);
        assert_eq!(set.records[0].raw_text(GOOGLE_MAPS_LINK), "");
        assert!(set.has_column(GOOGLE_MAPS_LINK));
    }
}
