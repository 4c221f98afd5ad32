/// Modern repositories publish a `Packages` index: blank-line-separated
/// stanzas of `Key: Value` lines.
pub const INDEX_FILE_NAME: &str = "Packages";

/// Unverified repositories may publish a plain name list used by search.
pub const LEGACY_LIST_FILE_NAME: &str = "package.list";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStanza {
    pub package: String,
    pub version: String,
    pub architecture: String,
    pub filename: String,
    pub description: String,
    pub display_name: String,
    pub size: u64,
}

pub fn parse_index(input: &str) -> Vec<IndexStanza> {
    let mut stanzas = Vec::new();
    let mut current: Option<IndexStanza> = None;

    for line in input.lines() {
        if line.trim().is_empty() {
            if let Some(stanza) = current.take() {
                if !stanza.package.is_empty() {
                    stanzas.push(stanza);
                }
            }
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        if key == "Package" {
            if let Some(stanza) = current.take() {
                if !stanza.package.is_empty() {
                    stanzas.push(stanza);
                }
            }
            current = Some(IndexStanza {
                package: value.to_string(),
                ..IndexStanza::default()
            });
            continue;
        }

        let Some(stanza) = current.as_mut() else {
            continue;
        };
        match key {
            "Version" => stanza.version = value.to_string(),
            "Architecture" => stanza.architecture = value.to_string(),
            "Filename" => stanza.filename = value.to_string(),
            "Description" => stanza.description = value.to_string(),
            "Name" => stanza.display_name = value.to_string(),
            "Size" => stanza.size = value.parse().unwrap_or(0),
            _ => {}
        }
    }

    if let Some(stanza) = current.take() {
        if !stanza.package.is_empty() {
            stanzas.push(stanza);
        }
    }

    stanzas
}

pub fn find_stanza<'a>(stanzas: &'a [IndexStanza], name: &str) -> Option<&'a IndexStanza> {
    stanzas.iter().find(|stanza| stanza.package == name)
}
