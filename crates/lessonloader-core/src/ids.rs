//! Content ID naming convention.
//!
//! Lesson IDs look like `module-4-lesson-7` or `module-4-lesson-7-6unit`
//! (collection, ordinal, optional variant tag). IDs that do not use the
//! `-lesson-` marker are read as `{collection}-{ordinal}` when the last
//! segment is numeric, otherwise as opaque.
//!
//! The convention is only used to *derive* candidates (fallback ordering,
//! preload guesses, registry range expansion). Lookups always go through the
//! registry, because not every conforming ID exists.

/// Separator between collection and ordinal in lesson IDs.
pub const ORDINAL_MARKER: &str = "-lesson-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentId<'a> {
    raw: &'a str,
    collection: &'a str,
    ordinal: Option<u32>,
    variant: Option<&'a str>,
    marked: bool,
}

fn parse_ordinal(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl<'a> ContentId<'a> {
    pub fn parse(raw: &'a str) -> Self {
        if let Some(pos) = raw.rfind(ORDINAL_MARKER) {
            let collection = &raw[..pos];
            let rest = &raw[pos + ORDINAL_MARKER.len()..];
            let (number, variant) = match rest.split_once('-') {
                Some((n, v)) if !v.is_empty() => (n, Some(v)),
                _ => (rest, None),
            };
            if let (false, Some(ordinal)) = (collection.is_empty(), parse_ordinal(number)) {
                return Self {
                    raw,
                    collection,
                    ordinal: Some(ordinal),
                    variant,
                    marked: true,
                };
            }
        }

        match raw.rsplit_once('-') {
            Some((head, tail)) if !head.is_empty() => Self {
                raw,
                collection: head,
                ordinal: parse_ordinal(tail),
                variant: None,
                marked: false,
            },
            _ => Self {
                raw,
                collection: raw,
                ordinal: None,
                variant: None,
                marked: false,
            },
        }
    }

    pub fn as_str(&self) -> &'a str {
        self.raw
    }

    /// Parent collection, e.g. `module-4` for `module-4-lesson-7-6unit`.
    pub fn collection(&self) -> &'a str {
        self.collection
    }

    pub fn ordinal(&self) -> Option<u32> {
        self.ordinal
    }

    /// Variant tag such as `6unit`.
    pub fn variant(&self) -> Option<&'a str> {
        self.variant
    }

    /// Sort order derived from the ordinal, `0` when there is none.
    pub fn order(&self) -> i64 {
        self.ordinal.map(i64::from).unwrap_or(0)
    }

    fn build(&self, collection: &str, ordinal: u32) -> String {
        if self.marked {
            match self.variant {
                Some(variant) => format!("{}{}{}-{}", collection, ORDINAL_MARKER, ordinal, variant),
                None => format!("{}{}{}", collection, ORDINAL_MARKER, ordinal),
            }
        } else {
            format!("{}-{}", collection, ordinal)
        }
    }

    /// Next ID in the same collection, keeping the variant tag.
    pub fn successor(&self) -> Option<String> {
        let next = self.ordinal?.checked_add(1)?;
        Some(self.build(self.collection, next))
    }

    /// First ID of the following collection, e.g. `module-5-lesson-1`.
    pub fn first_of_next_collection(&self) -> Option<String> {
        self.ordinal?;
        let next_collection = next_collection_id(self.collection)?;
        Some(self.build(&next_collection, 1))
    }
}

/// Increment the trailing number of a collection ID (`module-1` -> `module-2`).
pub fn next_collection_id(collection: &str) -> Option<String> {
    let (head, tail) = collection.rsplit_once('-')?;
    let next = parse_ordinal(tail)?.checked_add(1)?;
    Some(format!("{}-{}", head, next))
}

/// Collection a unit ID belongs to by convention.
pub fn collection_of(id: &str) -> &str {
    ContentId::parse(id).collection()
}
