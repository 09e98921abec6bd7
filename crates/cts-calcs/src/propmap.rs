//! Property mapping tables.
//!
//! Each adapter declares how an internal property is extracted from its
//! upstream response: a single result key, or several keys with method
//! labels. Dispatching on this variant keeps the extractors flat.

use cts_common::models::Prop;

#[derive(Debug, Clone, Copy)]
pub enum Extract {
    /// One result key holds the value.
    Scalar { key: &'static str },
    /// Several keys, each tagged with a method label.
    Multi {
        keys: &'static [&'static str],
        methods: &'static [&'static str],
    },
}

#[derive(Debug, Clone, Copy)]
pub struct PropMapping {
    pub prop: Prop,
    /// Upstream identifier for request bodies and URL segments.
    pub upstream: &'static str,
    pub extract: Extract,
}

pub fn find(map: &'static [PropMapping], prop: Prop) -> Option<&'static PropMapping> {
    map.iter().find(|m| m.prop == prop)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &[PropMapping] = &[PropMapping {
        prop: Prop::MeltingPoint,
        upstream: "MP_pred",
        extract: Extract::Scalar { key: "MP_pred" },
    }];

    #[test]
    fn test_find() {
        assert!(find(MAP, Prop::MeltingPoint).is_some());
        assert!(find(MAP, Prop::BoilingPoint).is_none());
    }
}
