//! Resolution of the overseas codes to postal codes.
//!
//! The results files use codes such as `ZA123` for the overseas collectivities.
//! Most of them map to a standard insee code by adding a base to the numeric
//! part, some are known exceptions with a fixed postal code, and a few
//! territories have no postal code data at all. Failing to resolve a code is
//! not an error: the commune is simply marked as not found.

use log::{debug, warn};

use crate::config::*;
use crate::geocoding::GeocodingTable;

/// Length of the letter prefix of a special code.
const PREFIX_LEN: usize = 2;

/// The outcome of resolving one special code.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Resolution {
    PostalCodes(Vec<String>),
    /// The territory is known to have no data.
    NoData,
    /// The code maps to the 98xxx range, which the reference does not cover.
    ManualListNeeded { insee: String },
    /// The code could not be mapped. `insee` is the intermediate code, if one was computed.
    Unresolved { insee: Option<String> },
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::PostalCodes(_))
    }

    /// The value stored in the geocoding table for this resolution.
    pub fn postal_codes(&self) -> Vec<String> {
        match self {
            Resolution::PostalCodes(codes) => codes.clone(),
            Resolution::NoData => vec![NO_DATA_CODE.to_string()],
            Resolution::ManualListNeeded { .. } | Resolution::Unresolved { .. } => {
                vec![NOT_FOUND.to_string()]
            }
        }
    }
}

pub struct SpecialCodeResolver<'a> {
    rules: &'a SpecialCodeRules,
    reference: &'a GeocodingTable,
}

impl<'a> SpecialCodeResolver<'a> {
    pub fn new(rules: &'a SpecialCodeRules, reference: &'a GeocodingTable) -> Self {
        SpecialCodeResolver { rules, reference }
    }

    /// Resolves a special code such as `ZA123`.
    pub fn resolve(&self, code: &str) -> Resolution {
        if let Some(postal) = self.rules.overrides.get(code) {
            return Resolution::PostalCodes(vec![postal.clone()]);
        }

        let (prefix, suffix) = match (code.get(..PREFIX_LEN), code.get(PREFIX_LEN..)) {
            (Some(p), Some(s)) => (p, s),
            _ => {
                warn!("Special code '{}' cannot be handled", code);
                return Resolution::Unresolved { insee: None };
            }
        };

        let base = match self.rules.transforms.get(prefix) {
            Some(CodeTransform::Offset(base)) => *base,
            Some(CodeTransform::NoData) => return Resolution::NoData,
            Some(CodeTransform::Invalid) | None => {
                warn!("Special code '{}' cannot be handled", code);
                return Resolution::Unresolved { insee: None };
            }
        };

        let insee = match suffix.parse::<u32>().ok().and_then(|n| n.checked_add(base)) {
            Some(n) => n.to_string(),
            None => {
                warn!("Special code '{}' cannot be handled", code);
                return Resolution::Unresolved { insee: None };
            }
        };
        debug!("resolve: special code {} -> insee code {}", code, insee);

        if let Some(postal) = self.rules.overrides.get(&insee) {
            Resolution::PostalCodes(vec![postal.clone()])
        } else if insee.starts_with(UNSUPPORTED_INSEE_PREFIX) {
            Resolution::ManualListNeeded { insee }
        } else if let Some(codes) = self.reference.get_insee(&insee) {
            Resolution::PostalCodes(codes.to_vec())
        } else {
            warn!(
                "Special code '{}' has insee code '{}', but no postal code associated",
                code, insee
            );
            Resolution::Unresolved { insee: Some(insee) }
        }
    }

    /// Resolves all the special communes among `keys`.
    ///
    /// Standard communes are ignored. Each special commune is returned once, in key order.
    pub fn resolve_all<'k, I>(&self, keys: I) -> Vec<(CommuneKey, Resolution)>
    where
        I: IntoIterator<Item = &'k CommuneKey>,
    {
        let mut specials: Vec<&CommuneKey> = keys.into_iter().filter(|k| k.is_special()).collect();
        specials.sort();
        specials.dedup();
        specials
            .into_iter()
            .map(|k| (k.clone(), self.resolve(&k.code())))
            .collect()
    }

    /// The reference table completed with the special communes among `keys`.
    pub fn extend_table<'k, I>(&self, keys: I) -> GeocodingTable
    where
        I: IntoIterator<Item = &'k CommuneKey>,
    {
        let resolved = self.resolve_all(keys);
        let unresolved = resolved.iter().filter(|(_, r)| !r.is_resolved()).count();
        if unresolved > 0 {
            warn!(
                "{} special codes out of {} have no postal code",
                unresolved,
                resolved.len()
            );
        }
        self.reference.with_entries(
            resolved
                .into_iter()
                .map(|(k, r)| (k, r.postal_codes())),
        )
    }
}
