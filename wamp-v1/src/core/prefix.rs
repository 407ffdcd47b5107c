use crate::core::{
    error::UnresolvedPrefixError,
    hash::HashMap,
    uri::{
        InvalidUriError,
        Uri,
        is_well_formed_uri,
    },
};

/// A table of CURIE prefixes, mapping a short prefix to a full URI.
///
/// Each connection owns its own table, mutated only by PREFIX messages from its peer. URIs are
/// validated when they are inserted, so resolution never needs to validate again.
#[derive(Debug, Default, Clone)]
pub struct PrefixTable {
    prefixes: HashMap<String, Uri>,
    default_uri: Option<Uri>,
}

impl PrefixTable {
    /// Creates a fault-tolerant table, which resolves unknown tokens to the given URI instead of
    /// failing.
    pub fn with_default_uri<S>(default_uri: S) -> Result<Self, InvalidUriError>
    where
        S: AsRef<str>,
    {
        Ok(Self {
            prefixes: HashMap::default(),
            default_uri: Some(Uri::try_from(default_uri.as_ref())?),
        })
    }

    /// Checks if the table resolves unknown tokens to a default URI.
    pub fn fault_tolerant(&self) -> bool {
        self.default_uri.is_some()
    }

    /// Maps `prefix` to `uri`.
    ///
    /// Returns `true` if the prefix was newly inserted and `false` if an existing mapping was
    /// overwritten.
    pub fn set_prefix<P, U>(&mut self, prefix: P, uri: U) -> Result<bool, InvalidUriError>
    where
        P: Into<String>,
        U: AsRef<str>,
    {
        let uri = Uri::try_from(uri.as_ref())?;
        Ok(self.prefixes.insert(prefix.into(), uri).is_none())
    }

    /// Removes a mapping by its prefix or, if no such prefix exists, every mapping to the given
    /// URI.
    ///
    /// Returns `true` if anything was removed.
    pub fn remove_prefix(&mut self, prefix_or_uri: &str) -> bool {
        if self.prefixes.remove(prefix_or_uri).is_some() {
            return true;
        }
        if !is_well_formed_uri(prefix_or_uri) {
            return false;
        }
        let before = self.prefixes.len();
        self.prefixes.retain(|_, uri| uri.as_str() != prefix_or_uri);
        self.prefixes.len() != before
    }

    /// Checks if the prefix is mapped.
    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.prefixes.contains_key(prefix)
    }

    /// Checks if the token can be resolved without falling back to the default URI.
    pub fn contains_mapping(&self, token: &str) -> bool {
        self.expand(token).is_some() || is_well_formed_uri(token)
    }

    /// Resolves a prefix, CURIE, or URI to a full URI.
    ///
    /// Resolution order:
    /// 1. A known prefix resolves to its URI.
    /// 2. A CURIE (`prefix:suffix`) with a known prefix resolves to the prefix's URI followed by
    ///    the suffix.
    /// 3. A well-formed URI resolves to itself.
    /// 4. A fault-tolerant table resolves anything else to its default URI.
    pub fn resolve(&self, token: &str) -> Result<Uri, UnresolvedPrefixError> {
        if let Some(uri) = self.expand(token) {
            return Ok(uri);
        }
        if let Ok(uri) = Uri::try_from(token) {
            return Ok(uri);
        }
        match &self.default_uri {
            Some(uri) => Ok(uri.clone()),
            None => Err(UnresolvedPrefixError {
                token: token.to_owned(),
            }),
        }
    }

    fn expand(&self, token: &str) -> Option<Uri> {
        if let Some(uri) = self.prefixes.get(token) {
            return Some(uri.clone());
        }
        let (prefix, suffix) = token.split_once(':')?;
        let uri = self.prefixes.get(prefix)?;
        // The suffix must not smuggle in characters a URI cannot hold.
        Uri::try_from(format!("{uri}{suffix}")).ok()
    }

    /// The number of mapped prefixes.
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// Checks if no prefixes are mapped.
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

impl<P, U> TryFrom<Vec<(P, U)>> for PrefixTable
where
    P: Into<String>,
    U: AsRef<str>,
{
    type Error = InvalidUriError;

    fn try_from(value: Vec<(P, U)>) -> Result<Self, Self::Error> {
        let mut table = Self::default();
        for (prefix, uri) in value {
            table.set_prefix(prefix, uri)?;
        }
        Ok(table)
    }
}
