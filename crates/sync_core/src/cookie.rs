use cookie::Cookie;

/// Name → value cookie mapping built from `Set-Cookie` headers.
///
/// Names are unique; a later value for the same name replaces the earlier one
/// but keeps its original position, so serialization is stable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CookieJar {
    entries: Vec<(String, String)>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds raw `Set-Cookie` values into a fresh jar.
    pub fn from_set_cookies<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut jar = Self::new();
        jar.extend_set_cookies(headers);
        jar
    }

    /// Parses a `Cookie` request header (`a=1; b=2`) back into a jar.
    pub fn from_header(header: &str) -> Self {
        let mut jar = Self::new();
        for pair in header.split(';') {
            jar.insert_parsed(pair);
        }
        jar
    }

    pub fn extend_set_cookies<I, S>(&mut self, headers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for header in headers {
            self.insert_parsed(header.as_ref());
        }
    }

    /// Attributes after the first `;` are ignored. Entries without a name
    /// or without `=` are skipped.
    fn insert_parsed(&mut self, raw: &str) {
        if let Ok(parsed) = Cookie::parse(raw) {
            self.insert(parsed.name(), parsed.value_trimmed());
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Folds `other` into `self`; values from `other` win.
    pub fn merge(&mut self, other: &CookieJar) {
        for (name, value) in &other.entries {
            self.insert(name.clone(), value.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes to a `Cookie` request header value.
    pub fn to_header(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}
