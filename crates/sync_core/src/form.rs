use std::sync::LazyLock;

use regex::Regex;

use crate::Credentials;

static INPUT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<input\b([^>]*?)>").expect("input tag regex is valid"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#)
        .expect("attribute regex is valid")
});

static META_CSRF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*name="csrf-token"[^>]*content="([^"]+)""#)
        .expect("meta csrf regex is valid")
});

static SCRIPT_CSRF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)csrfToken['"]?\s*:\s*['"]([^'"]+)"#).expect("script csrf regex is valid")
});

/// Name the token is submitted under when it only appears outside the form.
pub const CSRF_FIELD: &str = "_token";

const FALLBACK_USERNAME: &str = "username";
const FALLBACK_PASSWORD: &str = "password";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Email,
    Password,
    Hidden,
    Other,
}

impl FieldType {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Self::Text,
            "email" => Self::Email,
            "password" => Self::Password,
            "hidden" => Self::Hidden,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub field_type: FieldType,
    pub value: String,
}

/// Input fields of a login page, keyed by name in document order.
///
/// A later `<input>` with an already seen name replaces the earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormFields {
    fields: Vec<FormField>,
}

impl FormFields {
    pub fn get(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormField> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn upsert(&mut self, field: FormField) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    fn has_type(&self, wanted: &[FieldType]) -> bool {
        self.fields.iter().any(|f| wanted.contains(&f.field_type))
    }
}

/// Collects every named `<input>` of `html`.
///
/// Missing `type` defaults to text and missing `value` to empty. Inputs
/// without a `name` cannot be submitted and are skipped.
pub fn extract_form_fields(html: &str) -> FormFields {
    let mut fields = FormFields::default();
    for tag in INPUT_TAG.captures_iter(html) {
        let attrs = tag.get(1).map_or("", |m| m.as_str());
        let mut name = None;
        let mut field_type = FieldType::Text;
        let mut value = String::new();
        for attr in ATTRIBUTE.captures_iter(attrs) {
            let key = attr[1].to_ascii_lowercase();
            let raw = attr
                .get(2)
                .or_else(|| attr.get(3))
                .or_else(|| attr.get(4))
                .map_or("", |m| m.as_str());
            match key.as_str() {
                "name" => name = Some(raw.to_string()),
                "type" => field_type = FieldType::parse(raw),
                "value" => value = raw.to_string(),
                _ => {}
            }
        }
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            fields.upsert(FormField {
                name,
                field_type,
                value,
            });
        }
    }
    fields
}

/// Finds an anti-forgery token published outside the form inputs.
pub fn extract_csrf_token(html: &str) -> Option<String> {
    [&*META_CSRF, &*SCRIPT_CSRF]
        .iter()
        .find_map(|re| re.captures(html))
        .map(|caps| caps[1].to_string())
}

/// Builds the `application/x-www-form-urlencoded` pairs for a login POST.
///
/// Hidden fields are forwarded verbatim, text/email fields receive the
/// username and password fields the password. Other input types are not
/// submitted. Pages without a visible username or password input get
/// `username` / `password` fields so the credentials are always sent; an
/// existing input under one of those names is filled in place, so no name
/// is ever submitted twice.
pub fn build_login_submission(
    fields: &FormFields,
    csrf_token: Option<&str>,
    credentials: &Credentials,
) -> Vec<(String, String)> {
    let needs_username = !fields.has_type(&[FieldType::Text, FieldType::Email]);
    let needs_password = !fields.has_type(&[FieldType::Password]);

    let mut pairs = Vec::with_capacity(fields.len() + 3);
    for field in fields.iter() {
        let value = match (field.name.as_str(), field.field_type) {
            (FALLBACK_USERNAME, _) if needs_username => credentials.username.clone(),
            (FALLBACK_PASSWORD, _) if needs_password => credentials.password.clone(),
            (_, FieldType::Hidden) => field.value.clone(),
            (_, FieldType::Text | FieldType::Email) => credentials.username.clone(),
            (_, FieldType::Password) => credentials.password.clone(),
            (_, FieldType::Other) => continue,
        };
        pairs.push((field.name.clone(), value));
    }

    if needs_username && fields.get(FALLBACK_USERNAME).is_none() {
        pairs.push((FALLBACK_USERNAME.to_string(), credentials.username.clone()));
    }
    if needs_password && fields.get(FALLBACK_PASSWORD).is_none() {
        pairs.push((FALLBACK_PASSWORD.to_string(), credentials.password.clone()));
    }
    if let Some(token) = csrf_token {
        if fields.get(CSRF_FIELD).is_none() {
            pairs.push((CSRF_FIELD.to_string(), token.to_string()));
        }
    }
    pairs
}

/// URL-encodes submission pairs into a request body.
pub fn encode_form(pairs: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish()
}
