//! Field constraints, validators and transformers for documents.
//!
//! A [`Schema`] declares which fields a document may carry, how each one is
//! validated, and how values are transformed on the way in and out of the
//! record. Schemas are pure data plus functions: they never perform I/O.
//!
//! # Example
//!
//! ```ignore
//! use docmodel::schema::{Schema, FieldConstraint, Transformer};
//!
//! let schema = Schema::builder()
//!     .field("id", FieldConstraint::string())
//!     .field("name", FieldConstraint::string().required().max_length(64))
//!     .field("email", FieldConstraint::string().required().format("email"))
//!     .transformer("email", Transformer::new().on_set(|v| match v {
//!         bson::Bson::String(s) => bson::Bson::String(s.to_lowercase()),
//!         other => other,
//!     }))
//!     .primary_key("id")
//!     .build()?;
//! ```

use std::{collections::BTreeMap, fmt, sync::Arc};

use bson::Bson;

use crate::{
    diff::values_equal,
    document::RawRecord,
    error::{DocumentError, DocumentResult, ValidationErrors},
};

/// Custom per-field validator. Returns the failure reason on error.
pub type FieldValidator = Arc<dyn Fn(&Bson) -> Result<(), String> + Send + Sync>;

/// Cross-field validator run against the whole record at save time.
pub type RecordValidator = Arc<dyn Fn(&RawRecord) -> Result<(), ValidationErrors> + Send + Sync>;

/// Checker for a named string format.
pub type FormatChecker = Arc<dyn Fn(&str) -> bool + Send + Sync>;

type GetFn = Arc<dyn Fn(&Bson) -> Bson + Send + Sync>;
type SetFn = Arc<dyn Fn(Bson) -> Bson + Send + Sync>;

const BUILTIN_FORMATS: [&str; 4] = ["email", "uuid", "date-time", "uri"];

/// The declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    /// 32- or 64-bit integer.
    Integer,
    /// Any integer or double.
    Number,
    Boolean,
    /// A BSON datetime or an RFC 3339 string.
    DateTime,
    Object,
    Array,
    Any,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::DateTime => "date-time",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::Any => "any",
        }
    }

    /// Returns whether `value` has this type.
    pub fn accepts(&self, value: &Bson) -> bool {
        match (self, value) {
            (FieldType::Any, _) => true,
            (FieldType::String, Bson::String(_)) => true,
            (FieldType::Integer, Bson::Int32(_) | Bson::Int64(_)) => true,
            (FieldType::Number, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => true,
            (FieldType::Boolean, Bson::Boolean(_)) => true,
            (FieldType::DateTime, Bson::DateTime(_)) => true,
            (FieldType::DateTime, Bson::String(s)) => is_date_time(s),
            (FieldType::Object, Bson::Document(_)) => true,
            (FieldType::Array, Bson::Array(_)) => true,
            _ => false,
        }
    }
}

/// Shape of a nested value.
#[derive(Debug, Clone)]
pub enum Nested {
    /// The field holds one embedded record validated by the schema.
    Object(Schema),
    /// The field holds an array of embedded records, each validated by the schema.
    ArrayOf(Schema),
}

/// Declarative constraints for a single field.
#[derive(Debug, Clone)]
pub struct FieldConstraint {
    pub field_type: FieldType,
    pub required: bool,
    pub format: Option<String>,
    /// Minimum length in characters (strings) or elements (arrays).
    pub min_length: Option<usize>,
    /// Maximum length in characters (strings) or elements (arrays).
    pub max_length: Option<usize>,
    /// Closed set of accepted values.
    pub allowed: Option<Vec<Bson>>,
    /// Value pre-populated by `Model::create`.
    pub default: Option<Bson>,
    pub nested: Option<Nested>,
}

impl FieldConstraint {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            format: None,
            min_length: None,
            max_length: None,
            allowed: None,
            default: None,
            nested: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn datetime() -> Self {
        Self::new(FieldType::DateTime)
    }

    pub fn any() -> Self {
        Self::new(FieldType::Any)
    }

    pub fn array() -> Self {
        Self::new(FieldType::Array)
    }

    /// An embedded record validated by `schema`.
    pub fn object(schema: Schema) -> Self {
        Self {
            nested: Some(Nested::Object(schema)),
            ..Self::new(FieldType::Object)
        }
    }

    /// An array whose elements are embedded records validated by `schema`.
    pub fn array_of(schema: Schema) -> Self {
        Self {
            nested: Some(Nested::ArrayOf(schema)),
            ..Self::new(FieldType::Array)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn one_of<V: Into<Bson>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn default_value(mut self, value: impl Into<Bson>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// A get/set transformer pair for one field.
///
/// The set half runs when a value is assigned and its output is what gets
/// stored; the get half runs on reads. Both must be pure. A missing half is
/// the identity.
#[derive(Clone, Default)]
pub struct Transformer {
    get: Option<GetFn>,
    set: Option<SetFn>,
}

impl Transformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get(mut self, f: impl Fn(&Bson) -> Bson + Send + Sync + 'static) -> Self {
        self.get = Some(Arc::new(f));
        self
    }

    pub fn on_set(mut self, f: impl Fn(Bson) -> Bson + Send + Sync + 'static) -> Self {
        self.set = Some(Arc::new(f));
        self
    }

    pub fn apply_get(&self, value: &Bson) -> Bson {
        match &self.get {
            Some(get) => get(value),
            None => value.clone(),
        }
    }

    pub fn apply_set(&self, value: Bson) -> Bson {
        match &self.set {
            Some(set) => set(value),
            None => value,
        }
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("get", &self.get.is_some())
            .field("set", &self.set.is_some())
            .finish()
    }
}

/// An immutable set of field constraints, validators and transformers.
///
/// Construct with [`Schema::builder`].
#[derive(Clone, Default)]
pub struct Schema {
    fields: BTreeMap<String, FieldConstraint>,
    primary_key: Option<String>,
    validators: BTreeMap<String, Vec<FieldValidator>>,
    transformers: BTreeMap<String, Transformer>,
    record_validators: Vec<RecordValidator>,
    formats: BTreeMap<String, FormatChecker>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// The name of the primary-key field, if the schema exposes one.
    ///
    /// `None` means the backing store assigns identity and no field carries it.
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    pub fn field(&self, name: &str) -> Option<&FieldConstraint> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldConstraint)> {
        self.fields
            .iter()
            .map(|(name, constraint)| (name.as_str(), constraint))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// A record holding every declared default value.
    pub fn defaults(&self) -> RawRecord {
        self.fields
            .iter()
            .filter_map(|(name, constraint)| {
                constraint
                    .default
                    .clone()
                    .map(|value| (name.clone(), value))
            })
            .collect()
    }

    pub fn apply_get_transform(&self, field: &str, value: &Bson) -> Bson {
        match self.transformers.get(field) {
            Some(transformer) => transformer.apply_get(value),
            None => value.clone(),
        }
    }

    pub fn apply_set_transform(&self, field: &str, value: Bson) -> Bson {
        match self.transformers.get(field) {
            Some(transformer) => transformer.apply_set(value),
            None => value,
        }
    }

    /// Validates a whole record.
    ///
    /// Checks required presence, types, formats, lengths and allowed values,
    /// recursing into nested schemas, then runs field and record validators.
    /// Fields the schema does not declare are ignored.
    pub fn validate(&self, record: &RawRecord) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.collect_record_errors(record, "", &mut errors);
        errors.into_result()
    }

    /// Validates a single field value, as done on assignment.
    ///
    /// Undeclared fields always pass; declaration is enforced by the document.
    pub fn validate_field(&self, field: &str, value: &Bson) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(constraint) = self.fields.get(field) {
            self.collect_field_errors(field, constraint, Some(value), field, &mut errors);
        }
        errors.into_result()
    }

    fn collect_record_errors(&self, record: &RawRecord, prefix: &str, errors: &mut ValidationErrors) {
        for (name, constraint) in &self.fields {
            let path = join_path(prefix, name);
            self.collect_field_errors(name, constraint, record.get(name), &path, errors);
        }

        for validator in &self.record_validators {
            if let Err(record_errors) = validator(record) {
                for (field, reason) in record_errors.iter() {
                    errors.insert(join_path(prefix, field), reason);
                }
            }
        }
    }

    fn collect_field_errors(
        &self,
        name: &str,
        constraint: &FieldConstraint,
        value: Option<&Bson>,
        path: &str,
        errors: &mut ValidationErrors,
    ) {
        let value = match value {
            None | Some(Bson::Null) => {
                if constraint.required {
                    errors.insert(path, "is required");
                }
                return;
            }
            Some(value) => value,
        };

        if let Err(reason) = self.check_constraint(constraint, value) {
            errors.insert(path, reason);
            return;
        }

        match (&constraint.nested, value) {
            (Some(Nested::Object(schema)), Bson::Document(inner)) => {
                schema.collect_record_errors(inner, path, errors);
            }
            (Some(Nested::ArrayOf(schema)), Bson::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    let item_path = format!("{path}.{index}");
                    match item {
                        Bson::Document(inner) => schema.collect_record_errors(inner, &item_path, errors),
                        _ => errors.insert(item_path, "expected object"),
                    }
                }
            }
            _ => {}
        }

        for validator in self.validators.get(name).into_iter().flatten() {
            if let Err(reason) = validator(value) {
                errors.insert(path, reason);
                break;
            }
        }
    }

    fn check_constraint(&self, constraint: &FieldConstraint, value: &Bson) -> Result<(), String> {
        if !constraint.field_type.accepts(value) {
            return Err(format!("expected {}", constraint.field_type.name()));
        }

        if let Some(allowed) = &constraint.allowed {
            if !allowed.iter().any(|candidate| values_equal(candidate, value)) {
                let choices = allowed
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(format!("must be one of [{choices}]"));
            }
        }

        let length = match value {
            Bson::String(s) => Some(s.chars().count()),
            Bson::Array(items) => Some(items.len()),
            _ => None,
        };
        if let Some(length) = length {
            if let Some(min) = constraint.min_length.filter(|min| length < *min) {
                return Err(format!("length must be at least {min}"));
            }
            if let Some(max) = constraint.max_length.filter(|max| length > *max) {
                return Err(format!("length must be at most {max}"));
            }
        }

        if let (Some(format), Bson::String(s)) = (&constraint.format, value) {
            if !self.check_format(format, s) {
                return Err(format!("is not a valid {format}"));
            }
        }

        Ok(())
    }

    fn check_format(&self, format: &str, value: &str) -> bool {
        if let Some(checker) = self.formats.get(format) {
            return checker(value);
        }

        match format {
            "email" => is_email(value),
            "uuid" => uuid::Uuid::parse_str(value).is_ok(),
            "date-time" => is_date_time(value),
            "uri" => is_uri(value),
            // Unknown formats are rejected when the schema is built.
            _ => true,
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("fields", &self.fields)
            .field("primary_key", &self.primary_key)
            .field("validators", &self.validators.keys().collect::<Vec<_>>())
            .field("transformers", &self.transformers)
            .field("record_validators", &self.record_validators.len())
            .field("formats", &self.formats.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`Schema`].
#[derive(Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field. Declaring the same name twice replaces the constraint.
    pub fn field(mut self, name: impl Into<String>, constraint: FieldConstraint) -> Self {
        self.schema.fields.insert(name.into(), constraint);
        self
    }

    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.schema.primary_key = Some(name.into());
        self
    }

    /// Adds a validator for `field`. Validators run in registration order; the
    /// first failure is reported.
    pub fn validator(
        mut self,
        field: impl Into<String>,
        validator: impl Fn(&Bson) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.schema
            .validators
            .entry(field.into())
            .or_default()
            .push(Arc::new(validator));
        self
    }

    pub fn transformer(mut self, field: impl Into<String>, transformer: Transformer) -> Self {
        self.schema.transformers.insert(field.into(), transformer);
        self
    }

    /// Adds a cross-field validator. These only run when the whole record is
    /// validated, never on single-field assignment.
    pub fn record_validator(
        mut self,
        validator: impl Fn(&RawRecord) -> Result<(), ValidationErrors> + Send + Sync + 'static,
    ) -> Self {
        self.schema.record_validators.push(Arc::new(validator));
        self
    }

    /// Registers a named string format. Overrides a built-in of the same name.
    pub fn format(
        mut self,
        name: impl Into<String>,
        checker: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.schema.formats.insert(name.into(), Arc::new(checker));
        self
    }

    pub fn build(self) -> DocumentResult<Schema> {
        let schema = self.schema;

        if let Some(primary_key) = &schema.primary_key {
            match schema.fields.get(primary_key) {
                None => {
                    return Err(DocumentError::InvalidSchema(format!(
                        "primary key `{primary_key}` is not a declared field"
                    )));
                }
                // Stores assign string keys.
                Some(constraint)
                    if !matches!(constraint.field_type, FieldType::String | FieldType::Any) =>
                {
                    return Err(DocumentError::InvalidSchema(format!(
                        "primary key `{primary_key}` must be a string field"
                    )));
                }
                Some(_) => {}
            }
        }

        for field in schema.validators.keys().chain(schema.transformers.keys()) {
            if !schema.fields.contains_key(field) {
                return Err(DocumentError::InvalidSchema(format!(
                    "`{field}` has a validator or transformer but is not declared"
                )));
            }
        }

        for (name, constraint) in &schema.fields {
            if let Some(format) = &constraint.format {
                if !BUILTIN_FORMATS.contains(&format.as_str()) && !schema.formats.contains_key(format) {
                    return Err(DocumentError::InvalidSchema(format!(
                        "field `{name}` uses unknown format `{format}`"
                    )));
                }
            }
        }

        Ok(schema)
    }
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn is_date_time(value: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(value).is_ok()
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}

fn is_uri(value: &str) -> bool {
    let Some((scheme, rest)) = value.split_once("://") else {
        return false;
    };

    scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !rest.is_empty()
        && !value.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pretty_assertions::assert_eq;

    fn user_schema() -> Schema {
        Schema::builder()
            .field("id", FieldConstraint::string())
            .field("name", FieldConstraint::string().required().min_length(2).max_length(32))
            .field("email", FieldConstraint::string().required().format("email"))
            .field("role", FieldConstraint::string().one_of(["admin", "member"]).default_value("member"))
            .primary_key("id")
            .build()
            .unwrap()
    }

    #[test]
    fn missing_required_fields_are_reported_individually() {
        let errors = user_schema().validate(&doc! {}).unwrap_err();

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("name"), Some("is required"));
        assert_eq!(errors.get("email"), Some("is required"));
    }

    #[test]
    fn null_counts_as_missing() {
        let errors = user_schema()
            .validate(&doc! { "name": null, "email": "a@b.io" })
            .unwrap_err();

        assert_eq!(errors.get("name"), Some("is required"));
    }

    #[test]
    fn valid_record_passes_and_unknown_fields_are_ignored() {
        let record = doc! { "name": "Marco", "email": "marcot@x.ca", "legacy_flag": true };
        assert!(user_schema().validate(&record).is_ok());
    }

    #[test]
    fn type_format_length_and_enum_checks() {
        let record = doc! { "name": "M", "email": "not-an-email", "role": "owner" };
        let errors = user_schema().validate(&record).unwrap_err();

        assert_eq!(errors.get("name"), Some("length must be at least 2"));
        assert_eq!(errors.get("email"), Some("is not a valid email"));
        assert_eq!(errors.get("role"), Some("must be one of [\"admin\", \"member\"]"));

        let errors = user_schema()
            .validate(&doc! { "name": 42, "email": "a@b.io" })
            .unwrap_err();
        assert_eq!(errors.get("name"), Some("expected string"));
    }

    #[test]
    fn nested_schemas_report_dotted_paths() {
        let address = Schema::builder()
            .field("city", FieldConstraint::string().required())
            .build()
            .unwrap();
        let line = Schema::builder()
            .field("sku", FieldConstraint::string().required())
            .field("qty", FieldConstraint::integer())
            .build()
            .unwrap();
        let schema = Schema::builder()
            .field("address", FieldConstraint::object(address))
            .field("lines", FieldConstraint::array_of(line))
            .build()
            .unwrap();

        let record = doc! {
            "address": {},
            "lines": [ { "sku": "A1", "qty": 2 }, { "qty": "three" }, 7 ],
        };
        let errors = schema.validate(&record).unwrap_err();

        assert_eq!(errors.get("address.city"), Some("is required"));
        assert_eq!(errors.get("lines.1.sku"), Some("is required"));
        assert_eq!(errors.get("lines.1.qty"), Some("expected integer"));
        assert_eq!(errors.get("lines.2"), Some("expected object"));
        assert!(!errors.contains("lines.0.sku"));
    }

    #[test]
    fn custom_and_record_validators() {
        let schema = Schema::builder()
            .field("start", FieldConstraint::integer())
            .field("end", FieldConstraint::integer())
            .validator("start", |v| match v.as_i32() {
                Some(n) if n >= 0 => Ok(()),
                _ => Err("must not be negative".to_string()),
            })
            .record_validator(|record| {
                let mut errors = ValidationErrors::new();
                if let (Some(start), Some(end)) = (record.get("start"), record.get("end")) {
                    if start.as_i32() > end.as_i32() {
                        errors.insert("end", "must not precede start");
                    }
                }
                errors.into_result()
            })
            .build()
            .unwrap();

        assert_eq!(
            schema.validate_field("start", &Bson::Int32(-1)).unwrap_err().get("start"),
            Some("must not be negative"),
        );
        // Record validators are deferred to whole-record validation.
        assert!(schema.validate_field("end", &Bson::Int32(0)).is_ok());
        assert_eq!(
            schema.validate(&doc! { "start": 5, "end": 1 }).unwrap_err().get("end"),
            Some("must not precede start"),
        );
    }

    #[test]
    fn builtin_and_custom_formats() {
        let schema = Schema::builder()
            .field("id", FieldConstraint::string().format("uuid"))
            .field("at", FieldConstraint::string().format("date-time"))
            .field("site", FieldConstraint::string().format("uri"))
            .field("slug", FieldConstraint::string().format("slug"))
            .format("slug", |s| s.chars().all(|c| c.is_ascii_lowercase() || c == '-'))
            .build()
            .unwrap();

        let ok = doc! {
            "id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "at": "2024-05-01T12:00:00Z",
            "site": "https://example.com/a",
            "slug": "hello-world",
        };
        assert!(schema.validate(&ok).is_ok());

        let bad = doc! { "id": "nope", "at": "yesterday", "site": "example.com", "slug": "Hello" };
        let errors = schema.validate(&bad).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn datetime_type_accepts_bson_dates_and_rfc3339_strings() {
        let schema = Schema::builder()
            .field("at", FieldConstraint::datetime())
            .build()
            .unwrap();

        assert!(schema.validate(&doc! { "at": bson::DateTime::now() }).is_ok());
        assert!(schema.validate(&doc! { "at": "2024-05-01T12:00:00+02:00" }).is_ok());
        assert!(schema.validate(&doc! { "at": "05/01/2024" }).is_err());
    }

    #[test]
    fn transforms_default_to_identity() {
        let schema = Schema::builder()
            .field("plain", FieldConstraint::string())
            .field("upper", FieldConstraint::string())
            .transformer(
                "upper",
                Transformer::new()
                    .on_set(|v| Bson::String(v.as_str().unwrap_or_default().to_uppercase()))
                    .on_get(|v| Bson::String(format!("<{}>", v.as_str().unwrap_or_default()))),
            )
            .build()
            .unwrap();

        let value = Bson::String("abc".into());
        assert_eq!(schema.apply_set_transform("plain", value.clone()), value);
        assert_eq!(schema.apply_get_transform("plain", &value), value);
        assert_eq!(schema.apply_set_transform("upper", value.clone()), Bson::String("ABC".into()));
        assert_eq!(schema.apply_get_transform("upper", &value), Bson::String("<abc>".into()));
    }

    #[test]
    fn defaults_are_collected() {
        assert_eq!(user_schema().defaults(), doc! { "role": "member" });
    }

    #[test]
    fn build_rejects_inconsistent_definitions() {
        let undeclared_key = Schema::builder()
            .field("name", FieldConstraint::string())
            .primary_key("id")
            .build();
        assert!(matches!(undeclared_key, Err(DocumentError::InvalidSchema(_))));

        let integer_key = Schema::builder()
            .field("id", FieldConstraint::integer())
            .primary_key("id")
            .build();
        assert!(matches!(integer_key, Err(DocumentError::InvalidSchema(_))));

        let stray_validator = Schema::builder()
            .validator("ghost", |_| Ok(()))
            .build();
        assert!(matches!(stray_validator, Err(DocumentError::InvalidSchema(_))));

        let unknown_format = Schema::builder()
            .field("code", FieldConstraint::string().format("isbn"))
            .build();
        assert!(matches!(unknown_format, Err(DocumentError::InvalidSchema(_))));
    }
}
