//! Declarative form validation.
//!
//! A [`FormSchema`] is plain data: one [`FieldRule`] per field listing the
//! constraints it must satisfy. Drafts expose their values through
//! [`FormFields`], and [`validate`] interprets the schema against a draft,
//! producing a [`ValidationReport`] keyed by field name.

use std::borrow::Cow;

use indexmap::IndexMap;
use serde::Deserialize;
use validator::ValidationError;

use crate::dto::reference::ReferenceOption;

const CODE_REQUIRED: &str = "required";
const CODE_LENGTH: &str = "length";
const CODE_RANGE: &str = "range";
const CODE_REFERENCE: &str = "reference";
const CODE_KIND: &str = "kind";

/// When field errors are recomputed while the user edits a draft.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationTrigger {
    /// Validate on submit; after a failed submit, edits re-validate the draft.
    #[default]
    OnSubmit,
    /// Validate the whole draft after every edit.
    OnChange,
}

/// Value type of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text.
    Text,
    /// Yes/no toggle.
    Flag,
    /// Whole number.
    Integer,
    /// Selection of a [`ReferenceOption`].
    Reference,
}

/// Constraint attached to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Value must be present (non-blank for text).
    Required,
    /// Text must contain at least this many characters, whitespace included.
    MinLength(usize),
    /// Integer must be greater than or equal to this bound.
    Min(i64),
    /// Integer must be lower than or equal to this bound.
    Max(i64),
    /// A selected reference must carry a non-blank identifier.
    RequiredId,
}

/// Validation rule for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    /// Field name, as read through [`FormFields::field`].
    pub name: &'static str,
    /// Label used in error messages.
    pub label: &'static str,
    /// Value type the draft must expose for this field.
    pub kind: FieldKind,
    /// Constraints checked in order; the first failure is reported.
    pub constraints: Vec<Constraint>,
}

/// Ordered collection of field rules describing one entity form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSchema {
    fields: Vec<FieldRule>,
}

impl FormSchema {
    /// Empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field rule.
    pub fn field(
        mut self,
        name: &'static str,
        label: &'static str,
        kind: FieldKind,
        constraints: impl IntoIterator<Item = Constraint>,
    ) -> Self {
        self.fields.push(FieldRule {
            name,
            label,
            kind,
            constraints: constraints.into_iter().collect(),
        });
        self
    }

    /// Rule declared for `name`.
    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|rule| rule.name == name)
    }

    /// Every rule, in declaration order.
    pub fn fields(&self) -> &[FieldRule] {
        &self.fields
    }

    /// Whether `name` carries a [`Constraint::Required`].
    pub fn is_required(&self, name: &str) -> bool {
        self.rule(name)
            .is_some_and(|rule| rule.constraints.contains(&Constraint::Required))
    }
}

/// Current value of a draft field, as seen by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    /// Text input, `None` when never filled.
    Text(Option<&'a str>),
    /// Toggle, `None` when unset.
    Flag(Option<bool>),
    /// Number input, `None` when empty.
    Integer(Option<i64>),
    /// Selector, `None` when nothing is selected.
    Reference(Option<&'a ReferenceOption>),
    /// The draft has no field with this name.
    Missing,
}

/// Read access to a draft's fields by name.
pub trait FormFields {
    /// Value of the field `name`, or [`FieldValue::Missing`].
    fn field(&self, name: &str) -> FieldValue<'_>;
}

/// Field-level validation errors, in schema order. An absent entry means the
/// field is valid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    errors: IndexMap<&'static str, ValidationError>,
}

impl ValidationReport {
    /// Report without any error.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether every field passed.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failing fields.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether no field failed.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Error recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&ValidationError> {
        self.errors.get(field)
    }

    /// Message to render inline under `field`.
    pub fn message(&self, field: &str) -> Option<&str> {
        self.get(field)
            .and_then(|err| err.message.as_deref())
    }

    /// Names of the failing fields.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.errors.keys().copied()
    }

    /// Record or clear the error for one field.
    pub(crate) fn set(&mut self, field: &'static str, error: Option<ValidationError>) {
        match error {
            Some(error) => {
                self.errors.insert(field, error);
            }
            None => {
                self.errors.shift_remove(field);
            }
        }
    }
}

/// Validate every field of `draft` against `schema`.
///
/// Pure: the draft is never modified, and each failing field reports its first
/// failing constraint.
pub fn validate<D>(schema: &FormSchema, draft: &D) -> ValidationReport
where
    D: FormFields + ?Sized,
{
    let mut report = ValidationReport::new();
    for rule in schema.fields() {
        report.set(rule.name, check_rule(rule, draft.field(rule.name)));
    }
    report
}

/// Validate a single field of `draft`; `None` when valid or undeclared.
pub fn validate_field<D>(schema: &FormSchema, draft: &D, name: &str) -> Option<ValidationError>
where
    D: FormFields + ?Sized,
{
    let rule = schema.rule(name)?;
    check_rule(rule, draft.field(rule.name))
}

fn check_rule(rule: &FieldRule, value: FieldValue<'_>) -> Option<ValidationError> {
    if !kind_matches(rule.kind, value) {
        return Some(field_error(
            CODE_KIND,
            format!("{} has an unexpected value", rule.label),
        ));
    }
    rule.constraints
        .iter()
        .find_map(|constraint| check_constraint(rule, *constraint, value))
}

fn check_constraint(
    rule: &FieldRule,
    constraint: Constraint,
    value: FieldValue<'_>,
) -> Option<ValidationError> {
    let label = rule.label;
    match (constraint, value) {
        (Constraint::Required, value) if is_absent(value) => Some(field_error(
            CODE_REQUIRED,
            format!("{label} is required"),
        )),
        (Constraint::MinLength(min), FieldValue::Text(Some(text)))
            if text.chars().count() < min =>
        {
            let mut err = field_error(
                CODE_LENGTH,
                format!("{label} must be at least {min} characters"),
            );
            err.add_param(Cow::from("min"), &min);
            Some(err)
        }
        (Constraint::Min(min), FieldValue::Integer(Some(number))) if number < min => {
            let mut err = field_error(CODE_RANGE, format!("{label} must be at least {min}"));
            err.add_param(Cow::from("min"), &min);
            Some(err)
        }
        (Constraint::Max(max), FieldValue::Integer(Some(number))) if number > max => {
            let mut err = field_error(CODE_RANGE, format!("{label} must be at most {max}"));
            err.add_param(Cow::from("max"), &max);
            Some(err)
        }
        (Constraint::RequiredId, FieldValue::Reference(Some(option))) if !option.has_id() => {
            Some(field_error(
                CODE_REFERENCE,
                format!("{label} must be selected"),
            ))
        }
        _ => None,
    }
}

fn kind_matches(kind: FieldKind, value: FieldValue<'_>) -> bool {
    matches!(
        (kind, value),
        (_, FieldValue::Missing)
            | (FieldKind::Text, FieldValue::Text(_))
            | (FieldKind::Flag, FieldValue::Flag(_))
            | (FieldKind::Integer, FieldValue::Integer(_))
            | (FieldKind::Reference, FieldValue::Reference(_))
    )
}

fn is_absent(value: FieldValue<'_>) -> bool {
    match value {
        FieldValue::Text(text) => text.is_none_or(|text| text.trim().is_empty()),
        FieldValue::Flag(flag) => flag.is_none(),
        FieldValue::Integer(number) => number.is_none(),
        FieldValue::Reference(option) => option.is_none(),
        FieldValue::Missing => true,
    }
}

fn field_error(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Draft {
        name: String,
        active: Option<bool>,
        age: Option<i64>,
        rank: Option<ReferenceOption>,
    }

    impl FormFields for Draft {
        fn field(&self, name: &str) -> FieldValue<'_> {
            match name {
                "name" => FieldValue::Text(Some(&self.name)),
                "active" => FieldValue::Flag(self.active),
                "age" => FieldValue::Integer(self.age),
                "rank" => FieldValue::Reference(self.rank.as_ref()),
                _ => FieldValue::Missing,
            }
        }
    }

    fn schema() -> FormSchema {
        FormSchema::new()
            .field(
                "name",
                "Name",
                FieldKind::Text,
                [Constraint::Required, Constraint::MinLength(3)],
            )
            .field("active", "Active", FieldKind::Flag, [Constraint::Required])
            .field(
                "age",
                "Age",
                FieldKind::Integer,
                [Constraint::Min(0), Constraint::Max(120)],
            )
            .field(
                "rank",
                "Rank",
                FieldKind::Reference,
                [Constraint::Required, Constraint::RequiredId],
            )
    }

    fn valid_draft() -> Draft {
        Draft {
            name: "Ana".into(),
            active: Some(true),
            age: Some(30),
            rank: Some(ReferenceOption::new("silver", "Silver")),
        }
    }

    #[test]
    fn valid_draft_produces_empty_report() {
        let report = validate(&schema(), &valid_draft());
        assert!(report.is_valid());
        assert_eq!(report.len(), 0);
    }

    #[test]
    fn empty_draft_reports_every_required_field_in_order() {
        let report = validate(&schema(), &Draft::default());
        let fields: Vec<_> = report.fields().collect();
        assert_eq!(fields, vec!["name", "active", "rank"]);
        assert_eq!(report.get("name").unwrap().code, "required");
        assert_eq!(report.message("rank"), Some("Rank is required"));
    }

    #[test]
    fn short_text_fails_min_length() {
        let draft = Draft {
            name: "Al".into(),
            ..valid_draft()
        };
        let report = validate(&schema(), &draft);
        let err = report.get("name").unwrap();
        assert_eq!(err.code, "length");
        assert_eq!(err.message.as_deref(), Some("Name must be at least 3 characters"));
    }

    #[test]
    fn blank_text_counts_as_missing() {
        let draft = Draft {
            name: "   ".into(),
            ..valid_draft()
        };
        assert_eq!(validate(&schema(), &draft).get("name").unwrap().code, "required");
    }

    #[test]
    fn length_counts_surrounding_whitespace() {
        let padded = Draft {
            name: " Al".into(),
            ..valid_draft()
        };
        assert!(validate(&schema(), &padded).is_valid());

        let short = Draft {
            name: " A".into(),
            ..valid_draft()
        };
        assert_eq!(validate(&schema(), &short).get("name").unwrap().code, "length");
    }

    #[test]
    fn value_of_another_kind_is_rejected() {
        let schema = FormSchema::new()
            .field("name", "Name", FieldKind::Integer, [Constraint::Min(0)])
            .field("age", "Age", FieldKind::Integer, [Constraint::Min(0)]);

        let report = validate(&schema, &valid_draft());
        assert_eq!(report.fields().collect::<Vec<_>>(), vec!["name"]);
        let err = report.get("name").unwrap();
        assert_eq!(err.code, "kind");
        assert_eq!(err.message.as_deref(), Some("Name has an unexpected value"));
        assert!(validate_field(&schema, &valid_draft(), "age").is_none());
    }

    #[test]
    fn integer_bounds_are_enforced() {
        let low = Draft {
            age: Some(-1),
            ..valid_draft()
        };
        let high = Draft {
            age: Some(121),
            ..valid_draft()
        };
        assert_eq!(validate(&schema(), &low).message("age"), Some("Age must be at least 0"));
        assert_eq!(validate(&schema(), &high).message("age"), Some("Age must be at most 120"));
    }

    #[test]
    fn reference_validates_identifier_not_label() {
        let unlabelled = Draft {
            rank: Some(ReferenceOption::unlabelled("silver")),
            ..valid_draft()
        };
        assert!(validate(&schema(), &unlabelled).is_valid());

        let labelled_without_id = Draft {
            rank: Some(ReferenceOption::new("", "Silver")),
            ..valid_draft()
        };
        let report = validate(&schema(), &labelled_without_id);
        assert_eq!(report.get("rank").unwrap().code, "reference");
    }

    #[test]
    fn validation_never_mutates_the_draft() {
        let draft = Draft {
            name: "Al".into(),
            ..valid_draft()
        };
        let _ = validate(&schema(), &draft);
        assert_eq!(draft.name, "Al");
    }

    #[test]
    fn single_field_validation() {
        let draft = Draft {
            name: "Al".into(),
            ..valid_draft()
        };
        assert!(validate_field(&schema(), &draft, "name").is_some());
        assert!(validate_field(&schema(), &draft, "rank").is_none());
        assert!(validate_field(&schema(), &draft, "unknown").is_none());
    }

    #[test]
    fn undeclared_fields_are_reported_missing_when_required() {
        let schema = FormSchema::new().field("ghost", "Ghost", FieldKind::Text, [Constraint::Required]);
        assert!(schema.is_required("ghost"));
        assert_eq!(validate(&schema, &valid_draft()).message("ghost"), Some("Ghost is required"));
    }
}
