use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use milestone_auth::Session;
use milestone_core::RecordId;

use crate::failure::Failure;
use crate::validation::{RuleSet, ValidationErrors};

/// Raw, untyped request fields as delivered by a transport (JSON object).
pub type RawFields = serde_json::Map<String, JsonValue>;

/// Request input as a transport hands it over: the raw fields, or the reasons
/// they could not be read at all (a body that is not an object, a malformed
/// path parameter).
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Fields(RawFields),
    Rejected(ValidationErrors),
}

impl From<RawFields> for Submission {
    fn from(value: RawFields) -> Self {
        Submission::Fields(value)
    }
}

impl From<ValidationErrors> for Submission {
    fn from(value: ValidationErrors) -> Self {
        Submission::Rejected(value)
    }
}

/// A kind of command: its stable name, its input fields and its result type.
///
/// Implementors are plain input structs. Their fields are the statically
/// declared parameters of the command; [`Command::from_fields`] populates them
/// from raw request data through `serde`, so unknown or mistyped fields are
/// rejected instead of silently assigned.
///
/// ## Contract
///
/// - `KIND` is stable (it keys the authorization policy and appears in logs).
/// - `rules()` declares field-level validation in evaluation order.
/// - `target()` names the record an ownership check resolves, if any.
pub trait CommandKind: core::fmt::Debug + Send + Sync + 'static {
    const KIND: &'static str;

    /// Result payload produced by the executor (absent results render as 204).
    type Output: Serialize + core::fmt::Debug + Send + Sync;

    fn rules(&self) -> RuleSet {
        RuleSet::new()
    }

    fn target(&self) -> Option<ResourceRef> {
        None
    }
}

/// Reference to a stored record: `(collection, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub collection: &'static str,
    pub id: RecordId,
}

impl ResourceRef {
    pub fn new(collection: &'static str, id: RecordId) -> Self {
        Self { collection, id }
    }
}

impl core::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}#{}", self.collection, self.id)
    }
}

/// Bearer credential presented with a request.
///
/// `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for Credential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// One unit of requested work travelling through a pipeline.
///
/// Created fresh per request, mutated in place by the stages (session attached,
/// validation errors accumulated, result stored) and dropped afterwards.
///
/// The result is written at most once, by the terminal stage, and only when no
/// validation errors were recorded.
///
/// A command whose fields could not be bound still runs through the chain, so
/// it is authorized and translated like any other; it carries `K::default()`
/// as input and its `schema` violations, and never executes.
#[derive(Debug)]
pub struct Command<K: CommandKind> {
    input: K,
    credential: Option<Credential>,
    session: Option<Session>,
    errors: ValidationErrors,
    result: Option<K::Output>,
    bound: bool,
    executed: bool,
}

impl<K: CommandKind> Command<K> {
    pub fn new(input: K, credential: Option<Credential>) -> Self {
        Self {
            input,
            credential,
            session: None,
            errors: ValidationErrors::new(),
            result: None,
            bound: true,
            executed: false,
        }
    }

    /// Build a command from raw request fields.
    ///
    /// Fields that do not fit the kind's declared input (unknown names, wrong
    /// types) leave the command unbound with a `schema` violation.
    pub fn from_fields(fields: RawFields, credential: Option<Credential>) -> Self
    where
        K: DeserializeOwned + Default,
    {
        Self::from_submission(Submission::Fields(fields), credential)
    }

    pub fn from_submission(submission: Submission, credential: Option<Credential>) -> Self
    where
        K: DeserializeOwned + Default,
    {
        let mut errors = match submission {
            Submission::Fields(fields) => match serde_json::from_value::<K>(JsonValue::Object(fields)) {
                Ok(input) => return Self::new(input, credential),
                Err(e) => {
                    let message = e.to_string();
                    let mut errors = ValidationErrors::new();
                    errors.add(&field_from_serde_message(&message), "schema", message);
                    errors
                }
            },
            Submission::Rejected(errors) => errors,
        };
        if errors.is_empty() {
            errors.add("base", "schema", "request fields could not be read");
        }

        Self {
            errors,
            bound: false,
            ..Self::new(K::default(), credential)
        }
    }

    pub fn kind(&self) -> &'static str {
        K::KIND
    }

    /// Declared input. `K::default()` when the fields could not be bound.
    pub fn input(&self) -> &K {
        &self.input
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Attach the session resolved from this command's credential.
    pub fn attach_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut ValidationErrors {
        &mut self.errors
    }

    pub fn result(&self) -> Option<&K::Output> {
        self.result.as_ref()
    }

    pub fn take_result(&mut self) -> Option<K::Output> {
        self.result.take()
    }

    /// Whether the raw fields were bound onto the kind's declared input.
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Whether the terminal stage has run for this command.
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub(crate) fn complete(&mut self, result: Option<K::Output>) -> Result<(), Failure> {
        if self.executed {
            return Err(Failure::unclassified(format!(
                "{} executed twice",
                K::KIND
            )));
        }
        if !self.errors.is_empty() {
            return Err(Failure::Validation(self.errors.clone()));
        }
        self.executed = true;
        self.result = result;
        Ok(())
    }
}

/// Best-effort field name for a serde error ("missing field `title`" → "title").
fn field_from_serde_message(message: &str) -> String {
    message
        .split_once("field `")
        .and_then(|(_, rest)| rest.split_once('`'))
        .map(|(field, _)| field.to_string())
        .unwrap_or_else(|| "base".to_string())
}
