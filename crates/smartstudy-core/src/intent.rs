// Intent schema and validation
//
// The language model answers with `{"intent": "<name>", "payload": {...}}`.
// The payload contract of every intent is a JSON Schema document; candidates
// are checked with `jsonschema` so every mismatching field is reported, then
// decoded into the typed `Intent` with serde. Only `end > start` is checked
// in Rust. Validation is pure: no I/O, no clock.
//
// Unknown keys are ignored, so a serialized `Event`/`Task` re-validates as an
// `add_event`/`add_task` payload. `null` is never accepted in place of an
// optional field.

use chrono::{DateTime, Utc};
use jsonschema::error::ValidationErrorKind;
use jsonschema::{ValidationError, Validator};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::OnceLock;

use crate::domain::{EventPatch, NewEvent, NewTask, TaskPatch};
use crate::instant::{self, INSTANT_PATTERN, INVALID_INSTANT};

// ============================================================================
// Intent catalogue
// ============================================================================

/// Discriminant of an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    AddEvent,
    UpdateEvent,
    DeleteEvent,
    DeleteEvents,
    GetEvents,
    AddTask,
    UpdateTask,
    DeleteTask,
    GetTasks,
    ControlPomodoro,
    PlanSchedule,
    PlanTasks,
    Help,
}

impl IntentKind {
    pub const ALL: [IntentKind; 13] = [
        IntentKind::AddEvent,
        IntentKind::UpdateEvent,
        IntentKind::DeleteEvent,
        IntentKind::DeleteEvents,
        IntentKind::GetEvents,
        IntentKind::AddTask,
        IntentKind::UpdateTask,
        IntentKind::DeleteTask,
        IntentKind::GetTasks,
        IntentKind::ControlPomodoro,
        IntentKind::PlanSchedule,
        IntentKind::PlanTasks,
        IntentKind::Help,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::AddEvent => "add_event",
            IntentKind::UpdateEvent => "update_event",
            IntentKind::DeleteEvent => "delete_event",
            IntentKind::DeleteEvents => "delete_events",
            IntentKind::GetEvents => "get_events",
            IntentKind::AddTask => "add_task",
            IntentKind::UpdateTask => "update_task",
            IntentKind::DeleteTask => "delete_task",
            IntentKind::GetTasks => "get_tasks",
            IntentKind::ControlPomodoro => "control_pomodoro",
            IntentKind::PlanSchedule => "plan_schedule",
            IntentKind::PlanTasks => "plan_tasks",
            IntentKind::Help => "help",
        }
    }

    /// Intents whose payload may be omitted entirely
    fn payload_optional(&self) -> bool {
        matches!(
            self,
            IntentKind::GetEvents | IntentKind::GetTasks | IntentKind::Help
        )
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open or closed time range
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TimeRange {
    #[serde(default, deserialize_with = "instant::optional")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "instant::optional")]
    pub end: Option<DateTime<Utc>>,
}

/// Filter criteria for bulk event deletion
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSelector {
    pub title_contains: Option<String>,
    #[serde(default, deserialize_with = "instant::optional")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "instant::optional")]
    pub to: Option<DateTime<Utc>>,
}

impl EventSelector {
    /// True when no criterion is set (the selector would match everything)
    pub fn is_empty(&self) -> bool {
        self.title_contains.as_deref().map_or(true, |t| t.trim().is_empty())
            && self.from.is_none()
            && self.to.is_none()
    }
}

/// Task status selector for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    All,
    Open,
    Done,
}

impl TaskStatus {
    /// Value of the `done` flag this status selects, if any
    pub fn done_flag(&self) -> Option<bool> {
        match self {
            TaskStatus::All => None,
            TaskStatus::Open => Some(false),
            TaskStatus::Done => Some(true),
        }
    }
}

/// Pomodoro timer action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PomodoroAction {
    Start,
    Stop,
    Reset,
}

pub const POMODORO_MIN_MINUTES: f64 = 1.0;
pub const POMODORO_MAX_MINUTES: f64 = 120.0;

/// A validated intent
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "intent", content = "payload", rename_all = "snake_case")]
pub enum Intent {
    AddEvent(NewEvent),
    UpdateEvent {
        id: String,
        updates: EventPatch,
    },
    DeleteEvent {
        id: String,
    },
    #[serde(rename_all = "camelCase")]
    DeleteEvents {
        event_ids: Option<Vec<String>>,
        filter: Option<EventSelector>,
        #[serde(default)]
        confirm: bool,
    },
    GetEvents {
        range: Option<TimeRange>,
    },
    AddTask(NewTask),
    UpdateTask {
        id: String,
        updates: TaskPatch,
    },
    DeleteTask {
        id: String,
    },
    #[serde(rename_all = "camelCase")]
    GetTasks {
        status: Option<TaskStatus>,
        #[serde(default, deserialize_with = "instant::optional")]
        due_before: Option<DateTime<Utc>>,
        #[serde(default, deserialize_with = "instant::optional")]
        due_after: Option<DateTime<Utc>>,
    },
    #[serde(rename_all = "camelCase")]
    ControlPomodoro {
        action: PomodoroAction,
        duration_minutes: Option<f64>,
    },
    PlanSchedule {
        events: Vec<NewEvent>,
        summary: Option<String>,
    },
    PlanTasks {
        tasks: Vec<NewTask>,
        summary: Option<String>,
    },
    Help {
        prompt: Option<String>,
        suggestions: Option<Vec<String>>,
    },
}

impl Intent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Intent::AddEvent(_) => IntentKind::AddEvent,
            Intent::UpdateEvent { .. } => IntentKind::UpdateEvent,
            Intent::DeleteEvent { .. } => IntentKind::DeleteEvent,
            Intent::DeleteEvents { .. } => IntentKind::DeleteEvents,
            Intent::GetEvents { .. } => IntentKind::GetEvents,
            Intent::AddTask(_) => IntentKind::AddTask,
            Intent::UpdateTask { .. } => IntentKind::UpdateTask,
            Intent::DeleteTask { .. } => IntentKind::DeleteTask,
            Intent::GetTasks { .. } => IntentKind::GetTasks,
            Intent::ControlPomodoro { .. } => IntentKind::ControlPomodoro,
            Intent::PlanSchedule { .. } => IntentKind::PlanSchedule,
            Intent::PlanTasks { .. } => IntentKind::PlanTasks,
            Intent::Help { .. } => IntentKind::Help,
        }
    }

    /// Validate an untyped candidate against the intent schema
    pub fn from_value(value: &Value) -> Result<Intent, SchemaViolation> {
        let validators = validators().map_err(|v| v.with_raw(value.clone()))?;

        // Optional payloads decode from an empty object
        let wire = json!({
            "intent": value.get("intent").cloned().unwrap_or(Value::Null),
            "payload": value.get("payload").cloned().unwrap_or_else(|| json!({})),
        });
        let intent: Intent = decode(&validators.intent, value, &wire)
            .map_err(|issues| SchemaViolation::from_issues(issues, value))?;

        let issues = intent.range_issues();
        if issues.is_empty() {
            Ok(intent)
        } else {
            Err(SchemaViolation::from_issues(issues, value))
        }
    }

    fn range_issues(&self) -> Vec<SchemaIssue> {
        match self {
            Intent::AddEvent(event) => range_issue("payload", event.start, event.end)
                .into_iter()
                .collect(),
            Intent::UpdateEvent { updates, .. } => match (updates.start, updates.end) {
                (Some(start), Some(end)) => range_issue("payload.updates", start, end)
                    .into_iter()
                    .collect(),
                _ => Vec::new(),
            },
            Intent::PlanSchedule { events, .. } => events
                .iter()
                .enumerate()
                .filter_map(|(i, event)| {
                    range_issue(&format!("payload.events.{i}"), event.start, event.end)
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

// ============================================================================
// Record payloads
// ============================================================================

impl NewEvent {
    /// Validate an event body against the `add_event` payload schema
    pub fn from_value(value: &Value) -> Result<Self, SchemaViolation> {
        let validators = validators().map_err(|v| v.with_raw(value.clone()))?;
        let event: NewEvent = decode(&validators.new_event, value, value)
            .map_err(|issues| SchemaViolation::from_issues(issues, value))?;
        match range_issue("", event.start, event.end) {
            Some(issue) => Err(SchemaViolation::from_issues(vec![issue], value)),
            None => Ok(event),
        }
    }
}

impl EventPatch {
    /// Validate a partial event body. Only a patch carrying both bounds is
    /// range-checked here; one-sided patches need the stored event.
    pub fn from_value(value: &Value) -> Result<Self, SchemaViolation> {
        let validators = validators().map_err(|v| v.with_raw(value.clone()))?;
        let patch: EventPatch = decode(&validators.event_patch, value, value)
            .map_err(|issues| SchemaViolation::from_issues(issues, value))?;
        if let (Some(start), Some(end)) = (patch.start, patch.end) {
            if let Some(issue) = range_issue("", start, end) {
                return Err(SchemaViolation::from_issues(vec![issue], value));
            }
        }
        Ok(patch)
    }
}

impl NewTask {
    pub fn from_value(value: &Value) -> Result<Self, SchemaViolation> {
        let validators = validators().map_err(|v| v.with_raw(value.clone()))?;
        decode(&validators.new_task, value, value)
            .map_err(|issues| SchemaViolation::from_issues(issues, value))
    }
}

impl TaskPatch {
    pub fn from_value(value: &Value) -> Result<Self, SchemaViolation> {
        let validators = validators().map_err(|v| v.with_raw(value.clone()))?;
        decode(&validators.task_patch, value, value)
            .map_err(|issues| SchemaViolation::from_issues(issues, value))
    }
}

// ============================================================================
// Violations
// ============================================================================

/// Category of a schema mismatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    Required,
    InvalidType,
    InvalidEnumValue,
    InvalidDiscriminator,
    InvalidDate,
    InvalidRange,
    TooSmall,
    TooBig,
}

/// One field-level mismatch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaIssue {
    /// Dotted path of the offending field, e.g. `payload.events.1.end`
    pub path: String,
    pub code: IssueCode,
    pub message: String,
}

/// Candidate object that matches no intent shape
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaViolation {
    pub issues: Vec<SchemaIssue>,
    /// The offending object, as received
    pub raw: Value,
}

impl SchemaViolation {
    pub fn single(path: impl Into<String>, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            issues: vec![SchemaIssue {
                path: path.into(),
                code,
                message: message.into(),
            }],
            raw: Value::Null,
        }
    }

    fn from_issues(issues: Vec<SchemaIssue>, raw: &Value) -> Self {
        Self {
            issues,
            raw: raw.clone(),
        }
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    pub fn paths(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.path.as_str()).collect()
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .issues
            .iter()
            .map(|i| format!("{}: {}", display_path(&i.path), i.message))
            .collect();
        write!(f, "{}", rendered.join("; "))
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

fn join_path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}

fn range_issue(parent: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<SchemaIssue> {
    (end <= start).then(|| SchemaIssue {
        path: join_path(parent, "end"),
        code: IssueCode::InvalidRange,
        message: "End must be after start".to_string(),
    })
}

// ============================================================================
// Schema document
// ============================================================================

/// Non-blank title
const TITLE_PATTERN: &str = r"\S";

fn definitions() -> Value {
    json!({
        "instant": { "type": "string", "pattern": INSTANT_PATTERN },
        "title": { "type": "string", "pattern": TITLE_PATTERN },
        "newEvent": {
            "type": "object",
            "required": ["title", "start", "end"],
            "properties": {
                "title": { "$ref": "#/$defs/title" },
                "start": { "$ref": "#/$defs/instant" },
                "end": { "$ref": "#/$defs/instant" },
                "allDay": { "type": "boolean" },
                "type": { "enum": ["event", "course"] },
                "courseCode": { "type": "string" },
                "location": { "type": "string" },
                "notes": { "type": "string" }
            }
        },
        "eventPatch": {
            "type": "object",
            "properties": {
                "title": { "$ref": "#/$defs/title" },
                "start": { "$ref": "#/$defs/instant" },
                "end": { "$ref": "#/$defs/instant" },
                "allDay": { "type": "boolean" },
                "type": { "enum": ["event", "course"] },
                "courseCode": { "type": "string" },
                "location": { "type": "string" },
                "notes": { "type": "string" }
            }
        },
        "newTask": {
            "type": "object",
            "required": ["title"],
            "properties": {
                "title": { "$ref": "#/$defs/title" },
                "due": { "$ref": "#/$defs/instant" },
                "notes": { "type": "string" }
            }
        },
        "taskPatch": {
            "type": "object",
            "properties": {
                "title": { "$ref": "#/$defs/title" },
                "due": { "$ref": "#/$defs/instant" },
                "done": { "type": "boolean" },
                "notes": { "type": "string" }
            }
        }
    })
}

fn payload_schema(kind: IntentKind) -> Value {
    let id_only = json!({
        "type": "object",
        "required": ["id"],
        "properties": { "id": { "type": "string" } }
    });
    match kind {
        IntentKind::AddEvent => json!({ "$ref": "#/$defs/newEvent" }),
        IntentKind::UpdateEvent => json!({
            "type": "object",
            "required": ["id", "updates"],
            "properties": {
                "id": { "type": "string" },
                "updates": { "$ref": "#/$defs/eventPatch" }
            }
        }),
        IntentKind::DeleteEvent | IntentKind::DeleteTask => id_only,
        IntentKind::DeleteEvents => json!({
            "type": "object",
            "properties": {
                "eventIds": { "type": "array", "items": { "type": "string" } },
                "filter": {
                    "type": "object",
                    "properties": {
                        "titleContains": { "type": "string" },
                        "from": { "$ref": "#/$defs/instant" },
                        "to": { "$ref": "#/$defs/instant" }
                    }
                },
                "confirm": { "type": "boolean" }
            }
        }),
        IntentKind::GetEvents => json!({
            "type": "object",
            "properties": {
                "range": {
                    "type": "object",
                    "properties": {
                        "start": { "$ref": "#/$defs/instant" },
                        "end": { "$ref": "#/$defs/instant" }
                    }
                }
            }
        }),
        IntentKind::AddTask => json!({ "$ref": "#/$defs/newTask" }),
        IntentKind::UpdateTask => json!({
            "type": "object",
            "required": ["id", "updates"],
            "properties": {
                "id": { "type": "string" },
                "updates": { "$ref": "#/$defs/taskPatch" }
            }
        }),
        IntentKind::GetTasks => json!({
            "type": "object",
            "properties": {
                "status": { "enum": ["all", "open", "done"] },
                "dueBefore": { "$ref": "#/$defs/instant" },
                "dueAfter": { "$ref": "#/$defs/instant" }
            }
        }),
        IntentKind::ControlPomodoro => json!({
            "type": "object",
            "required": ["action"],
            "properties": {
                "action": { "enum": ["start", "stop", "reset"] },
                "durationMinutes": {
                    "type": "number",
                    "minimum": POMODORO_MIN_MINUTES,
                    "maximum": POMODORO_MAX_MINUTES
                }
            }
        }),
        IntentKind::PlanSchedule => json!({
            "type": "object",
            "required": ["events"],
            "properties": {
                "events": { "type": "array", "items": { "$ref": "#/$defs/newEvent" } },
                "summary": { "type": "string" }
            }
        }),
        IntentKind::PlanTasks => json!({
            "type": "object",
            "required": ["tasks"],
            "properties": {
                "tasks": { "type": "array", "items": { "$ref": "#/$defs/newTask" } },
                "summary": { "type": "string" }
            }
        }),
        IntentKind::Help => json!({
            "type": "object",
            "properties": {
                "prompt": { "type": "string" },
                "suggestions": { "type": "array", "items": { "type": "string" } }
            }
        }),
    }
}

/// Full intent document: the discriminator, then one `if`/`then` branch per
/// intent so only the named intent's payload contract is reported on.
fn intent_schema() -> Value {
    let names: Vec<&str> = IntentKind::ALL.iter().map(|kind| kind.as_str()).collect();
    let branches: Vec<Value> = IntentKind::ALL
        .iter()
        .map(|kind| {
            let mut then = json!({ "properties": { "payload": payload_schema(*kind) } });
            if !kind.payload_optional() {
                then["required"] = json!(["payload"]);
            }
            json!({
                "if": {
                    "properties": { "intent": { "const": kind.as_str() } },
                    "required": ["intent"]
                },
                "then": then
            })
        })
        .collect();

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["intent"],
        "properties": { "intent": { "enum": names } },
        "allOf": branches,
        "$defs": definitions()
    })
}

fn definition_schema(name: &str) -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$ref": format!("#/$defs/{name}"),
        "$defs": definitions()
    })
}

struct Validators {
    intent: Validator,
    new_event: Validator,
    event_patch: Validator,
    new_task: Validator,
    task_patch: Validator,
}

impl Validators {
    fn compile() -> Result<Self, ValidationError<'static>> {
        Ok(Self {
            intent: jsonschema::validator_for(&intent_schema())?,
            new_event: jsonschema::validator_for(&definition_schema("newEvent"))?,
            event_patch: jsonschema::validator_for(&definition_schema("eventPatch"))?,
            new_task: jsonschema::validator_for(&definition_schema("newTask"))?,
            task_patch: jsonschema::validator_for(&definition_schema("taskPatch"))?,
        })
    }
}

static VALIDATORS: OnceLock<Result<Validators, String>> = OnceLock::new();

fn validators() -> Result<&'static Validators, SchemaViolation> {
    VALIDATORS
        .get_or_init(|| Validators::compile().map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|message| {
            SchemaViolation::single("", IssueCode::InvalidType, format!("Invalid schema: {message}"))
        })
}

/// Check `candidate` against `validator`, then decode `wire` into `T`.
///
/// Issues come back sorted by path.
fn decode<T: DeserializeOwned>(
    validator: &Validator,
    candidate: &Value,
    wire: &Value,
) -> Result<T, Vec<SchemaIssue>> {
    let mut issues: Vec<SchemaIssue> = validator
        .iter_errors(candidate)
        .map(|error| issue_from_error(&error))
        .collect();

    if issues.is_empty() {
        match T::deserialize(wire) {
            Ok(decoded) => return Ok(decoded),
            Err(error) => issues.push(issue_from_serde(&error)),
        }
    }

    issues.sort_by(|a, b| a.path.cmp(&b.path));
    Err(issues)
}

fn issue_from_error(error: &ValidationError<'_>) -> SchemaIssue {
    // "/payload/events/1" -> "payload.events.1"
    let pointer = error.instance_path.to_string();
    let mut path = pointer.trim_start_matches('/').replace('/', ".");

    let (code, message) = match &error.kind {
        ValidationErrorKind::Required { property } => {
            let name = property
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| property.to_string());
            path = join_path(&path, &name);
            (IssueCode::Required, "Required".to_string())
        }
        ValidationErrorKind::Enum { .. } if path == "intent" => {
            (IssueCode::InvalidDiscriminator, discriminator_message())
        }
        ValidationErrorKind::Enum { .. } => (IssueCode::InvalidEnumValue, error.to_string()),
        ValidationErrorKind::Type { .. } => (IssueCode::InvalidType, error.to_string()),
        ValidationErrorKind::Minimum { .. } => (IssueCode::TooSmall, error.to_string()),
        ValidationErrorKind::Maximum { .. } => (IssueCode::TooBig, error.to_string()),
        ValidationErrorKind::Pattern { pattern } if pattern == INSTANT_PATTERN => (
            IssueCode::InvalidDate,
            format!("{INVALID_INSTANT}: {}", error.instance),
        ),
        ValidationErrorKind::Pattern { .. } => {
            (IssueCode::TooSmall, "String must not be empty".to_string())
        }
        _ => (IssueCode::InvalidType, error.to_string()),
    };

    SchemaIssue {
        path,
        code,
        message,
    }
}

fn issue_from_serde(error: &serde_json::Error) -> SchemaIssue {
    let message = error.to_string();
    let code = if message.starts_with(INVALID_INSTANT) {
        IssueCode::InvalidDate
    } else {
        IssueCode::InvalidType
    };
    SchemaIssue {
        path: String::new(),
        code,
        message,
    }
}

fn discriminator_message() -> String {
    let expected: Vec<String> = IntentKind::ALL
        .iter()
        .map(|kind| format!("'{}'", kind.as_str()))
        .collect();
    format!("Invalid discriminator value. Expected {}", expected.join(" | "))
}
