//! Lifecycle events and the sink that receives them.
//!
//! Only the trigger points live here; what a sink does with an event is up to
//! the caller.

use std::fmt;

/// A lifecycle event with a stable string id.
///
/// The `*OperationFinish` events for clean, validate, undo, repair and
/// baseline all carry the id `afterInfoOperationFinish`. The ids are kept as
/// published for compatibility with existing callback scripts, so
/// [`Event::from_id`] resolves that id to [`Event::AfterInfoOperationFinish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    BeforeClean,
    AfterClean,
    AfterCleanError,
    BeforeMigrate,
    BeforeEachMigrate,
    BeforeEachMigrateStatement,
    AfterEachMigrateStatement,
    AfterEachMigrateStatementError,
    AfterEachMigrate,
    AfterEachMigrateError,
    BeforeRepeatables,
    AfterVersioned,
    AfterMigrateApplied,
    AfterMigrate,
    AfterMigrateError,
    BeforeUndo,
    BeforeEachUndo,
    BeforeEachUndoStatement,
    AfterEachUndoStatement,
    AfterEachUndoStatementError,
    AfterEachUndo,
    AfterEachUndoError,
    AfterUndo,
    AfterUndoError,
    BeforeValidate,
    AfterValidate,
    AfterValidateError,
    BeforeBaseline,
    AfterBaseline,
    AfterBaselineError,
    BeforeRepair,
    AfterRepair,
    AfterRepairError,
    BeforeInfo,
    AfterInfo,
    AfterInfoError,
    AfterMigrateOperationFinish,
    AfterInfoOperationFinish,
    AfterCleanOperationFinish,
    AfterValidateOperationFinish,
    AfterUndoOperationFinish,
    AfterRepairOperationFinish,
    AfterBaselineOperationFinish,
    CreateSchema,
    BeforeCreateSchema,
    BeforeConnect,
    AfterConnect,
}

impl Event {
    /// Every event, in declaration order.
    pub const ALL: &'static [Event] = &[
        Event::BeforeClean,
        Event::AfterClean,
        Event::AfterCleanError,
        Event::BeforeMigrate,
        Event::BeforeEachMigrate,
        Event::BeforeEachMigrateStatement,
        Event::AfterEachMigrateStatement,
        Event::AfterEachMigrateStatementError,
        Event::AfterEachMigrate,
        Event::AfterEachMigrateError,
        Event::BeforeRepeatables,
        Event::AfterVersioned,
        Event::AfterMigrateApplied,
        Event::AfterMigrate,
        Event::AfterMigrateError,
        Event::BeforeUndo,
        Event::BeforeEachUndo,
        Event::BeforeEachUndoStatement,
        Event::AfterEachUndoStatement,
        Event::AfterEachUndoStatementError,
        Event::AfterEachUndo,
        Event::AfterEachUndoError,
        Event::AfterUndo,
        Event::AfterUndoError,
        Event::BeforeValidate,
        Event::AfterValidate,
        Event::AfterValidateError,
        Event::BeforeBaseline,
        Event::AfterBaseline,
        Event::AfterBaselineError,
        Event::BeforeRepair,
        Event::AfterRepair,
        Event::AfterRepairError,
        Event::BeforeInfo,
        Event::AfterInfo,
        Event::AfterInfoError,
        Event::AfterMigrateOperationFinish,
        Event::AfterInfoOperationFinish,
        Event::AfterCleanOperationFinish,
        Event::AfterValidateOperationFinish,
        Event::AfterUndoOperationFinish,
        Event::AfterRepairOperationFinish,
        Event::AfterBaselineOperationFinish,
        Event::CreateSchema,
        Event::BeforeCreateSchema,
        Event::BeforeConnect,
        Event::AfterConnect,
    ];

    /// The id used in callback script names, e.g. `beforeMigrate`.
    pub fn id(self) -> &'static str {
        match self {
            Event::BeforeClean => "beforeClean",
            Event::AfterClean => "afterClean",
            Event::AfterCleanError => "afterCleanError",
            Event::BeforeMigrate => "beforeMigrate",
            Event::BeforeEachMigrate => "beforeEachMigrate",
            Event::BeforeEachMigrateStatement => "beforeEachMigrateStatement",
            Event::AfterEachMigrateStatement => "afterEachMigrateStatement",
            Event::AfterEachMigrateStatementError => "afterEachMigrateStatementError",
            Event::AfterEachMigrate => "afterEachMigrate",
            Event::AfterEachMigrateError => "afterEachMigrateError",
            Event::BeforeRepeatables => "beforeRepeatables",
            Event::AfterVersioned => "afterVersioned",
            Event::AfterMigrateApplied => "afterMigrateApplied",
            Event::AfterMigrate => "afterMigrate",
            Event::AfterMigrateError => "afterMigrateError",
            Event::BeforeUndo => "beforeUndo",
            Event::BeforeEachUndo => "beforeEachUndo",
            Event::BeforeEachUndoStatement => "beforeEachUndoStatement",
            Event::AfterEachUndoStatement => "afterEachUndoStatement",
            Event::AfterEachUndoStatementError => "afterEachUndoStatementError",
            Event::AfterEachUndo => "afterEachUndo",
            Event::AfterEachUndoError => "afterEachUndoError",
            Event::AfterUndo => "afterUndo",
            Event::AfterUndoError => "afterUndoError",
            Event::BeforeValidate => "beforeValidate",
            Event::AfterValidate => "afterValidate",
            Event::AfterValidateError => "afterValidateError",
            Event::BeforeBaseline => "beforeBaseline",
            Event::AfterBaseline => "afterBaseline",
            Event::AfterBaselineError => "afterBaselineError",
            Event::BeforeRepair => "beforeRepair",
            Event::AfterRepair => "afterRepair",
            Event::AfterRepairError => "afterRepairError",
            Event::BeforeInfo => "beforeInfo",
            Event::AfterInfo => "afterInfo",
            Event::AfterInfoError => "afterInfoError",
            Event::AfterMigrateOperationFinish => "afterMigrateOperationFinish",
            Event::AfterInfoOperationFinish
            | Event::AfterCleanOperationFinish
            | Event::AfterValidateOperationFinish
            | Event::AfterUndoOperationFinish
            | Event::AfterRepairOperationFinish
            | Event::AfterBaselineOperationFinish => "afterInfoOperationFinish",
            Event::CreateSchema => "createSchema",
            Event::BeforeCreateSchema => "beforeCreateSchema",
            Event::BeforeConnect => "beforeConnect",
            Event::AfterConnect => "afterConnect",
        }
    }

    /// Look up an event by id. The first event declared with the id wins.
    pub fn from_id(id: &str) -> Option<Event> {
        Event::ALL.iter().copied().find(|event| event.id() == id)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Receives lifecycle events.
pub trait EventSink {
    fn on_event(&self, event: Event);
}

impl<F> EventSink for F
where
    F: Fn(Event),
{
    fn on_event(&self, event: Event) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn on_event(&self, _event: Event) {}
}

/// Logs every event at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn on_event(&self, event: Event) {
        log::debug!("Lifecycle event: {event}");
    }
}
