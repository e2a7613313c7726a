//! Stack-based binding environment.
//!
//! Bindings live on one contiguous stack.  A [`Frame`] marks a range of it:
//! everything allocated at or after the frame's *garbage boundary* is cleared
//! when the frame is popped.  An *isolating* frame also raises the *scope
//! floor*, so lookups from inside it stop at the floor and then fall back to
//! the root bindings (those allocated before the first frame was pushed).
//!
//! Global functions and record types are kept in two separate tables that
//! share one namespace.

use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, trace};

use crate::error::{QuillError, Result};
use crate::value::{new_slot, RecordType, Slot, Value};

const INITIAL_CAPACITY: usize = 16;

/// A named value slot on the binding stack.
#[derive(Debug)]
pub struct Binding {
    pub name: Rc<str>,
    pub slot: Slot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Bindings at or above this index die with the frame.
    pub garbage_boundary: usize,

    /// Lookups from this frame do not see local bindings below this index.
    pub scope_floor: usize,

    pub isolating: bool,
}

/// Running totals of frame operations, for balance checks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub pushed: usize,
    pub popped: usize,
}

#[derive(Debug)]
pub struct Environment {
    bindings: Vec<Option<Binding>>,
    top: usize,
    frames: Vec<Frame>,
    functions: HashMap<Rc<str>, Value>,
    record_types: HashMap<Rc<str>, Rc<RecordType>>,
    stats: FrameStats,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut bindings: Vec<Option<Binding>> = Vec::new();
        bindings.resize_with(capacity.max(1), || None);

        Self {
            bindings,
            top: 0,
            frames: Vec::new(),
            functions: HashMap::new(),
            record_types: HashMap::new(),
            stats: FrameStats::default(),
        }
    }

    // ───── bindings ──────────────────────────────────────────────────────────

    /// Create a new binding for `name` in the current frame, initialised to
    /// `nil`.  An existing binding with the same name is shadowed, not reused.
    pub fn allocate(&mut self, name: Rc<str>) -> Slot {
        if self.top == self.bindings.len() {
            let capacity: usize = self.bindings.len() * 2;

            debug!("Growing binding stack to {}", capacity);

            self.bindings.resize_with(capacity, || None);
        }

        trace!("Allocating '{}' at {}", name, self.top);

        let slot: Slot = new_slot(Value::Nil);

        self.bindings[self.top] = Some(Binding {
            name,
            slot: Rc::clone(&slot),
        });
        self.top += 1;

        slot
    }

    /// Allocate and initialise in one step.
    pub fn define(&mut self, name: Rc<str>, value: Value) -> Slot {
        let slot: Slot = self.allocate(name);
        *slot.borrow_mut() = value;

        slot
    }

    /// Innermost visible binding for `name`.
    pub fn lookup(&self, name: &str) -> Option<Slot> {
        let floor: usize = self.frames.last().map_or(0, |f| f.scope_floor);

        if let Some(slot) = self.scan(floor, self.top, name) {
            return Some(slot);
        }

        if floor > 0 {
            let root_top: usize = self.frames.first().map_or(self.top, |f| f.garbage_boundary);

            return self.scan(0, root_top.min(floor), name);
        }

        None
    }

    /// Innermost root binding for `name`, ignoring every frame.
    pub fn lookup_root(&self, name: &str) -> Option<Slot> {
        let root_top: usize = self.frames.first().map_or(self.top, |f| f.garbage_boundary);

        self.scan(0, root_top, name)
    }

    /// Current value of the innermost visible binding for `name`.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.lookup(name).map(|slot| slot.borrow().clone())
    }

    fn scan(&self, from: usize, to: usize, name: &str) -> Option<Slot> {
        self.bindings[from..to]
            .iter()
            .rev()
            .flatten()
            .find(|b| &*b.name == name)
            .map(|b| Rc::clone(&b.slot))
    }

    // ───── frames ────────────────────────────────────────────────────────────

    pub fn push_frame(&mut self, isolate: bool) {
        let scope_floor: usize = if isolate {
            self.top
        } else {
            self.frames.last().map_or(0, |f| f.scope_floor)
        };

        self.frames.push(Frame {
            garbage_boundary: self.top,
            scope_floor,
            isolating: isolate,
        });
        self.stats.pushed += 1;

        trace!(
            "Pushed frame #{} (isolate={}, boundary={})",
            self.frames.len(),
            isolate,
            self.top
        );
    }

    /// Drop the innermost frame and clear every binding it allocated.
    pub fn pop_frame(&mut self) -> Result<()> {
        let frame: Frame = self
            .frames
            .pop()
            .ok_or_else(|| QuillError::Internal("pop_frame on an empty frame stack".into()))?;

        for binding in &mut self.bindings[frame.garbage_boundary..self.top] {
            *binding = None;
        }

        self.top = frame.garbage_boundary;
        self.stats.popped += 1;

        trace!("Popped frame, top rewound to {}", self.top);

        Ok(())
    }

    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.stats
    }

    /// Number of bindings currently on the stack, visible or not.
    pub fn live_bindings(&self) -> usize {
        self.top
    }

    pub fn capacity(&self) -> usize {
        self.bindings.len()
    }

    // ───── global tables ─────────────────────────────────────────────────────

    pub fn add_global_function(&mut self, name: Rc<str>, function: Value) -> Result<()> {
        self.ensure_free(&name)?;

        debug!("Registering global function '{}'", name);

        self.functions.insert(name, function);

        Ok(())
    }

    pub fn add_record_type(&mut self, name: Rc<str>, record_type: Rc<RecordType>) -> Result<()> {
        self.ensure_free(&name)?;

        debug!("Registering record type '{}'", name);

        self.record_types.insert(name, record_type);

        Ok(())
    }

    pub fn global_function(&self, name: &str) -> Option<Value> {
        self.functions.get(name).cloned()
    }

    pub fn get_record_type(&self, name: &str) -> Option<Rc<RecordType>> {
        self.record_types.get(name).cloned()
    }

    fn ensure_free(&self, name: &Rc<str>) -> Result<()> {
        if self.functions.contains_key(name) {
            return Err(QuillError::Duplicate {
                kind: "function",
                name: name.to_string(),
            });
        }

        if self.record_types.contains_key(name) {
            return Err(QuillError::Duplicate {
                kind: "type",
                name: name.to_string(),
            });
        }

        Ok(())
    }
}
