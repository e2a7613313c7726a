//! Static closure-capture analysis, driven by the parser.
//!
//! The tracker keeps one scope per anonymous function literal currently being
//! parsed.  Each scope knows the names declared inside the literal so far
//! (parameters, then local `var`s layered per block so a declaration ends with
//! its block) and collects, in order of first use, every name read inside it
//! that was not declared in an open block.  A captured name is
//! propagated outwards through the enclosing literals until one of them
//! declares it, so an inner closure's captures are always visible to the
//! outer closure's body at runtime.
//!
//! Named functions and methods do not open a scope: they cannot capture.

use std::collections::HashSet;
use std::rc::Rc;

use log::{debug, trace};

#[derive(Debug, Default)]
struct CaptureScope {
    /// One set per open block; the first holds the parameters.
    declared: Vec<HashSet<Rc<str>>>,
    captured: Vec<Rc<str>>,
}

impl CaptureScope {
    fn declares(&self, name: &str) -> bool {
        self.declared.iter().any(|layer| layer.contains(name))
    }

    fn capture(&mut self, name: &Rc<str>) {
        if !self.captured.iter().any(|c| c == name) {
            self.captured.push(Rc::clone(name));
        }
    }
}

/// Stack of per-literal capture scopes.
#[derive(Debug, Default)]
pub struct CaptureTracker {
    scopes: Vec<CaptureScope>,
}

impl CaptureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a function literal whose parameters are `params`.
    pub fn push(&mut self, params: &[Rc<str>]) {
        debug!("Entering capture scope with {} parameter(s)", params.len());

        self.scopes.push(CaptureScope {
            declared: vec![params.iter().cloned().collect()],
            captured: Vec::new(),
        });
    }

    /// Leave the innermost literal, returning its capture list.
    pub fn pop(&mut self) -> Vec<Rc<str>> {
        let captured: Vec<Rc<str>> = self
            .scopes
            .pop()
            .map(|scope| scope.captured)
            .unwrap_or_default();

        debug!("Leaving capture scope, captured {:?}", captured);

        captured
    }

    /// Open a block inside the innermost literal.
    pub fn enter_block(&mut self) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.declared.push(HashSet::new());
        }
    }

    /// Close the innermost block; its declarations stop hiding outer names.
    pub fn leave_block(&mut self) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.declared.len() > 1 {
                scope.declared.pop();
            }
        }
    }

    /// Record a local declaration in the innermost block of the innermost
    /// literal.
    pub fn declare(&mut self, name: &Rc<str>) {
        if let Some(layer) = self.scopes.last_mut().and_then(|s| s.declared.last_mut()) {
            layer.insert(Rc::clone(name));
        }
    }

    /// Record a read of `name`.
    pub fn read(&mut self, name: &Rc<str>) {
        for scope in self.scopes.iter_mut().rev() {
            if scope.declares(name) {
                return;
            }

            trace!("Capturing '{}'", name);

            scope.capture(name);
        }
    }
}
