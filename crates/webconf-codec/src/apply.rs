use std::str::FromStr;

use webconf_core::{EnumChoice, FieldPath, Visitor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// No field has the target path.
    Missing,
    /// The field exists but the value does not parse as its type.
    Rejected,
}

/// Writes one decoded value into the field whose dotted path matches `target`.
///
/// The whole tree is walked; every other field is left untouched.
pub struct NameValueApplier<'a> {
    target: &'a str,
    value: &'a str,
    path: FieldPath,
    outcome: ApplyOutcome,
}

impl<'a> NameValueApplier<'a> {
    pub fn new(target: &'a str, value: &'a str) -> Self {
        Self {
            target,
            value,
            path: FieldPath::new(),
            outcome: ApplyOutcome::Missing,
        }
    }

    pub fn outcome(&self) -> ApplyOutcome {
        self.outcome
    }

    pub fn found(&self) -> bool {
        self.outcome != ApplyOutcome::Missing
    }

    fn is_target(&self, name: &str) -> bool {
        self.path.matches(name, self.target)
    }

    fn assign<T: FromStr>(&mut self, slot: &mut T) {
        match self.value.trim().parse::<T>() {
            Ok(parsed) => {
                *slot = parsed;
                self.outcome = ApplyOutcome::Applied;
            }
            Err(_) => {
                tracing::debug!(field = self.target, value = self.value, "value rejected");
                self.outcome = ApplyOutcome::Rejected;
            }
        }
    }
}

impl Visitor for NameValueApplier<'_> {
    fn visit_float(&mut self, name: &str, value: &mut f32) {
        if self.is_target(name) {
            self.assign(value);
        }
    }

    fn visit_int(&mut self, name: &str, value: &mut i32) {
        if self.is_target(name) {
            self.assign(value);
        }
    }

    fn visit_string(&mut self, name: &str, value: &mut String) {
        if self.is_target(name) {
            *value = self.value.to_string();
            self.outcome = ApplyOutcome::Applied;
        }
    }

    fn visit_enum(&mut self, name: &str, value: &mut u32, choices: &[EnumChoice]) {
        if !self.is_target(name) {
            return;
        }
        match self.value.trim().parse::<u32>() {
            Ok(raw) if choices.iter().any(|c| c.value == raw) => {
                *value = raw;
                self.outcome = ApplyOutcome::Applied;
            }
            _ => self.outcome = ApplyOutcome::Rejected,
        }
    }

    fn begin_composite(&mut self, name: &str) {
        self.path.push(name);
    }

    fn end_composite(&mut self, _name: &str) {
        self.path.pop();
    }
}
