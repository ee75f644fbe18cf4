//! The traversal protocol shared by every view of the registry.
//!
//! A [`Visitor`] is handed each field of a registered object in a fixed
//! order: scalars, enumerations, and the begin/end brackets of nested
//! composites. The binary persistence format carries no field tags, so the
//! order in which an object's [`Visit`] implementation reports its fields
//! *is* the file layout. Reordering, adding or removing a field changes the
//! layout of every previously saved file.

/// One selectable value of an enumerated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumChoice {
    pub value: u32,
    pub label: &'static str,
}

impl EnumChoice {
    pub const fn new(value: u32, label: &'static str) -> Self {
        Self { value, label }
    }
}

/// Receives the fields of a registered object, one at a time.
///
/// Implementations may read or overwrite the value behind each reference;
/// the same traversal drives saving, loading, rendering and editing.
pub trait Visitor {
    fn visit_float(&mut self, name: &str, value: &mut f32);

    fn visit_int(&mut self, name: &str, value: &mut i32);

    fn visit_string(&mut self, name: &str, value: &mut String);

    /// Enumerated field. Visitors without a special representation treat it
    /// as a plain integer.
    fn visit_enum(&mut self, name: &str, value: &mut u32, choices: &[EnumChoice]) {
        let _ = choices;
        visit_enum_as_int(self, name, value);
    }

    fn begin_composite(&mut self, _name: &str) {}

    fn end_composite(&mut self, _name: &str) {}

    /// Free-form HTML note placed between fields; only rendered views use it.
    fn comment(&mut self, _text: &str) {}
}

/// Routes an enumerated value through [`Visitor::visit_int`].
pub fn visit_enum_as_int<V: Visitor + ?Sized>(visitor: &mut V, name: &str, value: &mut u32) {
    let mut raw = *value as i32;
    visitor.visit_int(name, &mut raw);
    *value = raw as u32;
}

/// A composite object: reports its fields to a visitor, in declaration order.
pub trait Visit {
    fn visit(&mut self, visitor: &mut dyn Visitor);
}

/// Visits `value` as a nested composite named `name`.
pub fn visit_composite<T: Visit + ?Sized>(visitor: &mut dyn Visitor, name: &str, value: &mut T) {
    visitor.begin_composite(name);
    value.visit(visitor);
    visitor.end_composite(name);
}

/// A Rust enum exposed as an enumerated field.
pub trait Enumerated: Copy + 'static {
    const CHOICES: &'static [EnumChoice];

    fn to_raw(self) -> u32;

    fn from_raw(raw: u32) -> Option<Self>;
}

/// Visits a Rust enum as an enumerated field.
///
/// A raw value that maps to no variant (for example from a stale
/// persistence file) leaves the field unchanged.
pub fn visit_enumerated<E: Enumerated>(visitor: &mut dyn Visitor, name: &str, value: &mut E) {
    let mut raw = value.to_raw();
    visitor.visit_enum(name, &mut raw, E::CHOICES);
    match E::from_raw(raw) {
        Some(decoded) => *value = decoded,
        None => tracing::warn!(field = name, raw, "enumerated value has no matching variant"),
    }
}

/// Stack of enclosing composite names, producing dotted field paths.
#[derive(Debug, Default, Clone)]
pub struct FieldPath {
    prefix: String,
    marks: Vec<usize>,
}

impl FieldPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str) {
        self.marks.push(self.prefix.len());
        self.prefix.push_str(name);
        self.prefix.push('.');
    }

    pub fn pop(&mut self) {
        if let Some(mark) = self.marks.pop() {
            self.prefix.truncate(mark);
        }
    }

    pub fn depth(&self) -> usize {
        self.marks.len()
    }

    /// Enclosing path including its trailing dot, e.g. `camera.lens.`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn qualify(&self, name: &str) -> String {
        let mut full = String::with_capacity(self.prefix.len() + name.len());
        full.push_str(&self.prefix);
        full.push_str(name);
        full
    }

    /// True when `prefix + name == target`, without allocating.
    pub fn matches(&self, name: &str, target: &str) -> bool {
        target.len() == self.prefix.len() + name.len()
            && target.starts_with(self.prefix.as_str())
            && target.ends_with(name)
    }
}
