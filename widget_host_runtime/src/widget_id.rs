use std::fmt;

/// Canonical address of a widget in the value store.
///
/// The form id is part of the key: two descriptors sharing an element id but
/// declaring different forms are different widgets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetKey {
    pub element_id: String,
    pub form_id: String,
}

impl WidgetKey {
    pub fn new(element_id: impl Into<String>, form_id: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
            form_id: form_id.into(),
        }
    }

    pub fn widget_ref(&self) -> WidgetRef<'_> {
        WidgetRef {
            id: &self.element_id,
            form_id: &self.form_id,
        }
    }

    pub fn in_form(&self) -> bool {
        is_valid_form_id(&self.form_id)
    }
}

impl fmt::Display for WidgetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.in_form() {
            write!(f, "{}@{}", self.element_id, self.form_id)
        } else {
            f.write_str(&self.element_id)
        }
    }
}

/// Borrowed widget address taken from an element descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetRef<'a> {
    pub id: &'a str,
    pub form_id: &'a str,
}

impl<'a> WidgetRef<'a> {
    pub fn new(id: &'a str, form_id: &'a str) -> Self {
        Self { id, form_id }
    }

    pub fn key(&self) -> WidgetKey {
        WidgetKey::new(self.id, self.form_id)
    }

    pub fn in_form(&self) -> bool {
        is_valid_form_id(self.form_id)
    }
}

pub fn is_valid_form_id(form_id: &str) -> bool {
    !form_id.is_empty()
}

/// Hands out DOM ids (`for`/`id` attributes) for mounted controls.
///
/// Owned by the session rather than living in a process-wide counter, so two
/// sessions never share a sequence.
#[derive(Debug, Default)]
pub struct DomIdAllocator {
    next: u64,
}

impl DomIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, prefix: &str) -> String {
        self.next += 1;
        format!("{prefix}{}", self.next)
    }
}
