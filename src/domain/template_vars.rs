//! Named values injected into the dashboard page.
//!
//! [`TemplateVariables`] maps a placeholder name to a closure producing its
//! current text. The table is built once at startup; only `port` is
//! replaced afterwards, once the listener is bound.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// Produces the current value of a template variable.
pub type VariableFn = Arc<dyn Fn() -> String + Send + Sync>;

/// Process-wide placeholder table for the root page.
#[derive(Default)]
pub struct TemplateVariables {
    variables: RwLock<HashMap<String, VariableFn>>,
}

impl TemplateVariables {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the dashboard table: `title`, `ip`, `port` and `nullDeadline`.
    #[must_use]
    pub fn dashboard(product: &str, ip: &str, port: u16) -> Self {
        let vars = Self::new();
        let title = format!("{product} {}", env!("CARGO_PKG_VERSION"));
        let ip = ip.to_string();
        vars.set("title", move || title.clone());
        vars.set("ip", move || ip.clone());
        vars.set_port(port);
        vars.set("nullDeadline", || format_deadline(0));
        vars
    }

    /// Inserts or replaces the variable `name`.
    pub fn set<F>(&self, name: &str, producer: F)
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.variables
            .write()
            .insert(name.to_string(), Arc::new(producer));
    }

    /// Replaces the `port` variable with the given port.
    pub fn set_port(&self, port: u16) {
        let port = port.to_string();
        self.set("port", move || port.clone());
    }

    /// Evaluates the variable `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let producer = self.variables.read().get(name).map(Arc::clone)?;
        Some(producer())
    }

    /// Returns the number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.read().len()
    }

    /// Returns `true` if no variable is defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.read().is_empty()
    }

    /// Replaces every `%name%` placeholder in `template` with the value of
    /// the matching variable. Unknown placeholders are left as they are.
    ///
    /// The template is scanned once, left to right; substituted values are
    /// never scanned again.
    #[must_use]
    pub fn render(&self, template: &str) -> String {
        let producers: HashMap<String, VariableFn> = self
            .variables
            .read()
            .iter()
            .map(|(name, producer)| (name.clone(), Arc::clone(producer)))
            .collect();

        let mut page = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('%') {
            let (literal, tail) = rest.split_at(open);
            page.push_str(literal);
            let after_open = tail.get(1..).unwrap_or_default();

            let Some(close) = after_open.find('%') else {
                page.push_str(tail);
                return page;
            };
            let (name, after_name) = after_open.split_at(close);
            match producers.get(name) {
                Some(producer) => {
                    page.push_str(&producer());
                    rest = after_name.get(1..).unwrap_or_default();
                }
                None => {
                    // Not a placeholder; the closing '%' may open the next one.
                    page.push('%');
                    rest = after_open;
                }
            }
        }
        page.push_str(rest);
        page
    }
}

impl fmt::Debug for TemplateVariables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.variables.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("TemplateVariables")
            .field("names", &names)
            .finish()
    }
}

/// Formats a deadline given in seconds as `HH:MM:SS`, prefixed with the
/// number of days when it spans at least one.
#[must_use]
pub fn format_deadline(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;
    if days > 0 {
        format!("{days}d {hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    }
}
