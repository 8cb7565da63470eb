use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use rhai::{AST, Dynamic, Map, Scope};

use doccheck::block::Mode;

use crate::assert::{Assert, Counter};

/// The assertion object bound in every environment.
pub const ASSERT: &str = "assert";
/// Empty object map standing in for module exports.
pub const EXPORTS: &str = "exports";

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*(?P<stmt>import\s+"(?:[^"\\]|\\.)*"\s+as\s+(?P<alias>[A-Za-z_][A-Za-z0-9_]*))\s*;"#,
    )
    .unwrap()
});

/// An execution scope: variables, the functions defined so far, and the
/// modules imported so far.
///
/// The engine forgets imported modules when a run ends, so every import is
/// kept as its statement and replayed ahead of later runs.
pub struct Environment {
    name: Option<String>,
    pub(crate) scope: Scope<'static>,
    pub(crate) functions: AST,
    imports: Vec<(String, String)>,
}

impl Environment {
    fn new(name: Option<String>, counter: Counter) -> Self {
        let mut scope = Scope::new();
        scope.push_constant(ASSERT, Assert::new(counter));

        scope.push(EXPORTS, Map::new());

        Environment {
            name,
            scope,
            functions: AST::default(),
            imports: Vec::new(),
        }
    }

    /// The shared-context name, or `None` for an isolated environment.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Names of every variable currently bound, prelude included.
    pub fn variables(&self) -> Vec<String> {
        self.scope
            .iter()
            .map(|(name, _, _)| name.to_string())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<Dynamic> {
        self.scope.get_value::<Dynamic>(name)
    }

    /// Aliases of the modules imported so far.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.imports.iter().map(|(alias, _)| alias.as_str())
    }

    /// Remember the `import "path" as alias;` statements of `source`. A later
    /// import under the same alias replaces the earlier one.
    pub fn record_imports(&mut self, source: &str) {
        for caps in source.lines().filter_map(|line| IMPORT.captures(line)) {
            let alias = caps["alias"].to_string();
            let statement = format!("{};", &caps["stmt"]);
            tracing::debug!(alias = %alias, "keeping import");
            match self.imports.iter_mut().find(|(a, _)| *a == alias) {
                Some(entry) => entry.1 = statement,
                None => self.imports.push((alias, statement)),
            }
        }
    }

    /// The recorded imports as one script, if there are any.
    pub(crate) fn import_source(&self) -> Option<String> {
        if self.imports.is_empty() {
            return None;
        }
        Some(
            self.imports
                .iter()
                .map(|(_, statement)| statement.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}

pub type SharedEnvironment = Rc<RefCell<Environment>>;

/// Hands out environments for blocks. Unnamed blocks always get a new
/// environment; named ones get the environment registered under that name,
/// created on first use. The registry lives as long as the manager, which is
/// one document run.
pub struct EnvironmentManager {
    counter: Counter,
    named: HashMap<String, SharedEnvironment>,
}

impl EnvironmentManager {
    pub fn new(counter: Counter) -> Self {
        EnvironmentManager {
            counter,
            named: HashMap::new(),
        }
    }

    /// The environment for a block in `mode`, or `None` for modes that never run.
    pub fn obtain(&mut self, mode: &Mode) -> Option<SharedEnvironment> {
        match mode {
            Mode::Off | Mode::Lint => None,
            Mode::Isolated => Some(Rc::new(RefCell::new(Environment::new(
                None,
                self.counter.clone(),
            )))),
            Mode::Shared(name) => {
                let counter = &self.counter;
                let environment = self.named.entry(name.clone()).or_insert_with(|| {
                    tracing::debug!(name = %name, "creating shared environment");
                    Rc::new(RefCell::new(Environment::new(
                        Some(name.clone()),
                        counter.clone(),
                    )))
                });
                Some(Rc::clone(environment))
            }
        }
    }
}
