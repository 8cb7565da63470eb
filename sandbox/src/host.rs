use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use rhai::module_resolvers::FileModuleResolver;
use rhai::{AST, Dynamic, Engine, EvalAltResult, ImmutableString, INT, Map, ParseError, Position};
use url::Url;

use doccheck::rewrite::ExpressionParser;

use crate::assert::{self, Counter};
use crate::environment::Environment;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Operations between two deadline checks.
const PROGRESS_INTERVAL: u64 = 256;

#[derive(Debug, Clone)]
pub struct HostOptions {
    pub timeout: Duration,
    /// Root for `import` statements, normally the document's directory.
    pub module_dir: PathBuf,
}

impl Default for HostOptions {
    fn default() -> Self {
        HostOptions {
            timeout: DEFAULT_TIMEOUT,
            module_dir: PathBuf::from("."),
        }
    }
}

/// The script engine shared by every environment of one document run, with
/// the fixed host prelude registered and a wall-clock deadline armed around
/// each execution.
pub struct Host {
    engine: Engine,
    deadline: Rc<Cell<Option<Instant>>>,
    counter: Counter,
    timeout: Duration,
}

impl Host {
    pub fn new(options: &HostOptions) -> Self {
        let mut engine = Engine::new();
        let deadline: Rc<Cell<Option<Instant>>> = Rc::new(Cell::new(None));

        engine.set_module_resolver(FileModuleResolver::new_with_path(&options.module_dir));

        let armed = Rc::clone(&deadline);
        engine.on_progress(move |ops: u64| {
            if ops % PROGRESS_INTERVAL != 0 {
                return None;
            }
            match armed.get() {
                Some(at) if Instant::now() >= at => Some("timeout".into()),
                _ => None,
            }
        });

        engine.on_print(|text| tracing::debug!(target: "sandbox::sample", "{}", text));
        engine.on_debug(|text, _source, pos| {
            tracing::debug!(target: "sandbox::sample", position = %pos, "{}", text)
        });

        assert::register(&mut engine);
        register_timers(&mut engine, Rc::clone(&deadline));
        register_urls(&mut engine);

        Host {
            engine,
            deadline,
            counter: Counter::default(),
            timeout: options.timeout,
        }
    }

    /// Counter of passed assertions across all environments of this host.
    pub fn counter(&self) -> &Counter {
        &self.counter
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn compile(&self, source: &str) -> Result<AST, ParseError> {
        self.engine.compile(source)
    }

    /// Run `ast` inside `environment` under the wall-clock deadline. Functions
    /// defined by `ast` stay available to later runs in the same environment,
    /// as do the modules recorded with [`Environment::record_imports`].
    pub fn run(&self, environment: &mut Environment, ast: &AST) -> Result<(), Box<EvalAltResult>> {
        let imports = match environment.import_source() {
            Some(source) => self.engine.compile(&source)?,
            None => AST::default(),
        };
        let program = imports.merge(&environment.functions).merge(ast);

        self.deadline.set(Some(Instant::now() + self.timeout));
        let result = self
            .engine
            .run_ast_with_scope(&mut environment.scope, &program);
        self.deadline.set(None);

        environment.functions = program.clone_functions_only();
        result
    }

    /// Single-expression syntax check used to trim arrow-assertion values.
    pub fn expressions(&self) -> Expressions<'_> {
        Expressions {
            engine: &self.engine,
        }
    }
}

pub struct Expressions<'h> {
    engine: &'h Engine,
}

impl ExpressionParser for Expressions<'_> {
    fn check(&self, source: &str) -> Result<(), Option<usize>> {
        match self.engine.compile_expression(source) {
            Ok(_) => Ok(()),
            Err(err) => Err(byte_offset(source, err.position())),
        }
    }
}

/// Convert a position inside single-line `source` to a byte offset.
fn byte_offset(source: &str, pos: Position) -> Option<usize> {
    let column = pos.position()?;
    if pos.line().is_some_and(|line| line > 1) {
        return None;
    }
    Some(
        source
            .char_indices()
            .nth(column.saturating_sub(1))
            .map(|(i, _)| i)
            .unwrap_or(source.len()),
    )
}

fn register_timers(engine: &mut Engine, deadline: Rc<Cell<Option<Instant>>>) {
    engine.register_fn("sleep", move |ms: INT| {
        let wanted = Duration::from_millis(ms.max(0) as u64);
        let Some(at) = deadline.get() else {
            std::thread::sleep(wanted);
            return Ok(());
        };
        let remaining = at.saturating_duration_since(Instant::now());
        if wanted <= remaining {
            std::thread::sleep(wanted);
            return Ok(());
        }
        std::thread::sleep(remaining);
        Err::<(), Box<EvalAltResult>>(
            EvalAltResult::ErrorTerminated("timeout".into(), Position::NONE).into(),
        )
    });
}

fn register_urls(engine: &mut Engine) {
    engine.register_fn("url_parse", |text: ImmutableString| {
        let url = parse_url(&text)?;
        let mut parts = Map::new();
        parts.insert("scheme".into(), url.scheme().to_string().into());
        parts.insert(
            "host".into(),
            url.host_str().map_or(Dynamic::UNIT, |h| h.to_string().into()),
        );
        parts.insert(
            "port".into(),
            url.port_or_known_default()
                .map_or(Dynamic::UNIT, |p| Dynamic::from(p as INT)),
        );
        parts.insert("path".into(), url.path().to_string().into());
        parts.insert(
            "query".into(),
            url.query().map_or(Dynamic::UNIT, |q| q.to_string().into()),
        );
        parts.insert(
            "fragment".into(),
            url.fragment().map_or(Dynamic::UNIT, |f| f.to_string().into()),
        );
        Ok::<_, Box<EvalAltResult>>(parts)
    });

    engine.register_fn(
        "url_join",
        |base: ImmutableString, relative: ImmutableString| {
            let joined = parse_url(&base)?.join(&relative).map_err(|e| url_error(&relative, e))?;
            Ok::<_, Box<EvalAltResult>>(joined.to_string())
        },
    );
}

fn parse_url(text: &str) -> Result<Url, Box<EvalAltResult>> {
    Url::parse(text).map_err(|e| url_error(text, e))
}

fn url_error(text: &str, err: url::ParseError) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(
        format!("invalid URL '{}': {}", text, err).into(),
        Position::NONE,
    )
    .into()
}
