//! The `assert` object bound in every environment.
//!
//! Each passing check bumps a [`Counter`] shared by all environments of a
//! run. A failing check raises a runtime error whose value is an
//! [`AssertionFailure`], which the executor recognizes and reports with its
//! actual and expected values.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use rhai::{Dynamic, Engine, EvalAltResult, FnPtr, ImmutableString, NativeCallContext, Position};

/// Number of assertions that passed.
#[derive(Debug, Clone, Default)]
pub struct Counter(Rc<Cell<u64>>);

impl Counter {
    pub fn increment(&self) {
        self.0.set(self.0.get() + 1);
    }

    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

/// Payload of a failed assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    pub operator: String,
    pub actual: String,
    pub expected: String,
    /// The original comment or line the assertion was rewritten from.
    pub label: String,
}

impl AssertionFailure {
    fn into_error(self) -> Box<EvalAltResult> {
        EvalAltResult::ErrorRuntime(Dynamic::from(self), Position::NONE).into()
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator.as_str() {
            "equal" => write!(f, "expected {} to equal {}", self.actual, self.expected),
            "not_equal" => write!(f, "expected {} to differ from {}", self.actual, self.expected),
            "throws" => write!(f, "expected an error to be thrown, {}", self.actual),
            _ => write!(f, "expected {}, got {}", self.expected, self.actual),
        }
    }
}

/// Deep strict equality: same type and same structure.
pub fn same(a: &Dynamic, b: &Dynamic) -> bool {
    a.type_name() == b.type_name() && render(a) == render(b)
}

pub fn render(value: &Dynamic) -> String {
    format!("{:?}", value)
}

#[derive(Debug, Clone)]
pub struct Assert {
    counter: Counter,
}

type Checked = Result<(), Box<EvalAltResult>>;

impl Assert {
    pub fn new(counter: Counter) -> Self {
        Assert { counter }
    }

    fn pass(&self) -> Checked {
        self.counter.increment();
        Ok(())
    }

    fn check(&self, passed: bool, failure: impl FnOnce() -> AssertionFailure) -> Checked {
        if passed {
            self.pass()
        } else {
            Err(failure().into_error())
        }
    }

    pub fn equal(self, actual: Dynamic, expected: Dynamic, label: ImmutableString) -> Checked {
        self.check(same(&actual, &expected), || AssertionFailure {
            operator: "equal".into(),
            actual: render(&actual),
            expected: render(&expected),
            label: label.to_string(),
        })
    }

    pub fn not_equal(self, actual: Dynamic, expected: Dynamic, label: ImmutableString) -> Checked {
        self.check(!same(&actual, &expected), || AssertionFailure {
            operator: "not_equal".into(),
            actual: render(&actual),
            expected: render(&expected),
            label: label.to_string(),
        })
    }

    pub fn ok(self, value: Dynamic, label: ImmutableString) -> Checked {
        let passed = value.as_bool().unwrap_or(false);
        self.check(passed, || AssertionFailure {
            operator: "ok".into(),
            actual: render(&value),
            expected: "true".into(),
            label: label.to_string(),
        })
    }

    /// Passes when calling `body` raises an error. A timeout is not an error
    /// raised by the body and is propagated unchanged.
    pub fn throws(
        ctx: NativeCallContext,
        assert: Assert,
        body: FnPtr,
        label: ImmutableString,
    ) -> Checked {
        match body.call_within_context::<Dynamic>(&ctx, ()) {
            Ok(value) => Err(AssertionFailure {
                operator: "throws".into(),
                actual: format!("but it returned {}", render(&value)),
                expected: "an error".into(),
                label: label.to_string(),
            }
            .into_error()),
            Err(err) if matches!(*err, EvalAltResult::ErrorTerminated(..)) => Err(err),
            Err(_) => assert.pass(),
        }
    }
}

/// Register the `Assert` type and its methods.
pub fn register(engine: &mut Engine) {
    engine
        .register_type_with_name::<Assert>("Assert")
        .register_fn("equal", Assert::equal)
        .register_fn("not_equal", Assert::not_equal)
        .register_fn("ok", Assert::ok)
        .register_fn("throws", Assert::throws);
}

/// The assertion payload carried by `err`, if it is a failed assertion.
pub fn failure_of(err: &EvalAltResult) -> Option<AssertionFailure> {
    match err {
        EvalAltResult::ErrorRuntime(value, _) => value.clone().try_cast::<AssertionFailure>(),
        _ => None,
    }
}
