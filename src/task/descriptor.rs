// src/task/descriptor.rs

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by a task body.
pub type BodyFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// Predicate evaluated when a task is selected; `true` marks it skipped.
pub type SkipPredicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// The opaque routine a task wraps.
///
/// The runner only observes completion: `Ok(())` is success, any error (or a
/// panic inside the future) is a task failure. Any `Fn() -> impl Future`
/// closure is a body.
pub trait TaskBody: Send + Sync {
    fn run(&self) -> BodyFuture;
}

impl<F, Fut> TaskBody for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn run(&self) -> BodyFuture {
        Box::pin(self())
    }
}

/// Unresolved task as supplied by a caller (or built from a suite file).
///
/// ```
/// use suiterun::task::TaskDescriptor;
///
/// let migrate = TaskDescriptor::new("migrate", || async { anyhow::Ok(()) })
///     .resources(["db"])
///     .after(["build"]);
/// assert_eq!(migrate.id(), "migrate");
/// ```
#[derive(Clone)]
pub struct TaskDescriptor {
    pub(crate) id: String,
    pub(crate) name: Option<String>,
    pub(crate) after: Vec<String>,
    pub(crate) resources: Vec<String>,
    pub(crate) skip: Option<SkipPredicate>,
    pub(crate) body: Arc<dyn TaskBody>,
}

impl TaskDescriptor {
    pub fn new(id: impl Into<String>, body: impl TaskBody + 'static) -> Self {
        Self::with_body(id, Arc::new(body))
    }

    pub fn with_body(id: impl Into<String>, body: Arc<dyn TaskBody>) -> Self {
        Self {
            id: id.into(),
            name: None,
            after: Vec::new(),
            resources: Vec::new(),
            skip: None,
            body,
        }
    }

    /// Human label; defaults to the id.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Ids of tasks that must reach a terminal state before this one runs.
    pub fn after<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Resource names this task needs exclusively. Validated at resolve time.
    pub fn resources<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn skip(mut self, predicate: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.skip = Some(Arc::new(predicate));
        self
    }

    pub fn skip_if(self, skip: bool) -> Self {
        if skip { self.skip(|| true) } else { self }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("after", &self.after)
            .field("resources", &self.resources)
            .field("skip", &self.skip.is_some())
            .finish_non_exhaustive()
    }
}
