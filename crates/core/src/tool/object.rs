use std::fmt::{self, Debug};
use std::pin::Pin;
use std::sync::Arc;

use tracing::Instrument;

use super::{Tool, ToolResult};

type BoxedToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

trait ToolObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn execute(&self, argument: String) -> BoxedToolFuture;
}

struct ToolObjectImpl<T: Tool>(T);

impl<T: Tool> ToolObject for ToolObjectImpl<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    #[inline]
    fn description(&self) -> &str {
        self.0.description()
    }

    #[inline]
    fn execute(&self, argument: String) -> BoxedToolFuture {
        let span = debug_span!("tool execute", tool = self.0.name());
        Box::pin(self.0.execute(argument).instrument(span))
    }
}

/// A type-erased, cheaply cloneable reference to a registered tool.
#[derive(Clone)]
pub struct ToolHandle(Arc<dyn ToolObject>);

impl ToolHandle {
    /// Wraps a tool.
    #[inline]
    pub fn new<T: Tool>(tool: T) -> Self {
        Self(Arc::new(ToolObjectImpl(tool)))
    }

    /// Returns the name of the tool.
    #[inline]
    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// Returns the description of the tool.
    #[inline]
    pub fn description(&self) -> &str {
        self.0.description()
    }

    /// Executes the tool with the given argument text.
    #[inline]
    pub fn execute(
        &self,
        argument: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        self.0.execute(argument)
    }
}

impl Debug for ToolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolHandle")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}
